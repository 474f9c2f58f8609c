//! The install pipeline: one environment, two sequential spack invocations.
//!
//! `install` writes a JUnit log to `stack.<environment>.xml`; a pre-existing
//! log is deleted first so stale results are never misread as current.
//! `module tcl refresh` runs only after the install step succeeds, and a
//! failing invocation's exit code becomes the process exit code.

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, info};

use crate::core::config::Site;
use crate::core::environment::ensure_known_environment;
use crate::core::layout::StackLayout;
use crate::io::process::Invocation;

/// Enables dry-run mode when set to `yes`, in addition to `--dry-run`.
pub const DRY_RUN_ENV_VAR: &str = "STACKENV_DRY_RUN";

#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    pub dry_run: bool,
}

/// Dry run is requested by flag or by `STACKENV_DRY_RUN=yes`.
pub fn dry_run_requested(flag: bool) -> bool {
    flag || env::var(DRY_RUN_ENV_VAR).is_ok_and(|value| value == "yes")
}

/// JUnit log path for an environment's install run.
pub fn junit_log_path(workdir: &Path, environment: &str) -> PathBuf {
    workdir.join(format!("stack.{environment}.xml"))
}

/// Delete a stale log file. Absence is not an error.
pub fn remove_stale_log(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed stale install log");
            Ok(true)
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err).with_context(|| format!("remove stale log {}", path.display())),
    }
}

/// Run the install pipeline for `environment` in `workdir`.
///
/// Returns the exit code the process should finish with: `0` on success
/// (and for dry runs), otherwise the first failing invocation's code.
pub fn run_install(
    site: &Site,
    layout: &StackLayout,
    environment: &str,
    workdir: &Path,
    opts: &InstallOptions,
) -> Result<i32> {
    ensure_known_environment(site, environment)?;

    let log_path = junit_log_path(workdir, environment);
    remove_stale_log(&log_path)?;

    let spack = layout.spack_binary();
    if !spack.is_file() {
        return Err(anyhow!(
            "no spack checkout at {} (run `stackenv checkout` first)",
            layout.source_root.display()
        ));
    }

    let env_dir = layout.environment_dir(environment);
    let timeout = site.config.command_timeout_secs.map(Duration::from_secs);
    let dry_run = dry_run_requested(opts.dry_run);

    let steps = [
        Invocation::new(&spack)
            .env("SPACK_ENV", env_dir.display().to_string())
            .arg("install")
            .arg("--log-format=junit")
            .arg(format!("--log-file={}", log_path.display())),
        Invocation::new(&spack)
            .env("SPACK_ENV", env_dir.display().to_string())
            .arg("module")
            .arg("tcl")
            .arg("refresh")
            .arg("--delete-tree")
            .arg("-y"),
    ];

    for step in steps {
        if dry_run {
            println!("{}", step.command_line());
            continue;
        }
        let status = step.run(timeout)?;
        if !status.success() {
            let code = status.code().unwrap_or(1);
            error!(environment, code, command = %step.command_line(), "pipeline step failed");
            return Ok(code);
        }
    }

    if !dry_run {
        info!(environment, "install pipeline finished");
    }
    Ok(0)
}
