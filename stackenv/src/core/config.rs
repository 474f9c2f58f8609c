//! Site configuration: one YAML file describing a whole stack deployment.
//!
//! The typed fields below drive path layout and repository checkout. The
//! untyped document is kept alongside them because templates and `get-entry`
//! may reach any key, and a top-level key equal to an environment name is
//! that environment's override mapping.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

/// Names the site configuration file (`<release>.yaml`) when `--input` is
/// not given on the command line.
pub const RELEASE_ENV_VAR: &str = "STACKENV_RELEASE";

/// An extra Spack package repository to check out next to the stack.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExtraRepo {
    /// Clone URL.
    pub repo: String,
    /// Checkout path, absolute or relative to the external repos root.
    pub path: String,
    /// Optional tag or branch to clone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Typed view of the site configuration (YAML).
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Declared environment names.
    pub environments: Vec<String>,

    /// Base settings shared by every environment before overrides.
    #[serde(default)]
    pub default_environment: Mapping,

    /// Prefix under which sources, installs and externals live.
    pub spack_root: PathBuf,

    /// Stack release name (e.g. a codename); subdivides `spack_root`.
    #[serde(default)]
    pub stack_release: Option<String>,

    /// Optional version subdivision within the release.
    #[serde(default)]
    pub stack_version: Option<String>,

    /// Git branch or tag of Spack to check out.
    pub spack_release: String,

    /// Externals prefix, absolute or relative to `spack_root`.
    pub spack_external: String,

    /// Site name used for template lookup.
    #[serde(default)]
    pub site: Option<String>,

    #[serde(default)]
    pub extra_repos: BTreeMap<String, ExtraRepo>,

    /// Optional wall-clock limit for each wrapped spack invocation.
    #[serde(default)]
    pub command_timeout_secs: Option<u64>,
}

impl SiteConfig {
    pub fn validate(&self) -> Result<()> {
        if self.environments.is_empty() {
            return Err(anyhow!("environments must list at least one environment"));
        }
        if self.environments.iter().any(|name| name.trim().is_empty()) {
            return Err(anyhow!("environment names must be non-empty"));
        }
        if self.spack_root.as_os_str().is_empty() {
            return Err(anyhow!("spack_root must be set"));
        }
        if self.spack_release.trim().is_empty() {
            return Err(anyhow!("spack_release must name a branch or tag"));
        }
        if self.stack_version.is_some() && self.stack_release.is_none() {
            return Err(anyhow!("stack_version requires stack_release"));
        }
        if let Some(secs) = self.command_timeout_secs
            && secs == 0
        {
            return Err(anyhow!("command_timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// A loaded site: typed configuration plus the raw document and the
/// directory the configuration file lives in (templates and the
/// `configuration/` tree are resolved relative to it).
#[derive(Debug, Clone)]
pub struct Site {
    pub config: SiteConfig,
    pub raw: Mapping,
    pub root: PathBuf,
}

impl Site {
    /// Load and validate a site configuration file.
    pub fn load(path: &Path) -> Result<Site> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let raw: Mapping = serde_yaml::from_str(&contents)
            .with_context(|| format!("parse {} as a mapping", path.display()))?;
        let config: SiteConfig =
            serde_yaml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
        config.validate()?;
        let root = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Ok(Site { config, raw, root })
    }
}

/// Resolve the configuration file path from `--input` or `STACKENV_RELEASE`.
///
/// Missing both is an immediate error; the tool never proceeds with an
/// empty release name.
pub fn resolve_input(input: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = input {
        return Ok(path);
    }
    let release = env::var(RELEASE_ENV_VAR)
        .map_err(|_| anyhow!("no --input given and {RELEASE_ENV_VAR} is not set"))?;
    if release.trim().is_empty() {
        return Err(anyhow!("{RELEASE_ENV_VAR} is set but empty"));
    }
    Ok(PathBuf::from(format!("{release}.yaml")))
}
