//! Child process invocations with inherited stdio and an optional timeout.
//!
//! Wrapped tools (spack, git) stream their own progress, so stdout/stderr
//! are inherited rather than captured. A hung invocation is killed once the
//! configured timeout elapses and reported as an error.

use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// A fully described child process invocation.
///
/// Built up front so dry-run mode can print the exact command line that
/// would have run.
#[derive(Debug, Clone)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Human-readable command line (`KEY=value program arg ...`).
    pub fn command_line(&self) -> String {
        let mut parts = Vec::new();
        for (key, value) in &self.env {
            parts.push(format!("{key}={value}"));
        }
        parts.push(self.program.display().to_string());
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    /// Run to completion with inherited stdio.
    ///
    /// With a timeout, a still-running child is killed and the call fails.
    pub fn run(&self, timeout: Option<Duration>) -> Result<ExitStatus> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        debug!(command = %self.command_line(), "spawning child process");
        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawn {}", self.program.display()))?;

        let status = match timeout {
            Some(limit) => match child.wait_timeout(limit).context("wait for command")? {
                Some(status) => status,
                None => {
                    warn!(timeout_secs = limit.as_secs(), "command timed out, killing");
                    child.kill().context("kill command")?;
                    child.wait().context("wait command after kill")?;
                    return Err(anyhow!(
                        "{} timed out after {}s",
                        self.command_line(),
                        limit.as_secs()
                    ));
                }
            },
            None => child.wait().context("wait for command")?,
        };

        debug!(exit_code = ?status.code(), "command finished");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_includes_environment_and_args() {
        let invocation = Invocation::new("/opt/spack/bin/spack")
            .env("SPACK_ENV", "/opt/envs/alpha")
            .arg("install")
            .arg("--log-format=junit");
        assert_eq!(
            invocation.command_line(),
            "SPACK_ENV=/opt/envs/alpha /opt/spack/bin/spack install --log-format=junit"
        );
    }

    #[test]
    fn run_reports_child_exit_status() {
        let status = Invocation::new("sh")
            .arg("-c")
            .arg("exit 3")
            .run(None)
            .expect("run sh");
        assert_eq!(status.code(), Some(3));
    }

    #[test]
    fn run_succeeds_within_timeout() {
        let status = Invocation::new("sh")
            .arg("-c")
            .arg("exit 0")
            .run(Some(Duration::from_secs(10)))
            .expect("run sh");
        assert!(status.success());
    }

    #[test]
    fn run_kills_on_timeout() {
        let err = Invocation::new("sh")
            .arg("-c")
            .arg("sleep 5")
            .run(Some(Duration::from_millis(50)))
            .expect_err("must time out");
        assert!(err.to_string().contains("timed out"));
    }
}
