//! Canonical path layout derived from the site configuration.

use std::path::{Path, PathBuf};

use crate::core::config::SiteConfig;

/// All derived paths for a stack deployment.
///
/// With `stack_release` and `stack_version` set, sources live under
/// `<spack_root>/<release>/spack.<version>` and installs under
/// `<spack_root>/<release>/<version>`; otherwise both collapse to
/// `<spack_root>/spack`.
#[derive(Debug, Clone)]
pub struct StackLayout {
    pub spack_root: PathBuf,
    pub source_root: PathBuf,
    pub install_root: PathBuf,
    pub environments_root: PathBuf,
    pub external_dir: PathBuf,
    pub extra_repos_root: PathBuf,
}

impl StackLayout {
    pub fn new(config: &SiteConfig) -> Self {
        let spack_root = config.spack_root.clone();
        let (source_root, install_root) = match (&config.stack_release, &config.stack_version) {
            (Some(release), Some(version)) => (
                spack_root.join(release).join(format!("spack.{version}")),
                spack_root.join(release).join(version),
            ),
            _ => (spack_root.join("spack"), spack_root.join("spack")),
        };
        let environments_root = source_root.join("var").join("spack").join("environments");
        let external_dir = join_under(&config.spack_external, &spack_root);
        let extra_repos_root = match &config.stack_release {
            Some(release) => spack_root.join(release).join("external_repos"),
            None => spack_root.join("external_repos"),
        };
        Self {
            spack_root,
            source_root,
            install_root,
            environments_root,
            external_dir,
            extra_repos_root,
        }
    }

    /// Path of the `spack` entry point inside the checkout.
    pub fn spack_binary(&self) -> PathBuf {
        self.source_root.join("bin").join("spack")
    }

    /// Directory holding a named environment's `spack.yaml`.
    pub fn environment_dir(&self, environment: &str) -> PathBuf {
        self.environments_root.join(environment)
    }

    /// Resolved checkout path for an extra repository.
    pub fn extra_repo_path(&self, repo_path: &str) -> PathBuf {
        join_under(repo_path, &self.extra_repos_root)
    }
}

/// Keep absolute paths as-is, join relative ones under `prefix`.
pub fn join_under(value: &str, prefix: &Path) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        prefix.join(path)
    }
}
