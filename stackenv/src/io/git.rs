//! Git adapter for repository checkouts.
//!
//! Spack itself and the site's extra package repositories are plain git
//! checkouts, so we keep a small, explicit wrapper around `git` subprocess
//! calls. Clone progress streams through to the operator.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::core::config::Site;
use crate::core::layout::StackLayout;

pub const SPACK_UPSTREAM_URL: &str = "https://github.com/spack/spack.git";

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Clone `url` into `dest`, optionally at a branch or tag.
    #[instrument(skip_all, fields(url, dest = %dest.display()))]
    pub fn clone_from(url: &str, dest: &Path, branch: Option<&str>) -> Result<()> {
        let mut args: Vec<&str> = vec!["clone"];
        if let Some(branch) = branch {
            args.push("--branch");
            args.push(branch);
        }
        args.push(url);
        let dest_str = dest
            .to_str()
            .with_context(|| format!("non-utf8 checkout path {}", dest.display()))?;
        args.push(dest_str);
        run_git(&args, None)
    }

    /// Fast-forward the checkout from its default remote.
    #[instrument(skip_all, fields(workdir = %self.workdir.display()))]
    pub fn pull(&self) -> Result<()> {
        run_git(&["pull"], Some(&self.workdir))
    }
}

fn run_git(args: &[&str], workdir: Option<&Path>) -> Result<()> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(workdir) = workdir {
        cmd.current_dir(workdir);
    }
    let status = cmd
        .status()
        .with_context(|| format!("spawn git {}", args.join(" ")))?;
    if !status.success() {
        return Err(anyhow!("git {} failed with {status}", args.join(" ")));
    }
    Ok(())
}

/// Clone Spack at the configured release when the source root is absent.
pub fn checkout_spack(site: &Site, layout: &StackLayout) -> Result<()> {
    if layout.source_root.exists() {
        debug!(source_root = %layout.source_root.display(), "spack checkout already present");
        return Ok(());
    }
    if let Some(parent) = layout.source_root.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    Git::clone_from(
        SPACK_UPSTREAM_URL,
        &layout.source_root,
        Some(&site.config.spack_release),
    )
}

/// Clone (at the configured tag, if any) or update every extra repository.
pub fn checkout_extra_repos(site: &Site, layout: &StackLayout) -> Result<()> {
    for (name, repo) in &site.config.extra_repos {
        let path = layout.extra_repo_path(&repo.path);
        if path.exists() {
            debug!(repo = %name, path = %path.display(), "updating extra repo");
            Git::new(&path)
                .pull()
                .with_context(|| format!("update extra repo '{name}'"))?;
        } else {
            debug!(repo = %name, path = %path.display(), "cloning extra repo");
            Git::clone_from(&repo.repo, &path, repo.tag.as_deref())
                .with_context(|| format!("clone extra repo '{name}'"))?;
        }
    }
    Ok(())
}

/// An extra repository with its checkout path resolved, for `list-extra-repos`.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedExtraRepo {
    pub name: String,
    pub repo: String,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

pub fn resolved_extra_repos(site: &Site, layout: &StackLayout) -> Vec<ResolvedExtraRepo> {
    site.config
        .extra_repos
        .iter()
        .map(|(name, repo)| ResolvedExtraRepo {
            name: name.clone(),
            repo: repo.repo.clone(),
            path: layout.extra_repo_path(&repo.path),
            tag: repo.tag.clone(),
        })
        .collect()
}
