//! Spack software-stack environment manager.
//!
//! Reads one site YAML configuration (named by `--input` or derived from
//! `STACKENV_RELEASE`) and drives the stack from it: environment file
//! rendering, repository checkout, and the install / module-refresh
//! pipeline.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_yaml::Value;

use stackenv::core::config::{self, Site};
use stackenv::core::environment::{self, EnvironmentView};
use stackenv::core::layout::StackLayout;
use stackenv::exit_codes;
use stackenv::io::envfile;
use stackenv::io::git;
use stackenv::io::install::{self, InstallOptions};
use stackenv::io::template::TemplateEngine;
use stackenv::logging;

#[derive(Parser)]
#[command(
    name = "stackenv",
    version,
    about = "Manage a site's Spack software-stack environments"
)]
struct Cli {
    /// Site configuration file (defaults to `$STACKENV_RELEASE.yaml`).
    #[arg(long, global = true, value_name = "FILE")]
    input: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the site configuration loads and validates.
    Status,
    /// List environment names.
    ListEnvs {
        /// Only environments belonging to this cloud.
        #[arg(long)]
        cloud: Option<String>,
        /// Every declared environment, without cloud filtering.
        #[arg(long)]
        all: bool,
    },
    /// List compiler specs for an environment (defaults-only when no env given).
    ListCompilers {
        #[arg(long)]
        env: Option<String>,
        /// Restrict to a single stack type (e.g. stable, bleeding_edge).
        #[arg(long)]
        stack_type: Option<String>,
        /// Merge the defaults-only compilers in as well.
        #[arg(long)]
        all: bool,
    },
    /// Render `spack.yaml` for one environment.
    CreateEnv {
        #[arg(long)]
        env: String,
        /// Render a temporary bootstrap environment.
        #[arg(long)]
        bootstrap: bool,
    },
    /// Render `spack.yaml` for every environment.
    CreateEnvs {
        #[arg(long)]
        bootstrap: bool,
    },
    /// Print the Spack branch or tag to check out.
    Release,
    /// Print the Spack source checkout directory.
    CheckoutDir,
    /// Print the externals prefix.
    ExternalDir,
    /// Clone Spack at the configured release if not present yet.
    Checkout,
    /// Clone or update the configured extra package repositories.
    CheckoutExtraRepos,
    /// Print the extra repositories with resolved paths as YAML.
    ListExtraRepos,
    /// Render the site configuration files into the Spack checkout.
    InstallConfiguration,
    /// Look up a configuration entry by dotted path.
    GetEntry {
        /// Dotted path, e.g. `environment.core_compiler`.
        entry: String,
        #[arg(long)]
        env: Option<String>,
    },
    /// Install a stack environment and refresh its module files.
    Install {
        /// Environment to install.
        environment: String,
        /// Print the spack command lines instead of executing them.
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let input = config::resolve_input(cli.input)?;
    let site = Site::load(&input)?;
    let layout = StackLayout::new(&site.config);

    match cli.command {
        Command::Status => {
            println!(
                "{}: {} environments configured",
                input.display(),
                site.config.environments.len()
            );
        }
        Command::ListEnvs { cloud, all } => {
            for name in environment::list_envs(&site, cloud.as_deref(), all)? {
                println!("{name}");
            }
        }
        Command::ListCompilers {
            env,
            stack_type,
            all,
        } => {
            let mut specs = BTreeSet::new();
            let view = EnvironmentView::build(&site, env.as_deref())?;
            specs.extend(view.compilers(stack_type.as_deref())?);
            if all && env.is_some() {
                let defaults = EnvironmentView::build(&site, None)?;
                specs.extend(defaults.compilers(stack_type.as_deref())?);
            }
            for spec in specs {
                println!("{spec}");
            }
        }
        Command::CreateEnv { env, bootstrap } => {
            let engine = TemplateEngine::new(&site.root);
            envfile::write_env(&site, &layout, &engine, &env, bootstrap)?;
        }
        Command::CreateEnvs { bootstrap } => {
            let engine = TemplateEngine::new(&site.root);
            envfile::write_envs(&site, &layout, &engine, bootstrap)?;
        }
        Command::Release => println!("{}", site.config.spack_release),
        Command::CheckoutDir => println!("{}", layout.source_root.display()),
        Command::ExternalDir => println!("{}", layout.external_dir.display()),
        Command::Checkout => git::checkout_spack(&site, &layout)?,
        Command::CheckoutExtraRepos => git::checkout_extra_repos(&site, &layout)?,
        Command::ListExtraRepos => {
            let repos = git::resolved_extra_repos(&site, &layout);
            print!(
                "{}",
                serde_yaml::to_string(&repos).context("serialize extra repos")?
            );
        }
        Command::InstallConfiguration => {
            let engine = TemplateEngine::new(&site.root);
            envfile::install_configuration(&site, &layout, &engine)?;
        }
        Command::GetEntry { entry, env } => {
            let view = EnvironmentView::build(&site, env.as_deref())?;
            match view.entry(&entry) {
                Some(Value::String(value)) => println!("{value}"),
                Some(value) => print!(
                    "{}",
                    serde_yaml::to_string(value).context("serialize entry")?
                ),
                None => println!("{entry} was not specified in the configuration"),
            }
        }
        Command::Install {
            environment,
            dry_run,
        } => {
            let workdir = std::env::current_dir().context("resolve working directory")?;
            return install::run_install(
                &site,
                &layout,
                &environment,
                &workdir,
                &InstallOptions { dry_run },
            );
        }
    }
    Ok(exit_codes::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_install_with_dry_run() {
        let cli = Cli::parse_from(["stackenv", "install", "alpha", "--dry-run"]);
        assert!(matches!(
            cli.command,
            Command::Install { ref environment, dry_run: true } if environment == "alpha"
        ));
    }

    #[test]
    fn parse_global_input_after_subcommand() {
        let cli = Cli::parse_from(["stackenv", "list-envs", "--input", "site.yaml"]);
        assert_eq!(cli.input.as_deref(), Some(std::path::Path::new("site.yaml")));
        assert!(matches!(
            cli.command,
            Command::ListEnvs { cloud: None, all: false }
        ));
    }
}
