//! Rendering environment files and Spack configuration from site templates.

use std::fs;
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use tracing::{debug, info};

use crate::core::config::Site;
use crate::core::environment::EnvironmentView;
use crate::core::layout::StackLayout;
use crate::io::template::TemplateEngine;

/// `spack.yaml` template, relative to the site directory.
pub const SPACK_YAML_TEMPLATE: &str = "templates/common/spack.yaml.j2";

/// Site configuration templates/files, relative to the site directory.
pub const CONFIGURATION_DIR: &str = "configuration";

static YAML_TEMPLATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*\.ya?ml)\.j2$").expect("yaml template regex is valid"));

/// Render `spack.yaml` for one environment into the environments tree.
///
/// The target directory must already exist: environments are registered
/// with `spack env create` before their files are managed here.
pub fn write_env(
    site: &Site,
    layout: &StackLayout,
    engine: &TemplateEngine,
    environment: &str,
    bootstrap: bool,
) -> Result<()> {
    let mut view = EnvironmentView::build(site, Some(environment))?;
    view.set_bootstrap(bootstrap);

    let env_dir = layout.environment_dir(environment);
    if !env_dir.is_dir() {
        return Err(anyhow!(
            "{} does not exist, run `spack env create {environment}` first",
            env_dir.display()
        ));
    }
    let rendered = engine.render(SPACK_YAML_TEMPLATE, view.customisation())?;

    let target = env_dir.join("spack.yaml");
    fs::write(&target, rendered).with_context(|| format!("write {}", target.display()))?;
    info!(environment, target = %target.display(), "wrote environment file");
    Ok(())
}

/// Render `spack.yaml` for every configured environment.
pub fn write_envs(
    site: &Site,
    layout: &StackLayout,
    engine: &TemplateEngine,
    bootstrap: bool,
) -> Result<()> {
    for environment in &site.config.environments {
        write_env(site, layout, engine, environment, bootstrap)?;
    }
    Ok(())
}

/// Install the site's Spack configuration into `<source root>/etc/spack`.
///
/// `*.yaml.j2`/`*.yml.j2` files under `configuration/` render against the
/// defaults-only view; anything else is copied verbatim.
pub fn install_configuration(
    site: &Site,
    layout: &StackLayout,
    engine: &TemplateEngine,
) -> Result<()> {
    let config_dir = site.root.join(CONFIGURATION_DIR);
    let target_dir = layout.source_root.join("etc").join("spack");
    fs::create_dir_all(&target_dir)
        .with_context(|| format!("create directory {}", target_dir.display()))?;

    let view = EnvironmentView::build(site, None)?;
    let entries = fs::read_dir(&config_dir)
        .with_context(|| format!("read directory {}", config_dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("list {}", config_dir.display()))?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if let Some(captures) = YAML_TEMPLATE_RE.captures(name) {
            let rendered =
                engine.render(&format!("{CONFIGURATION_DIR}/{name}"), view.customisation())?;
            let target = target_dir.join(&captures[1]);
            fs::write(&target, rendered)
                .with_context(|| format!("write {}", target.display()))?;
            debug!(file = name, target = %target.display(), "rendered configuration file");
        } else {
            let target = target_dir.join(name);
            fs::copy(entry.path(), &target)
                .with_context(|| format!("copy {name} to {}", target.display()))?;
            debug!(file = name, target = %target.display(), "copied configuration file");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fake_spack_checkout, minimal_site};

    #[test]
    fn write_env_renders_into_existing_directory() {
        let (site, _temp) = minimal_site();
        let layout = fake_spack_checkout(&site);
        let engine = TemplateEngine::new(&site.root);

        write_env(&site, &layout, &engine, "alpha", false).expect("write env");

        let rendered = fs::read_to_string(layout.environment_dir("alpha").join("spack.yaml"))
            .expect("read spack.yaml");
        assert!(rendered.contains("DO NOT EDIT THIS FILE DIRECTLY"));
        assert!(rendered.contains("- gcc"));
        assert!(rendered.contains("- intel"));
    }

    #[test]
    fn write_env_requires_created_environment() {
        let (site, _temp) = minimal_site();
        // layout without environment directories
        let layout = StackLayout::new(&site.config);
        let engine = TemplateEngine::new(&site.root);

        let err = write_env(&site, &layout, &engine, "alpha", false).expect_err("must fail");
        assert!(err.to_string().contains("spack env create alpha"));
    }

    #[test]
    fn install_configuration_renders_templates_and_copies_files() {
        let (site, temp) = minimal_site();
        let layout = fake_spack_checkout(&site);
        let engine = TemplateEngine::new(&site.root);

        let config_dir = temp.path().join(CONFIGURATION_DIR);
        fs::create_dir_all(&config_dir).expect("create configuration dir");
        fs::write(
            config_dir.join("modules.yaml.j2"),
            "modules:\n  prefix: {{ spack_root }}\n",
        )
        .expect("write template");
        fs::write(config_dir.join("mirrors.yaml"), "mirrors: {}\n").expect("write plain file");

        install_configuration(&site, &layout, &engine).expect("install configuration");

        let etc = layout.source_root.join("etc").join("spack");
        let modules = fs::read_to_string(etc.join("modules.yaml")).expect("read modules.yaml");
        assert!(modules.contains(&format!("prefix: {}", temp.path().display())));
        assert_eq!(
            fs::read_to_string(etc.join("mirrors.yaml")).expect("read mirrors.yaml"),
            "mirrors: {}\n"
        );
    }
}
