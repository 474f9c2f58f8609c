//! Test-only fixtures: a minimal site directory with configuration,
//! templates, and a fake Spack checkout.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::config::Site;
use crate::core::layout::StackLayout;

/// Minimal site configuration rooted at `spack_root`.
///
/// Two environments: `alpha` (no overrides) and `beta` (cloud-hosted, with
/// an nvidia GPU stack).
pub fn minimal_site_yaml(spack_root: &Path) -> String {
    format!(
        r#"environments: [alpha, beta]
spack_root: {root}
stack_release: quartz
stack_version: v1
spack_release: v0.21.0
spack_external: external
site: testsite
default_environment:
  core_compiler: gcc@11.3.0
  compilers: [gcc, intel]
  stack_types: [stable]
  stable:
    gcc:
      compiler: gcc@12.3.0
    intel:
      compiler: intel@2021.9.0
beta:
  cloud: aws
  gpu: nvidia
  stable:
    cuda:
      package: cuda@12.1
      arch: sm_80
"#,
        root = spack_root.display()
    )
}

/// Write a complete site directory into a fresh tempdir and return the
/// configuration path.
pub fn write_minimal_site(dir: &Path) -> PathBuf {
    let config_path = dir.join("quartz.yaml");
    fs::write(&config_path, minimal_site_yaml(dir)).expect("write site config");

    let template_dir = dir.join("templates").join("common");
    fs::create_dir_all(&template_dir).expect("create template dir");
    fs::write(
        template_dir.join("spack.yaml.j2"),
        "# {{ warning }}\n# {{ info_message }}\nspack:\n  specs:\n\
         {% for name in environment.compilers %}    - {{ name }}\n{% endfor %}",
    )
    .expect("write spack.yaml template");

    config_path
}

/// Load the minimal site, keeping the tempdir alive for the test's duration.
pub fn minimal_site() -> (Site, TempDir) {
    let temp = tempfile::tempdir().expect("tempdir");
    let config_path = write_minimal_site(temp.path());
    let site = Site::load(&config_path).expect("load fixture site");
    (site, temp)
}

/// Create the environment directories and a fake `bin/spack` entry point so
/// layout preconditions hold without a real checkout.
pub fn fake_spack_checkout(site: &Site) -> StackLayout {
    let layout = StackLayout::new(&site.config);
    for environment in &site.config.environments {
        fs::create_dir_all(layout.environment_dir(environment)).expect("create env dir");
    }
    fs::create_dir_all(layout.source_root.join("bin")).expect("create bin dir");
    fs::write(layout.spack_binary(), "#!/bin/sh\nexit 0\n").expect("write fake spack");
    layout
}
