//! CLI tests for the environment listing and rendering commands.

use std::fs;
use std::process::Command;

use stackenv::core::config::Site;
use stackenv::exit_codes;
use stackenv::test_support::{fake_spack_checkout, write_minimal_site};

fn run_in(dir: &std::path::Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_stackenv"))
        .env_remove("STACKENV_RELEASE")
        .current_dir(dir)
        .args(["--input", "quartz.yaml"])
        .args(args)
        .output()
        .expect("run stackenv")
}

#[test]
fn list_envs_filters_cloud_environments() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_minimal_site(temp.path());

    let output = run_in(temp.path(), &["list-envs"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "alpha\n");

    let output = run_in(temp.path(), &["list-envs", "--cloud", "aws"]);
    assert_eq!(String::from_utf8_lossy(&output.stdout), "beta\n");

    let output = run_in(temp.path(), &["list-envs", "--all"]);
    assert_eq!(String::from_utf8_lossy(&output.stdout), "alpha\nbeta\n");
}

#[test]
fn list_compilers_prints_pinned_specs() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_minimal_site(temp.path());

    let output = run_in(temp.path(), &["list-compilers", "--env", "alpha"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("gcc@12.3.0 %gcc@11.3.0"));
    assert!(stdout.contains("intel@2021.9.0 %gcc@11.3.0"));
}

#[test]
fn create_env_renders_spack_yaml() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config_path = write_minimal_site(temp.path());
    let site = Site::load(&config_path).expect("load site");
    let layout = fake_spack_checkout(&site);

    let output = run_in(temp.path(), &["create-env", "--env", "beta"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));

    let rendered = fs::read_to_string(layout.environment_dir("beta").join("spack.yaml"))
        .expect("read spack.yaml");
    assert!(rendered.starts_with("# DO NOT EDIT THIS FILE DIRECTLY"));
}

#[test]
fn get_entry_prints_strings_bare() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_minimal_site(temp.path());

    let output = run_in(
        temp.path(),
        &["get-entry", "environment.core_compiler", "--env", "alpha"],
    );
    assert_eq!(String::from_utf8_lossy(&output.stdout), "gcc@11.3.0\n");

    let output = run_in(temp.path(), &["get-entry", "environment.nope"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(
        String::from_utf8_lossy(&output.stdout).contains("was not specified in the configuration")
    );
}

#[test]
fn release_and_dir_queries_print_layout_paths() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_minimal_site(temp.path());

    let output = run_in(temp.path(), &["release"]);
    assert_eq!(String::from_utf8_lossy(&output.stdout), "v0.21.0\n");

    let output = run_in(temp.path(), &["checkout-dir"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.trim().ends_with("quartz/spack.v1"));

    let output = run_in(temp.path(), &["external-dir"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.trim().ends_with("external"));
}

#[test]
fn unknown_environment_reports_valid_names() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_minimal_site(temp.path());

    let output = run_in(temp.path(), &["create-env", "--env", "gamma"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("alpha, beta"));
}
