//! Spack software-stack environment manager.
//!
//! `stackenv` drives a site's Spack deployment from a single YAML
//! configuration file: it renders `spack.yaml` environment files from
//! templates, checks out Spack and extra package repositories, and runs the
//! install / module-refresh pipeline for a named environment. The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (configuration, environment
//!   merging, spec grammar, path layout). No I/O, fully testable in
//!   isolation.
//! - **[`io`]**: Side-effecting operations (template rendering, git,
//!   process execution, the install pipeline). Isolated to keep tests on
//!   temporary directories and dry runs.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
