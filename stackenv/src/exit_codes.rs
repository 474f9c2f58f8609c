//! Stable exit codes for stackenv CLI commands.
//!
//! `stackenv install` is the exception: when a wrapped spack invocation
//! fails, the process exits with that invocation's own exit code so CI
//! pipelines see the original status.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid configuration, layout, or arguments, or an internal error.
pub const INVALID: i32 = 1;
