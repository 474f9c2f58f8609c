//! Side-effecting operations: template rendering, git checkouts, child
//! processes, and the install pipeline.

pub mod envfile;
pub mod git;
pub mod install;
pub mod process;
pub mod template;
