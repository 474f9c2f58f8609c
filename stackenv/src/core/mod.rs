//! Pure, deterministic stack logic: configuration, environment merging,
//! compiler/variant spec grammar, and path layout. No I/O lives here.

pub mod compiler;
pub mod config;
pub mod environment;
pub mod layout;
pub mod merge;
pub mod variant;
