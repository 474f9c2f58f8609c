//! Compiler toolchain table and compiler spec naming.

use std::sync::LazyLock;

use anyhow::{Result, anyhow};
use regex::Regex;
use serde_yaml::{Mapping, Value};

static NVPTX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+nvptx").expect("nvptx regex is valid"));

/// Map a toolchain name and language component (`cc`, `c++`, `f77`, `f90`)
/// to the compiler command it provides.
pub fn toolchain_command(toolchain: &str, component: &str) -> Result<&'static str> {
    let command = match (toolchain, component) {
        ("intel", "cc") => "icc",
        ("intel", "c++") => "icpc",
        ("intel", "f77" | "f90") => "ifort",
        ("gcc", "cc") => "gcc",
        ("gcc", "c++") => "g++",
        ("gcc", "f77" | "f90") => "gfortran",
        ("clang", "cc") => "clang",
        ("clang", "c++") => "clang++",
        ("clang", "f77" | "f90") => "flang",
        ("nvhpc", "cc") => "nvc",
        ("nvhpc", "c++") => "nvc++",
        ("nvhpc", "f77" | "f90") => "nvfortran",
        _ => return Err(anyhow!("unknown toolchain/component {toolchain}/{component}")),
    };
    Ok(command)
}

/// Build the full spec name for a compiler.
///
/// A `+nvptx` compiler gains a `^<cuda package>` dependency when the owning
/// stack-type mapping defines one; a spec without an explicit `%` is pinned
/// to the core compiler.
pub fn compiler_spec(compiler: &str, core_compiler: &str, stack: Option<&Mapping>) -> String {
    let mut spec = compiler.to_string();
    if let Some(stack) = stack
        && NVPTX_RE.is_match(compiler)
        && let Some(package) = stack
            .get("cuda")
            .and_then(|cuda| cuda.get("package"))
            .and_then(Value::as_str)
    {
        spec = format!("{spec} ^{package}");
    }
    if spec.contains('%') {
        return spec;
    }
    format!("{spec} %{core_compiler}")
}
