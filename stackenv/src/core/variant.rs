//! Spec variant helpers: stripping variant tokens and building GPU variant
//! fragments from an environment mapping.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde_yaml::{Mapping, Value};

static VARIANT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ +~^][^+~^]+").expect("variant regex is valid"));

/// Strip variant tokens (` +foo`, `~bar`, `^dep`) from a spec string.
pub fn strip_variants(spec: &str) -> String {
    VARIANT_RE.replace_all(spec, "").trim().to_string()
}

/// Options shared by [`cuda_variant`] and [`hip_variant`].
#[derive(Debug, Clone)]
pub struct GpuVariantOptions {
    /// Append the GPU architecture to the enabled fragment.
    pub arch: bool,
    /// Extra tokens appended to the disabled fragment.
    pub extra_off: String,
    /// Extra tokens appended to the enabled fragment.
    pub extra_on: String,
    /// Stack-type key to read GPU settings from.
    pub stack: String,
    /// Append a `^<package>` dependency to the enabled fragment.
    pub dep: bool,
}

impl Default for GpuVariantOptions {
    fn default() -> Self {
        Self {
            arch: true,
            extra_off: String::new(),
            extra_on: String::new(),
            stack: "stable".to_string(),
            dep: false,
        }
    }
}

fn gpu_settings<'a>(
    environment: &'a Mapping,
    stack: &str,
    vendor_key: &str,
) -> Result<&'a Mapping> {
    environment
        .get(stack)
        .and_then(|value| value.get(vendor_key))
        .and_then(Value::as_mapping)
        .with_context(|| format!("{vendor_key} settings missing under stack '{stack}'"))
}

/// Build the `+cuda`/`~cuda` fragment for an environment mapping.
pub fn cuda_variant(environment: &Mapping, opts: &GpuVariantOptions) -> Result<String> {
    let gpu = environment.get("gpu").and_then(Value::as_str);
    if gpu != Some("nvidia") {
        return Ok(format!("~cuda{}", opts.extra_off));
    }

    let mut variant = String::from("+cuda");
    if opts.arch {
        let cuda = gpu_settings(environment, &opts.stack, "cuda")?;
        let arch = cuda
            .get("arch")
            .and_then(Value::as_str)
            .with_context(|| format!("cuda arch missing under stack '{}'", opts.stack))?;
        variant = format!("{variant} cuda_arch={}", arch.replace("sm_", ""));
        if !opts.extra_on.is_empty() {
            variant = format!("{variant} {}", opts.extra_on);
        }
    }
    if opts.dep {
        let cuda = gpu_settings(environment, &opts.stack, "cuda")?;
        let package = cuda
            .get("package")
            .and_then(Value::as_str)
            .with_context(|| format!("cuda package missing under stack '{}'", opts.stack))?;
        variant = format!("{variant} ^{package}");
    }
    Ok(variant)
}

/// Build the `+hip`/`~hip` fragment for an environment mapping.
pub fn hip_variant(environment: &Mapping, opts: &GpuVariantOptions) -> Result<String> {
    let gpu = environment.get("gpu").and_then(Value::as_str);
    if gpu != Some("amd") {
        return Ok(format!("~hip{}", opts.extra_off));
    }

    let mut variant = format!("+hip{}", opts.extra_on);
    if opts.arch {
        let rocm = gpu_settings(environment, &opts.stack, "rocm")?;
        let arch = rocm
            .get("arch")
            .and_then(Value::as_str)
            .with_context(|| format!("rocm arch missing under stack '{}'", opts.stack))?;
        variant = format!("{variant} amd_gpu_arch={arch}");
    }
    Ok(variant)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nvidia_env() -> Mapping {
        serde_yaml::from_str(
            "gpu: nvidia\nstable:\n  cuda:\n    package: cuda@12.1\n    arch: sm_80",
        )
        .expect("fixture yaml")
    }

    #[test]
    fn strip_variants_removes_tokens() {
        assert_eq!(strip_variants("hdf5@1.14 +mpi~shared ^mpich@4"), "hdf5@1.14");
        assert_eq!(strip_variants("gcc@12.3.0"), "gcc@12.3.0");
    }

    #[test]
    fn cuda_variant_disabled_without_nvidia_gpu() {
        let env: Mapping = serde_yaml::from_str("gpu: amd").expect("yaml");
        let opts = GpuVariantOptions {
            extra_off: "~nccl".to_string(),
            ..GpuVariantOptions::default()
        };
        assert_eq!(cuda_variant(&env, &opts).expect("variant"), "~cuda~nccl");
    }

    #[test]
    fn cuda_variant_carries_arch_and_dependency() {
        let opts = GpuVariantOptions {
            dep: true,
            ..GpuVariantOptions::default()
        };
        assert_eq!(
            cuda_variant(&nvidia_env(), &opts).expect("variant"),
            "+cuda cuda_arch=80 ^cuda@12.1"
        );
    }

    #[test]
    fn cuda_variant_errors_when_arch_missing() {
        let env: Mapping = serde_yaml::from_str("gpu: nvidia").expect("yaml");
        let err = cuda_variant(&env, &GpuVariantOptions::default()).expect_err("must fail");
        assert!(err.to_string().contains("stack 'stable'"));
    }

    #[test]
    fn hip_variant_enabled_for_amd() {
        let env: Mapping =
            serde_yaml::from_str("gpu: amd\nstable:\n  rocm:\n    arch: gfx90a").expect("yaml");
        assert_eq!(
            hip_variant(&env, &GpuVariantOptions::default()).expect("variant"),
            "+hip amd_gpu_arch=gfx90a"
        );
    }
}
