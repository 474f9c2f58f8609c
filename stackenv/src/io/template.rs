//! Template engine for site-provided Jinja templates.
//!
//! Templates live on disk in the site directory (`templates/`,
//! `configuration/`) and are rendered against an environment view. The
//! filter and function set mirrors what the site templates expect:
//! `exists`, `list_if_not`, `filter_variant`, `compiler`, `absolute_path`,
//! `regex_replace`, plus `cuda_variant`/`hip_variant`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use minijinja::value::{Kwargs, Value as TemplateValue, ValueKind};
use minijinja::{Environment, Error as TemplateError, ErrorKind, path_loader};
use serde_yaml::Mapping;

use crate::core::compiler::toolchain_command;
use crate::core::variant::{GpuVariantOptions, cuda_variant, hip_variant, strip_variants};

/// Template engine rooted at the site directory.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    pub fn new(site_root: &Path) -> Self {
        let mut env = Environment::new();
        env.set_loader(path_loader(site_root));

        env.add_filter("exists", |path: String| Path::new(&path).exists());
        env.add_filter("list_if_not", |value: TemplateValue| {
            if value.kind() == ValueKind::Seq {
                value
            } else {
                TemplateValue::from_serialize(vec![value])
            }
        });
        env.add_filter("filter_variant", filter_variant);
        env.add_filter("compiler", |toolchain: String, component: Option<String>| {
            toolchain_command(&toolchain, component.as_deref().unwrap_or("cc"))
                .map(str::to_string)
                .map_err(invalid_op)
        });
        env.add_filter("absolute_path", absolute_path);
        env.add_filter(
            "regex_replace",
            |value: String, find: String, replace: String| {
                let re = regex::Regex::new(&find).map_err(invalid_op)?;
                Ok::<_, TemplateError>(re.replace_all(&value, replace.as_str()).into_owned())
            },
        );

        env.add_function(
            "cuda_variant",
            |environment: TemplateValue, kwargs: Kwargs| {
                let environment = yaml_mapping(&environment)?;
                let opts = gpu_options(&kwargs)?;
                cuda_variant(&environment, &opts).map_err(invalid_op)
            },
        );
        env.add_function(
            "hip_variant",
            |environment: TemplateValue, kwargs: Kwargs| {
                let environment = yaml_mapping(&environment)?;
                let opts = gpu_options(&kwargs)?;
                hip_variant(&environment, &opts).map_err(invalid_op)
            },
        );

        Self { env }
    }

    /// Render a template (path relative to the site directory) against a
    /// customisation mapping.
    pub fn render(&self, template: &str, customisation: &Mapping) -> Result<String> {
        let template = self
            .env
            .get_template(template)
            .with_context(|| format!("load template {template}"))?;
        let rendered = template
            .render(customisation)
            .with_context(|| format!("render template {}", template.name()))?;
        Ok(rendered)
    }
}

fn invalid_op(err: impl ToString) -> TemplateError {
    TemplateError::new(ErrorKind::InvalidOperation, err.to_string())
}

fn yaml_mapping(value: &TemplateValue) -> Result<Mapping, TemplateError> {
    let yaml: serde_yaml::Value = serde_yaml::to_value(value).map_err(invalid_op)?;
    yaml.as_mapping()
        .cloned()
        .ok_or_else(|| invalid_op("environment argument must be a mapping"))
}

fn gpu_options(kwargs: &Kwargs) -> Result<GpuVariantOptions, TemplateError> {
    let defaults = GpuVariantOptions::default();
    let opts = GpuVariantOptions {
        arch: kwargs.get::<Option<bool>>("arch")?.unwrap_or(defaults.arch),
        extra_off: kwargs
            .get::<Option<String>>("extra_off")?
            .unwrap_or(defaults.extra_off),
        extra_on: kwargs
            .get::<Option<String>>("extra_on")?
            .unwrap_or(defaults.extra_on),
        stack: kwargs
            .get::<Option<String>>("stack")?
            .unwrap_or(defaults.stack),
        dep: kwargs.get::<Option<bool>>("dep")?.unwrap_or(defaults.dep),
    };
    kwargs.assert_all_used()?;
    Ok(opts)
}

fn filter_variant(value: TemplateValue) -> Result<TemplateValue, TemplateError> {
    if let Some(spec) = value.as_str() {
        return Ok(TemplateValue::from(strip_variants(spec)));
    }
    if value.kind() == ValueKind::Seq {
        let mut stripped = Vec::new();
        for item in value.try_iter()? {
            let spec = item
                .as_str()
                .ok_or_else(|| invalid_op("filter_variant expects strings"))?;
            stripped.push(strip_variants(spec));
        }
        return Ok(TemplateValue::from_serialize(&stripped));
    }
    Err(invalid_op("filter_variant expects a string or a list"))
}

fn absolute_path(value: String, prefix: Option<TemplateValue>) -> Result<String, TemplateError> {
    let path = Path::new(&value);
    if path.is_absolute() {
        return Ok(value);
    }
    let joined = match prefix {
        None => std::path::absolute(path).map_err(invalid_op)?,
        Some(prefix) => {
            if prefix.kind() == ValueKind::Seq {
                let mut base = PathBuf::new();
                for part in prefix.try_iter()? {
                    let part = part
                        .as_str()
                        .ok_or_else(|| invalid_op("absolute_path prefix parts must be strings"))?
                        .to_string();
                    base.push(part);
                }
                base.join(path)
            } else if let Some(prefix) = prefix.as_str() {
                Path::new(prefix).join(path)
            } else {
                return Err(invalid_op("absolute_path prefix must be a string or a list"));
            }
        }
    };
    Ok(joined.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::environment::EnvironmentView;
    use crate::test_support::minimal_site;
    use std::fs;

    fn render_snippet(snippet: &str, environment_name: &str) -> String {
        let (site, temp) = minimal_site();
        fs::write(temp.path().join("snippet.j2"), snippet).expect("write template");
        let view = EnvironmentView::build(&site, Some(environment_name)).expect("view");
        let engine = TemplateEngine::new(&site.root);
        engine
            .render("snippet.j2", view.customisation())
            .expect("render")
    }

    #[test]
    fn compiler_filter_resolves_commands() {
        assert_eq!(render_snippet("{{ 'intel'|compiler('f90') }}", "alpha"), "ifort");
        assert_eq!(render_snippet("{{ 'clang'|compiler }}", "alpha"), "clang");
    }

    #[test]
    fn filter_variant_strips_strings_and_lists() {
        assert_eq!(
            render_snippet("{{ 'hdf5@1.14 +mpi~shared'|filter_variant }}", "alpha"),
            "hdf5@1.14"
        );
        assert_eq!(
            render_snippet(
                "{{ ['a +x', 'b ~y']|filter_variant|join(',') }}",
                "alpha"
            ),
            "a,b"
        );
    }

    #[test]
    fn gpu_variant_functions_read_the_environment() {
        assert_eq!(
            render_snippet("{{ cuda_variant(environment, dep=true) }}", "beta"),
            "+cuda cuda_arch=80 ^cuda@12.1"
        );
        assert_eq!(
            render_snippet("{{ cuda_variant(environment) }}", "alpha"),
            "~cuda"
        );
        assert_eq!(
            render_snippet("{{ hip_variant(environment, extra_off='~rocm') }}", "beta"),
            "~hip~rocm"
        );
    }

    #[test]
    fn absolute_path_joins_string_and_list_prefixes() {
        assert_eq!(
            render_snippet("{{ 'sub'|absolute_path('/opt') }}", "alpha"),
            "/opt/sub"
        );
        assert_eq!(
            render_snippet("{{ 'sub'|absolute_path(['/opt', 'stack']) }}", "alpha"),
            "/opt/stack/sub"
        );
        assert_eq!(
            render_snippet("{{ '/abs'|absolute_path('/opt') }}", "alpha"),
            "/abs"
        );
    }

    #[test]
    fn regex_replace_and_list_if_not_behave() {
        assert_eq!(
            render_snippet("{{ 'a-b-c'|regex_replace('-', '_') }}", "alpha"),
            "a_b_c"
        );
        assert_eq!(
            render_snippet("{{ 'one'|list_if_not|length }}", "alpha"),
            "1"
        );
    }
}
