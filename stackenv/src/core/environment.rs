//! Per-environment view of the site configuration.
//!
//! The view is the full configuration document with an `environment` key
//! holding the default environment mapping deep-merged with the named
//! environment's override mapping, plus a generation banner for rendered
//! files. Everything templates and `get-entry` see goes through here.

use anyhow::{Context, Result, anyhow};
use serde_yaml::{Mapping, Value};

use crate::core::compiler::compiler_spec;
use crate::core::config::Site;
use crate::core::merge::merge_mappings;

const DO_NOT_EDIT: &str = "DO NOT EDIT THIS FILE DIRECTLY";

/// Error out on an environment name the configuration does not declare.
pub fn ensure_known_environment(site: &Site, name: &str) -> Result<()> {
    if site.config.environments.iter().any(|env| env == name) {
        return Ok(());
    }
    Err(anyhow!(
        "environment '{name}' is not defined; valid environments are: {}",
        site.config.environments.join(", ")
    ))
}

/// Merged view used for template rendering, listing and entry lookup.
///
/// `name` is `None` for the defaults-only view (no override applied).
#[derive(Debug, Clone)]
pub struct EnvironmentView {
    pub name: Option<String>,
    environment: Mapping,
    customisation: Mapping,
}

impl EnvironmentView {
    pub fn build(site: &Site, name: Option<&str>) -> Result<Self> {
        let mut environment = site.config.default_environment.clone();
        if let Some(name) = name {
            ensure_known_environment(site, name)?;
            if let Some(over) = site.raw.get(name).and_then(Value::as_mapping) {
                environment = merge_mappings(&environment, over);
            }
        }
        environment.insert(
            Value::from("name"),
            Value::from(name.unwrap_or("default")),
        );

        let mut customisation = site.raw.clone();
        customisation.insert(
            Value::from("environment"),
            Value::Mapping(environment.clone()),
        );
        customisation.insert(
            Value::from("info_message"),
            Value::from(format!(
                "This file was generated by stackenv at {}",
                chrono::Local::now().format("%x %X")
            )),
        );
        customisation.insert(Value::from("warning"), Value::from(DO_NOT_EDIT));

        Ok(Self {
            name: name.map(str::to_string),
            environment,
            customisation,
        })
    }

    /// The full rendering context (configuration plus `environment`).
    pub fn customisation(&self) -> &Mapping {
        &self.customisation
    }

    /// The merged environment mapping.
    pub fn environment(&self) -> &Mapping {
        &self.environment
    }

    /// Surface the bootstrap flag to templates.
    pub fn set_bootstrap(&mut self, bootstrap: bool) {
        self.environment
            .insert(Value::from("bootstrap"), Value::Bool(bootstrap));
        self.customisation.insert(
            Value::from("environment"),
            Value::Mapping(self.environment.clone()),
        );
    }

    /// Cloud filter used by `list-envs`: with no cloud requested, only
    /// environments without a `cloud` key match.
    pub fn matches_cloud(&self, cloud: Option<&str>) -> bool {
        let declared = self.environment.get("cloud").and_then(Value::as_str);
        match cloud {
            None => declared.is_none(),
            Some(cloud) => declared == Some(cloud),
        }
    }

    /// Look up a dotted path (e.g. `environment.core_compiler`) in the view.
    pub fn entry(&self, dotted: &str) -> Option<&Value> {
        let mut segments = dotted.split('.');
        let first = segments.next()?;
        let mut node = self.customisation.get(first)?;
        for segment in segments {
            node = node.get(segment)?;
        }
        Some(node)
    }

    /// Enumerate compiler specs for this view.
    ///
    /// Each stack under a `stack_types` entry contributes its `compiler`
    /// when the stack's name is listed in the environment's `compilers`.
    pub fn compilers(&self, stack_type: Option<&str>) -> Result<Vec<String>> {
        let stack_types: Vec<String> = match stack_type {
            Some(stack_type) => vec![stack_type.to_string()],
            None => self
                .environment
                .get("stack_types")
                .and_then(Value::as_sequence)
                .map(|types| {
                    types
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        };
        let declared: Vec<&str> = self
            .environment
            .get("compilers")
            .and_then(Value::as_sequence)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let core_compiler = self
            .environment
            .get("core_compiler")
            .and_then(Value::as_str);

        let mut specs = Vec::new();
        for stack_type in &stack_types {
            let Some(stacks) = self.environment.get(stack_type.as_str()).and_then(Value::as_mapping)
            else {
                continue;
            };
            for (name, stack) in stacks {
                let (Some(name), Some(stack)) = (name.as_str(), stack.as_mapping()) else {
                    continue;
                };
                let Some(compiler) = stack.get("compiler").and_then(Value::as_str) else {
                    continue;
                };
                if !declared.contains(&name) {
                    continue;
                }
                let core = core_compiler
                    .with_context(|| format!("core_compiler is not configured (needed for {name})"))?;
                specs.push(compiler_spec(compiler, core, Some(stacks)));
            }
        }
        Ok(specs)
    }
}

/// Environment names, optionally filtered by cloud membership.
pub fn list_envs(site: &Site, cloud: Option<&str>, all: bool) -> Result<Vec<String>> {
    if all {
        return Ok(site.config.environments.clone());
    }
    let mut names = Vec::new();
    for name in &site.config.environments {
        let view = EnvironmentView::build(site, Some(name))?;
        if view.matches_cloud(cloud) {
            names.push(name.clone());
        }
    }
    Ok(names)
}
