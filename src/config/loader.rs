// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::actors::ActorFactory;
use crate::config::validate_flow_config;
use crate::errors::{ConfigError, FailureStrategy};

/// A flow definition as stored in a YAML file.
///
/// The top-level `actors` become the children of the flow's root sequence.
///
/// # Example
/// ```yaml
/// name: doubled
/// failure_strategy: fail_fast
/// executor_options:
///   max_threads: 4
/// variables:
///   factor: "2"
/// actors:
///   - name: numbers
///     class: integer_range
///     options: { start: 1, end: 3 }
///   - name: double
///     class: scale
///     options: { factor: "${factor}" }
///   - name: results
///     class: collector
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    pub name: String,
    #[serde(default)]
    pub failure_strategy: FailureStrategy,
    #[serde(default, skip_serializing_if = "ExecutorOptions::is_default")]
    pub executor_options: ExecutorOptions,
    /// Initial flow parameters; scalar values are stored as text
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, Value>,
    #[serde(default)]
    pub actors: Vec<ActorConfig>,
}

/// Executor-wide settings.
///
/// # Fields
/// * `max_threads` - Worker count for parallel branches configured with `max_threads: -1`
///   (defaults to the available parallelism)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutorOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_threads: Option<usize>,
}

impl ExecutorOptions {
    fn is_default(&self) -> bool {
        self == &Self::default()
    }
}

/// One node of the actor tree.
///
/// Unknown option keys are kept (so a definition round-trips unchanged) and
/// reported with a warning when the actor is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorConfig {
    pub name: String,
    pub class: String,
    #[serde(default, skip_serializing_if = "Mapping::is_empty")]
    pub options: Mapping,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ActorConfig>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub non_fatal: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub stop_flow_on_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ActorConfig {
    pub fn new(name: &str, class: &str) -> Self {
        Self {
            name: name.to_string(),
            class: class.to_string(),
            options: Mapping::new(),
            children: Vec::new(),
            skip: false,
            non_fatal: false,
            stop_flow_on_error: false,
            annotation: None,
        }
    }

    pub fn with_option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.options.insert(Value::String(key.to_string()), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<ActorConfig>) -> Self {
        self.children = children;
        self
    }
}

impl FlowConfig {
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Load a flow definition from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FlowConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    FlowConfig::from_yaml(&content)
}

/// Load a flow definition and check its structure against the built-in
/// actor classes.
///
/// Every structural problem is reported at once in
/// [`ConfigError::Validation`].
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<FlowConfig, ConfigError> {
    let cfg = load_config(path)?;
    validate_flow_config(&cfg, &ActorFactory::with_builtins()).map_err(ConfigError::Validation)?;
    Ok(cfg)
}

/// Write a flow definition to a YAML file.
pub fn save_config<P: AsRef<Path>>(cfg: &FlowConfig, path: P) -> Result<(), ConfigError> {
    fs::write(path, cfg.to_yaml()?)?;
    Ok(())
}
