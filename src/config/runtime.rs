// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_yaml::Value;

use crate::actors::ActorFactory;
use crate::config::{validate_flow_config, ActorConfig, FlowConfig, Options};
use crate::engine::{Flow, FlowSettings};
use crate::errors::{ConfigError, FlowError, SetupError, SetupErrors};
use crate::observability::messages::validation::UnknownOptionIgnored;
use crate::observability::messages::StructuredLog;
use crate::traits::{Actor, ActorBase};

/// Builds runnable [`Flow`]s from flow definitions.
///
/// The builder validates the definition, creates every actor through its
/// [`ActorFactory`] and seeds the flow's variables from the definition and
/// from any overrides given with [`FlowBuilder::with_variable`].
///
/// ```
/// use actorflow::config::{FlowBuilder, FlowConfig};
///
/// let config = FlowConfig::from_yaml(
///     "name: demo\nactors:\n  - { name: numbers, class: integer_range, options: { end: 3 } }\n",
/// )
/// .unwrap();
///
/// let flow = FlowBuilder::new().with_variable("run", "1").build(&config).unwrap();
/// assert_eq!(flow.context().variables().get("run").as_deref(), Some("1"));
/// ```
pub struct FlowBuilder {
    factory: ActorFactory,
    overrides: Vec<(String, String)>,
}

impl Default for FlowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowBuilder {
    /// A builder using the built-in actor classes.
    pub fn new() -> Self {
        Self::with_factory(ActorFactory::with_builtins())
    }

    pub fn with_factory(factory: ActorFactory) -> Self {
        Self {
            factory,
            overrides: Vec::new(),
        }
    }

    /// Sets `name` after the definition's own variables, replacing any
    /// value the definition gives it.
    pub fn with_variable(mut self, name: &str, value: &str) -> Self {
        self.overrides.push((name.to_string(), value.to_string()));
        self
    }

    pub fn factory(&self) -> &ActorFactory {
        &self.factory
    }

    pub fn build(&self, config: &FlowConfig) -> Result<Flow, FlowError> {
        validate_flow_config(config, &self.factory)
            .map_err(|errors| FlowError::Config(ConfigError::Validation(errors)))?;

        let mut errors = SetupErrors::new();
        let mut actors = Vec::with_capacity(config.actors.len());
        for actor in &config.actors {
            if let Some(actor) = self.build_actor(actor, &config.name, &mut errors) {
                actors.push(actor);
            }
        }
        errors.into_result()?;

        let mut settings = FlowSettings {
            name: config.name.clone(),
            failure_strategy: config.failure_strategy,
            ..FlowSettings::default()
        };
        if let Some(max_threads) = config.executor_options.max_threads {
            settings.max_threads = max_threads;
        }

        let flow = Flow::from_actors(settings, actors);
        for (name, value) in &config.variables {
            flow.set_variable(name, &variable_text(value));
        }
        for (name, value) in &self.overrides {
            flow.set_variable(name, value);
        }
        Ok(flow)
    }

    fn build_actor(
        &self,
        config: &ActorConfig,
        parent: &str,
        errors: &mut SetupErrors,
    ) -> Option<Box<dyn Actor>> {
        let path = format!("{}.{}", parent, config.name.replace('.', "\\."));

        let mut children = Vec::with_capacity(config.children.len());
        for child in &config.children {
            if let Some(child) = self.build_actor(child, &path, errors) {
                children.push(child);
            }
        }

        let Some(class) = self.factory.class(&config.class) else {
            errors.push(SetupError::UnknownClass {
                path,
                class: config.class.clone(),
            });
            return None;
        };

        let options = Options::from_mapping(config.options.clone());
        for key in options.keys() {
            if !class.knows_option(&key) {
                UnknownOptionIgnored {
                    path: &path,
                    class: &config.class,
                    option: &key,
                }
                .log();
            }
        }

        let mut base = ActorBase::new(config.name.clone()).with_options(options);
        base.skip = config.skip;
        base.non_fatal = config.non_fatal;
        base.stop_flow_on_error = config.stop_flow_on_error;
        base.annotation = config.annotation.clone();

        match self.factory.create_actor(&config.class, base, children) {
            Ok(actor) => Some(actor),
            Err(message) => {
                errors.push(SetupError::invalid(path, message));
                None
            }
        }
    }
}

fn variable_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
