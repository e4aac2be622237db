// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use super::control::*;
use super::sinks::*;
use super::sources::*;
use super::standalones::*;
use super::transformers::*;
use crate::traits::{Actor, ActorBase};

/// Builds an actor from its base (name, options, flags) and its already
/// built children.
pub type Constructor = fn(ActorBase, Vec<Box<dyn Actor>>) -> Box<dyn Actor>;

/// One entry of the [`ActorFactory`].
#[derive(Clone)]
pub struct ActorClass {
    pub class: String,
    pub description: &'static str,
    /// Option keys the class reads; anything else is ignored with a warning
    pub options: &'static [&'static str],
    pub accepts_children: bool,
    pub constructor: Constructor,
}

impl ActorClass {
    pub fn leaf(
        class: &str,
        description: &'static str,
        options: &'static [&'static str],
        constructor: Constructor,
    ) -> Self {
        Self {
            class: class.to_string(),
            description,
            options,
            accepts_children: false,
            constructor,
        }
    }

    pub fn handler(
        class: &str,
        description: &'static str,
        options: &'static [&'static str],
        constructor: Constructor,
    ) -> Self {
        Self {
            accepts_children: true,
            ..Self::leaf(class, description, options, constructor)
        }
    }

    pub fn knows_option(&self, key: &str) -> bool {
        self.options.contains(&key)
    }
}

impl std::fmt::Debug for ActorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorClass")
            .field("class", &self.class)
            .field("accepts_children", &self.accepts_children)
            .finish()
    }
}

/// Class id to constructor lookup used when building flows from
/// configuration.
///
/// Built-in classes:
/// - sources: `integer_range`, `string_constants`, `storage_value`, `variable_value`
/// - transformers: `scale`, `set_variable`, `set_storage_value`, `pass_through`, `convert`
/// - sinks: `null`, `collector`, `log`
/// - standalones: `set_variable_standalone`, `stop`
/// - handlers: `sequence`, `branch`, `switch`, `loop`, `event_trigger`,
///   `try_catch`, `tee`, `trigger`, `local_scope_trigger`, `callable_actors`
/// - callable references: `callable_source`, `callable_transformer`, `callable_sink`
#[derive(Debug, Clone, Default)]
pub struct ActorFactory {
    classes: BTreeMap<String, ActorClass>,
}

impl ActorFactory {
    /// A factory without any classes.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut factory = Self::empty();
        for class in builtin_classes() {
            factory.register(class);
        }
        factory
    }

    /// Adds or replaces a class.
    pub fn register(&mut self, class: ActorClass) {
        self.classes.insert(class.class.clone(), class);
    }

    pub fn class(&self, class: &str) -> Option<&ActorClass> {
        self.classes.get(class)
    }

    pub fn is_class_available(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    /// Sorted class ids.
    pub fn list_available_classes(&self) -> Vec<&str> {
        self.classes.keys().map(String::as_str).collect()
    }

    pub fn create_actor(
        &self,
        class: &str,
        base: ActorBase,
        children: Vec<Box<dyn Actor>>,
    ) -> Result<Box<dyn Actor>, String> {
        let entry = self
            .classes
            .get(class)
            .ok_or_else(|| format!("Unknown actor class: '{}'", class))?;
        if !entry.accepts_children && !children.is_empty() {
            return Err(format!("Actor class '{}' does not take children", class));
        }
        Ok((entry.constructor)(base, children))
    }
}

fn builtin_classes() -> Vec<ActorClass> {
    vec![
        // Sources
        ActorClass::leaf(
            "integer_range",
            "Emits integers from start to end",
            &["start", "end", "step"],
            |base, _| Box::new(IntegerRange::new(base)),
        ),
        ActorClass::leaf(
            "string_constants",
            "Emits a fixed list of strings",
            &["strings"],
            |base, _| Box::new(StringConstants::new(base)),
        ),
        ActorClass::leaf(
            "storage_value",
            "Emits a stored payload",
            &["key", "scope"],
            |base, _| Box::new(StorageValue::new(base)),
        ),
        ActorClass::leaf(
            "variable_value",
            "Emits the value of a variable",
            &["variable", "type"],
            |base, _| Box::new(VariableValue::new(base)),
        ),
        // Transformers
        ActorClass::leaf(
            "scale",
            "Multiplies numbers by a factor",
            &["factor"],
            |base, _| Box::new(Scale::new(base)),
        ),
        ActorClass::leaf(
            "set_variable",
            "Stores tokens in a variable",
            &["variable", "value"],
            |base, _| Box::new(SetVariable::new(base)),
        ),
        ActorClass::leaf(
            "set_storage_value",
            "Stores payloads in storage",
            &["key", "scope"],
            |base, _| Box::new(SetStorageValue::new(base)),
        ),
        ActorClass::leaf(
            "pass_through",
            "Forwards tokens unchanged",
            &[],
            |base, _| Box::new(PassThrough::new(base)),
        ),
        ActorClass::leaf(
            "convert",
            "Converts payloads to another type",
            &["to"],
            |base, _| Box::new(Convert::new(base)),
        ),
        // Sinks
        ActorClass::leaf("null", "Discards tokens", &[], |base, _| {
            Box::new(NullSink::new(base))
        }),
        ActorClass::leaf(
            "collector",
            "Keeps every token",
            &["key", "scope"],
            |base, _| Box::new(Collector::new(base)),
        ),
        ActorClass::leaf("log", "Logs tokens", &["prefix"], |base, _| {
            Box::new(LogSink::new(base))
        }),
        // Standalones
        ActorClass::leaf(
            "set_variable_standalone",
            "Sets a variable",
            &["variable", "value"],
            |base, _| Box::new(SetVariableStandalone::new(base)),
        ),
        ActorClass::leaf(
            "stop",
            "Stops the flow",
            &["message"],
            |base, _| Box::new(StopFlow::new(base)),
        ),
        // Handlers
        ActorClass::handler(
            "sequence",
            "Runs children as a pipeline",
            &[],
            |base, children| Box::new(Sequence::new(base, children)),
        ),
        ActorClass::handler(
            "branch",
            "Fans tokens out to every child",
            &["max_threads", "collect_output"],
            |base, children| Box::new(Branch::new(base, children)),
        ),
        ActorClass::handler(
            "switch",
            "Routes tokens by condition",
            &["conditions"],
            |base, children| Box::new(Switch::new(base, children)),
        ),
        ActorClass::handler(
            "loop",
            "Repeats its children",
            &[
                "mode",
                "count",
                "condition",
                "max_iterations",
                "iteration_variable",
                "persistent",
            ],
            |base, children| Box::new(Loop::new(base, children)),
        ),
        ActorClass::handler(
            "event_trigger",
            "Runs its children when fired",
            &[
                "interval_ms",
                "fire_on_start",
                "max_fires",
                "fire_policy",
                "handle",
            ],
            |base, children| Box::new(EventTrigger::new(base, children)),
        ),
        ActorClass::handler(
            "try_catch",
            "Runs catch when try fails",
            &["error_variable"],
            |base, children| Box::new(TryCatch::new(base, children)),
        ),
        ActorClass::handler(
            "tee",
            "Copies tokens into a side pipeline",
            &[],
            |base, children| Box::new(Tee::new(base, children)),
        ),
        ActorClass::handler(
            "trigger",
            "Runs a sub-flow per token",
            &[],
            |base, children| Box::new(Trigger::new(base, children)),
        ),
        ActorClass::handler(
            "local_scope_trigger",
            "Runs a sub-flow per token in its own scope",
            &[
                "scope_handling_variables",
                "scope_handling_storage",
                "propagate_variables",
                "propagate_storage",
            ],
            |base, children| Box::new(LocalScopeTrigger::new(base, children)),
        ),
        ActorClass::handler(
            "callable_actors",
            "Holds actors invoked by name",
            &[],
            |base, children| Box::new(CallableActors::new(base, children)),
        ),
        // Callable references
        ActorClass::leaf(
            "callable_source",
            "Pulls tokens from a callable source",
            &["callable", "optional"],
            |base, _| Box::new(CallableRef::source(base)),
        ),
        ActorClass::leaf(
            "callable_transformer",
            "Pushes tokens through a callable transformer",
            &["callable", "optional"],
            |base, _| Box::new(CallableRef::transformer(base)),
        ),
        ActorClass::leaf(
            "callable_sink",
            "Pushes tokens into a callable sink",
            &["callable", "optional"],
            |base, _| Box::new(CallableRef::sink(base)),
        ),
    ]
}
