// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};

use crate::scope::Variables;

/// Ordered option values of one actor, exactly as written in the flow file.
///
/// Values are kept raw. `${name}` placeholders are substituted every time an
/// option is read, before the text is coerced into the requested type, so a
/// changed variable takes effect on the next read.
///
/// ```
/// use actorflow::config::Options;
/// use actorflow::scope::Variables;
///
/// let vars = Variables::new();
/// vars.set("n", "3");
/// let options = Options::new().with("count", "${n}").with("label", "run ${n}");
///
/// assert_eq!(options.parse::<u64>("count", &vars).unwrap(), Some(3));
/// assert_eq!(options.text("label", &vars).as_deref(), Some("run 3"));
/// assert!(options.is_variable_bound("count"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    values: Mapping,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_mapping(values: Mapping) -> Self {
        Self { values }
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(Value::String(key.to_string()), value.into());
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(Value::String(key.to_string()), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.values
            .keys()
            .filter_map(|k| k.as_str().map(str::to_string))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_mapping(&self) -> Mapping {
        self.values.clone()
    }

    /// True when the raw value contains a `${...}` placeholder.
    pub fn is_variable_bound(&self, key: &str) -> bool {
        self.raw(key)
            .map(|value| {
                let mut names = Vec::new();
                collect_names(value, &mut names);
                !names.is_empty()
            })
            .unwrap_or(false)
    }

    /// Every variable name referenced by any option.
    pub fn variable_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for value in self.values.values() {
            collect_names(value, &mut names);
        }
        names.sort();
        names.dedup();
        names
    }

    /// A scalar option as written, without expanding variables.
    pub fn raw_text(&self, key: &str) -> Option<String> {
        self.raw(key).and_then(scalar_text)
    }

    /// A literal boolean option; `false` when unset, unparseable or bound to a variable.
    pub fn flag(&self, key: &str) -> bool {
        self.raw_text(key)
            .and_then(|t| t.parse::<bool>().ok())
            .unwrap_or(false)
    }

    /// A scalar option as expanded text.
    pub fn text(&self, key: &str, vars: &Variables) -> Option<String> {
        self.raw(key).and_then(scalar_text).map(|t| vars.expand(&t))
    }

    /// A scalar option expanded and parsed into `T`.
    pub fn parse<T>(&self, key: &str, vars: &Variables) -> Result<Option<T>, String>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(value) = self.raw(key) else {
            return Ok(None);
        };
        let text = scalar_text(value).ok_or_else(|| "expected a single value".to_string())?;
        let expanded = vars.expand(&text);
        expanded
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("cannot parse '{}': {}", expanded, e))
    }

    /// A list option; a single scalar is treated as a one-element list.
    pub fn list(&self, key: &str, vars: &Variables) -> Result<Option<Vec<String>>, String> {
        match self.raw(key) {
            None => Ok(None),
            Some(Value::Sequence(items)) => items
                .iter()
                .map(|item| {
                    scalar_text(item)
                        .map(|t| vars.expand(&t))
                        .ok_or_else(|| "list entries must be single values".to_string())
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(value) => scalar_text(value)
                .map(|t| Some(vec![vars.expand(&t)]))
                .ok_or_else(|| "expected a list".to_string()),
        }
    }

    /// A structured option deserialized into `T` after expanding every
    /// string inside it.
    pub fn value<T: DeserializeOwned>(&self, key: &str, vars: &Variables) -> Result<Option<T>, String> {
        match self.raw(key) {
            None => Ok(None),
            Some(value) => {
                let expanded = expand_value(value, vars);
                serde_yaml::from_value(expanded)
                    .map(Some)
                    .map_err(|e| e.to_string())
            }
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn collect_names(value: &Value, names: &mut Vec<String>) {
    match value {
        Value::String(s) => names.extend(Variables::referenced_names(s)),
        Value::Sequence(items) => items.iter().for_each(|item| collect_names(item, names)),
        Value::Mapping(map) => map.values().for_each(|item| collect_names(item, names)),
        Value::Tagged(tagged) => collect_names(&tagged.value, names),
        _ => {}
    }
}

fn expand_value(value: &Value, vars: &Variables) -> Value {
    match value {
        Value::String(s) => Value::String(vars.expand(s)),
        Value::Sequence(items) => Value::Sequence(items.iter().map(|v| expand_value(v, vars)).collect()),
        Value::Mapping(map) => Value::Mapping(
            map.iter()
                .map(|(k, v)| (k.clone(), expand_value(v, vars)))
                .collect(),
        ),
        other => other.clone(),
    }
}
