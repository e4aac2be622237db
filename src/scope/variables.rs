// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::observability::messages::flow::UnresolvedVariable;
use crate::observability::messages::StructuredLog;

const ENV_PREFIX: &str = "env.";

pub type ListenerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableChangeKind {
    Added,
    Modified,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableChange {
    pub name: String,
    pub kind: VariableChangeKind,
}

type Listener = Arc<dyn Fn(&VariableChange) + Send + Sync>;

/// Flow-scoped string variables with change notification.
///
/// Names are case-sensitive and flat. Listeners run synchronously on the
/// calling task after the change is visible, outside of any internal lock, so
/// a listener may read the store again.
///
/// ```
/// use actorflow::scope::Variables;
///
/// let vars = Variables::new();
/// vars.set("dir", "/tmp");
/// assert_eq!(vars.expand("${dir}/out.csv"), "/tmp/out.csv");
/// assert_eq!(vars.expand("${missing}"), "");
/// ```
#[derive(Default)]
pub struct Variables {
    values: RwLock<HashMap<String, String>>,
    listeners: RwLock<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let previous = self.values.write().insert(name.clone(), value.into());
        let kind = match previous {
            Some(_) => VariableChangeKind::Modified,
            None => VariableChangeKind::Added,
        };
        self.notify(VariableChange { name, kind });
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.values.read().get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.values.read().contains_key(name)
    }

    pub fn remove(&self, name: &str) -> Option<String> {
        let removed = self.values.write().remove(name);
        if removed.is_some() {
            self.notify(VariableChange {
                name: name.to_string(),
                kind: VariableChangeKind::Removed,
            });
        }
        removed
    }

    /// Sorted variable names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.values.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// A new store holding the same values. Listeners are not carried over.
    pub fn fork(&self) -> Self {
        Self {
            values: RwLock::new(self.values.read().clone()),
            ..Self::default()
        }
    }

    /// Replaces every `${name}` in `template`.
    ///
    /// Unknown variables expand to the empty string and log a warning.
    /// `${env.NAME}` reads the process environment. An unterminated `${` is
    /// copied verbatim.
    pub fn expand(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let name = &after[..end];
                    out.push_str(&self.lookup(name, template));
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn lookup(&self, name: &str, template: &str) -> String {
        if let Some(env_name) = name.strip_prefix(ENV_PREFIX) {
            if let Ok(value) = std::env::var(env_name) {
                return value;
            }
        } else if let Some(value) = self.get(name) {
            return value;
        }
        UnresolvedVariable { name, template }.log();
        String::new()
    }

    /// Names referenced through `${...}` in `template`, in order of appearance.
    pub fn referenced_names(template: &str) -> Vec<String> {
        let mut names = Vec::new();
        let mut rest = template;
        while let Some(start) = rest.find("${") {
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    names.push(after[..end].to_string());
                    rest = &after[end + 1..];
                }
                None => break,
            }
        }
        names
    }

    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&VariableChange) + Send + Sync + 'static,
    {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) {
        self.listeners.write().retain(|(existing, _)| *existing != id);
    }

    fn notify(&self, change: VariableChange) {
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(&change);
        }
    }
}

impl std::fmt::Debug for Variables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Variables")
            .field("names", &self.names())
            .field("listener_count", &self.listeners.read().len())
            .finish()
    }
}
