// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::token::Payload;

/// Where a storage entry lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageScope {
    /// Visible to the whole flow for its lifetime
    Flow,
    /// Owned by a loop or branch; cleared when that owner finishes
    Cache(String),
}

/// Flow-scoped payload cache. Last writer wins.
#[derive(Default)]
pub struct Storage {
    entries: RwLock<HashMap<StorageScope, HashMap<String, Payload>>>,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, scope: &StorageScope, key: &str) -> Option<Payload> {
        self.entries
            .read()
            .get(scope)
            .and_then(|values| values.get(key))
            .cloned()
    }

    /// Stores `value`, returning the previous entry.
    pub fn put(&self, scope: StorageScope, key: impl Into<String>, value: Payload) -> Option<Payload> {
        self.entries
            .write()
            .entry(scope)
            .or_default()
            .insert(key.into(), value)
    }

    pub fn has(&self, scope: &StorageScope, key: &str) -> bool {
        self.entries
            .read()
            .get(scope)
            .is_some_and(|values| values.contains_key(key))
    }

    pub fn remove(&self, scope: &StorageScope, key: &str) -> Option<Payload> {
        self.entries
            .write()
            .get_mut(scope)
            .and_then(|values| values.remove(key))
    }

    /// Appends `value` to the array stored under `key`, creating it if needed.
    /// A non-array entry is wrapped as the first element.
    pub fn append(&self, scope: StorageScope, key: &str, value: Payload) {
        let mut entries = self.entries.write();
        let values = entries.entry(scope).or_default();
        match values.remove(key) {
            Some(Payload::Array(mut items)) => {
                items.push(value);
                values.insert(key.to_string(), Payload::Array(items));
            }
            Some(other) => {
                values.insert(key.to_string(), Payload::Array(vec![other, value]));
            }
            None => {
                values.insert(key.to_string(), Payload::Array(vec![value]));
            }
        }
    }

    /// Drops every entry of `scope`.
    pub fn clear_scope(&self, scope: &StorageScope) {
        self.entries.write().remove(scope);
    }

    /// Sorted keys stored under `scope`.
    pub fn keys(&self, scope: &StorageScope) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .get(scope)
            .map(|values| values.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// A new storage holding the flow-scope entries. Caches stay behind.
    pub fn fork(&self) -> Self {
        let entries = self.entries.read();
        let flow = entries.get(&StorageScope::Flow).cloned().unwrap_or_default();
        Self {
            entries: RwLock::new(HashMap::from([(StorageScope::Flow, flow)])),
        }
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("scopes", &self.entries.read().len())
            .finish()
    }
}
