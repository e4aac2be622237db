// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::errors::{DuplicateNameError, UnresolvedReferenceError};
use crate::traits::{Actor, SharedActor};

/// Non-owning handle to a callable actor. The actor tree keeps the only
/// strong reference.
#[derive(Clone)]
pub struct ActorRef {
    name: String,
    actor: Weak<Mutex<Box<dyn Actor>>>,
}

impl ActorRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The actor, or `None` once its owner dropped it.
    pub fn upgrade(&self) -> Option<SharedActor> {
        self.actor.upgrade()
    }
}

impl std::fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorRef")
            .field("name", &self.name)
            .field("alive", &(self.actor.strong_count() > 0))
            .finish()
    }
}

/// Name to actor lookup for one flow instance.
///
/// Also keeps the call graph between callable actors so references that
/// would recurse are caught during setup.
#[derive(Default)]
pub struct CallableRegistry {
    actors: RwLock<HashMap<String, Weak<Mutex<Box<dyn Actor>>>>>,
    calls: RwLock<HashMap<String, HashSet<String>>>,
}

impl CallableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: &str, actor: &SharedActor) -> Result<(), DuplicateNameError> {
        let mut actors = self.actors.write();
        if actors.contains_key(name) {
            return Err(DuplicateNameError {
                name: name.to_string(),
            });
        }
        actors.insert(name.to_string(), Arc::downgrade(actor));
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<ActorRef, UnresolvedReferenceError> {
        let actors = self.actors.read();
        match actors.get(name) {
            Some(actor) if actor.strong_count() > 0 => Ok(ActorRef {
                name: name.to_string(),
                actor: actor.clone(),
            }),
            _ => Err(UnresolvedReferenceError {
                name: name.to_string(),
            }),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actors.read().contains_key(name)
    }

    /// Sorted registered names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.actors.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Records that the body of callable `caller` references `callee`.
    ///
    /// Fails with the call cycle, starting and ending at `caller`, when
    /// `callee` already leads back to `caller`. A failed link is not recorded.
    pub fn link(&self, caller: &str, callee: &str) -> Result<(), Vec<String>> {
        let mut calls = self.calls.write();
        if let Some(path) = call_path(&calls, callee, caller, &mut HashSet::new()) {
            let mut cycle = vec![caller.to_string()];
            cycle.extend(path);
            return Err(cycle);
        }
        calls
            .entry(caller.to_string())
            .or_default()
            .insert(callee.to_string());
        Ok(())
    }

    pub fn clear(&self) {
        self.actors.write().clear();
        self.calls.write().clear();
    }
}

fn call_path(
    calls: &HashMap<String, HashSet<String>>,
    from: &str,
    to: &str,
    seen: &mut HashSet<String>,
) -> Option<Vec<String>> {
    if from == to {
        return Some(vec![to.to_string()]);
    }
    if !seen.insert(from.to_string()) {
        return None;
    }
    let mut next: Vec<&String> = calls.get(from).into_iter().flatten().collect();
    next.sort();
    for callee in next {
        if let Some(mut path) = call_path(calls, callee, to, seen) {
            path.insert(0, from.to_string());
            return Some(path);
        }
    }
    None
}

impl std::fmt::Debug for CallableRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallableRegistry")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::sinks::NullSink;
    use crate::traits::{share, ActorBase};

    fn shared(name: &str) -> SharedActor {
        share(Box::new(NullSink::new(ActorBase::new(name))))
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = CallableRegistry::new();
        let first = shared("sink");
        let second = shared("sink");

        assert!(registry.register("sink", &first).is_ok());
        let error = registry.register("sink", &second).unwrap_err();
        assert_eq!(error.name, "sink");
        assert_eq!(registry.names(), vec!["sink"]);
    }

    #[test]
    fn test_unregistered_name_fails() {
        let registry = CallableRegistry::new();
        let error = registry.resolve("nowhere").unwrap_err();
        assert_eq!(error.name, "nowhere");
    }

    #[test]
    fn test_link_rejects_call_cycles() {
        struct TestCase {
            name: &'static str,
            links: Vec<(&'static str, &'static str)>,
            caller: &'static str,
            callee: &'static str,
            expected: Result<(), Vec<&'static str>>,
        }

        let cases = vec![
            TestCase {
                name: "self reference",
                links: vec![],
                caller: "a",
                callee: "a",
                expected: Err(vec!["a", "a"]),
            },
            TestCase {
                name: "two step cycle",
                links: vec![("a", "b")],
                caller: "b",
                callee: "a",
                expected: Err(vec!["b", "a", "b"]),
            },
            TestCase {
                name: "three step cycle",
                links: vec![("a", "b"), ("b", "c")],
                caller: "c",
                callee: "a",
                expected: Err(vec!["c", "a", "b", "c"]),
            },
            TestCase {
                name: "diamond is fine",
                links: vec![("a", "b"), ("a", "c"), ("b", "d")],
                caller: "c",
                callee: "d",
                expected: Ok(()),
            },
        ];

        for case in cases {
            let registry = CallableRegistry::new();
            for (caller, callee) in &case.links {
                registry.link(caller, callee).unwrap();
            }
            let result = registry.link(case.caller, case.callee);
            let expected = case
                .expected
                .map_err(|cycle| cycle.into_iter().map(String::from).collect::<Vec<_>>());
            assert_eq!(result, expected, "case: {}", case.name);
        }
    }

    #[test]
    fn test_failed_link_is_not_recorded() {
        let registry = CallableRegistry::new();
        registry.link("a", "b").unwrap();
        assert!(registry.link("b", "a").is_err());
        assert!(registry.link("a", "c").is_ok());
        registry.clear();
        assert!(registry.link("b", "a").is_ok());
    }

    #[tokio::test]
    async fn test_resolve_is_non_owning() {
        let registry = CallableRegistry::new();
        let actor = shared("sink");
        registry.register("sink", &actor).unwrap();

        let reference = registry.resolve("sink").unwrap();
        let upgraded = reference.upgrade().unwrap();
        assert_eq!(upgraded.lock().await.name(), "sink");
        drop(upgraded);

        assert_eq!(Arc::strong_count(&actor), 1);
        drop(actor);
        assert!(reference.upgrade().is_none());
        assert!(registry.resolve("sink").is_err());
    }
}
