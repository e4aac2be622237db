// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Shipped actor classes.
//!
//! Leaf actors live in [`sources`], [`transformers`], [`sinks`] and
//! [`standalones`]; handlers owning children live in [`control`]. Every class
//! is reachable by its class id through [`factory::ActorFactory`].

use std::str::FromStr;

use crate::engine::FlowContext;
use crate::scope::StorageScope;

pub mod conditions;
pub mod control;
pub mod factory;
pub mod sinks;
pub mod sources;
pub mod standalones;
pub mod transformers;

#[cfg(test)]
pub mod stub;

pub use factory::{ActorClass, ActorFactory};

/// The `scope` option of storage actors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeOption {
    Flow,
    /// The cache of the innermost enclosing loop or branch
    Cache,
}

impl ScopeOption {
    pub fn resolve(self, ctx: &FlowContext) -> StorageScope {
        match self {
            ScopeOption::Flow => StorageScope::Flow,
            ScopeOption::Cache => ctx.cache_scope(),
        }
    }
}

impl FromStr for ScopeOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flow" => Ok(ScopeOption::Flow),
            "cache" => Ok(ScopeOption::Cache),
            other => Err(format!("unknown scope '{}', expected flow or cache", other)),
        }
    }
}
