// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The actor contract.
//!
//! Every node of a flow tree implements [`Actor`]. The role an actor plays is
//! a closed set ([`ActorRole`]) reported by [`Actor::role`]; the engine
//! dispatches on it instead of on concrete types. Actors that own children
//! additionally report a [`CombinationPolicy`].
//!
//! Lifecycle, driven by [`crate::engine::director`]:
//!
//! 1. `prepare` - tree paths are assigned and callable actors registered
//! 2. `set_up` - options validated, references resolved, children set up
//! 3. `input`/`execute`/`output` - zero or more times
//! 4. `wrap_up` - always, even after errors or a partial setup
//! 5. `clean_up` - once, after `wrap_up`

use std::fmt::Write;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::engine::FlowContext;
use crate::errors::{ExecutionError, SetupErrors};
use crate::token::{PayloadType, Token};
use crate::traits::ActorBase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorRole {
    /// Performs a side effect, no tokens in or out
    Standalone,
    /// Produces tokens
    Source,
    /// Consumes one token per execution and produces zero or more
    Transformer,
    /// Consumes tokens
    Sink,
}

impl ActorRole {
    pub fn takes_input(self) -> bool {
        matches!(self, ActorRole::Transformer | ActorRole::Sink)
    }

    pub fn produces_output(self) -> bool {
        matches!(self, ActorRole::Source | ActorRole::Transformer)
    }
}

impl std::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ActorRole::Standalone => "standalone",
            ActorRole::Source => "source",
            ActorRole::Transformer => "transformer",
            ActorRole::Sink => "sink",
        };
        f.write_str(name)
    }
}

/// How a handler moves tokens and control among its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinationPolicy {
    Sequential,
    ParallelBranch,
    Conditional,
    Looping,
    EventTriggered,
}

/// An actor that can be reached from several places: callable actors,
/// parallel branches and event trigger bodies.
pub type SharedActor = Arc<Mutex<Box<dyn Actor>>>;

pub fn share(actor: Box<dyn Actor>) -> SharedActor {
    Arc::new(Mutex::new(actor))
}

#[async_trait]
pub trait Actor: Send + Sync {
    fn base(&self) -> &ActorBase;

    fn base_mut(&mut self) -> &mut ActorBase;

    fn role(&self) -> ActorRole;

    /// `Some` for handlers owning child actors.
    fn policy(&self) -> Option<CombinationPolicy> {
        None
    }

    fn name(&self) -> &str {
        self.base().name()
    }

    fn full_name(&self) -> &str {
        self.base().full_name()
    }

    /// Payload types this actor takes. Empty for actors without input.
    fn accepts(&self) -> Vec<PayloadType> {
        if self.role().takes_input() {
            vec![PayloadType::Unknown]
        } else {
            Vec::new()
        }
    }

    /// Payload types this actor emits. Empty for actors without output.
    fn generates(&self) -> Vec<PayloadType> {
        if self.role().produces_output() {
            vec![PayloadType::Unknown]
        } else {
            Vec::new()
        }
    }

    /// Short human-readable summary of the current configuration.
    fn quick_info(&self) -> Option<String> {
        None
    }

    /// Assigns the tree path below `parent` and registers callable actors.
    /// Handlers recurse into their children.
    async fn prepare(&mut self, parent: Option<&str>, _ctx: &FlowContext, _errors: &mut SetupErrors) {
        self.base_mut().attach(parent);
    }

    async fn set_up(&mut self, _ctx: &FlowContext) -> Result<(), SetupErrors> {
        Ok(())
    }

    fn input(&mut self, token: Token) {
        self.base_mut().set_input(token);
    }

    async fn execute(&mut self, ctx: &FlowContext) -> Result<(), ExecutionError>;

    fn has_output(&self) -> bool {
        self.base().has_output()
    }

    fn output(&mut self) -> Option<Token> {
        self.base_mut().pop_output()
    }

    /// Whether a source has nothing more to produce.
    fn is_finished(&self) -> bool {
        true
    }

    /// Called before the next `execute` when a variable referenced by this
    /// actor's options changed.
    async fn refresh(&mut self, _ctx: &FlowContext) -> Result<(), ExecutionError> {
        Ok(())
    }

    async fn wrap_up(&mut self, _ctx: &FlowContext) {}

    async fn clean_up(&mut self) {}

    /// Appends an indented description of this actor (and its children) to `out`.
    async fn describe(&self, depth: usize, out: &mut String) {
        describe_line(self.base(), self.role(), self.quick_info(), depth, out);
    }
}

/// One line of [`Actor::describe`] output.
pub fn describe_line(
    base: &ActorBase,
    role: ActorRole,
    quick_info: Option<String>,
    depth: usize,
    out: &mut String,
) {
    let _ = write!(out, "{}{} [{}]", "  ".repeat(depth), base.name(), role);
    if base.skip {
        out.push_str(" (skipped)");
    }
    if let Some(info) = quick_info {
        let _ = write!(out, ": {}", info);
    }
    out.push('\n');
}
