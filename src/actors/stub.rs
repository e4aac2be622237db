// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Actors for exercising failure, stop and resource paths in tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::actors::sinks::Collected;
use crate::engine::FlowContext;
use crate::errors::{ExecutionError, SetupErrors};
use crate::traits::{Actor, ActorBase, ActorRole};

/// A sink that fails on one integer value and records all others.
pub struct FailingSink {
    base: ActorBase,
    fail_on: i64,
    seen: Collected,
}

impl FailingSink {
    pub fn new(base: ActorBase, fail_on: i64) -> Self {
        Self {
            base,
            fail_on,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn handle(&self) -> Collected {
        self.seen.clone()
    }
}

#[async_trait]
impl Actor for FailingSink {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        ActorRole::Sink
    }

    async fn execute(&mut self, _ctx: &FlowContext) -> Result<(), ExecutionError> {
        let token = self.base.require_input()?;
        if token.payload().as_i64() == Some(self.fail_on) {
            return Err(self.base.fail(format!("refusing {}", self.fail_on)));
        }
        self.seen.lock().push(token);
        Ok(())
    }
}

/// A sink that records tokens and requests a stop once it sees `at`.
pub struct StopAt {
    base: ActorBase,
    at: i64,
    seen: Collected,
}

impl StopAt {
    pub fn new(base: ActorBase, at: i64) -> Self {
        Self {
            base,
            at,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn handle(&self) -> Collected {
        self.seen.clone()
    }
}

#[async_trait]
impl Actor for StopAt {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        ActorRole::Sink
    }

    async fn execute(&mut self, ctx: &FlowContext) -> Result<(), ExecutionError> {
        let token = self.base.require_input()?;
        let stop = token.payload().as_i64() == Some(self.at);
        self.seen.lock().push(token);
        if stop {
            ctx.stop(format!("reached {}", self.at));
        }
        Ok(())
    }
}

/// A standalone actor that holds one unit of `open` between set-up and
/// clean-up.
pub struct TrackedResource {
    base: ActorBase,
    open: Arc<AtomicUsize>,
    held: bool,
}

impl TrackedResource {
    pub fn new(base: ActorBase, open: Arc<AtomicUsize>) -> Self {
        Self {
            base,
            open,
            held: false,
        }
    }
}

#[async_trait]
impl Actor for TrackedResource {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        ActorRole::Standalone
    }

    async fn set_up(&mut self, _ctx: &FlowContext) -> Result<(), SetupErrors> {
        if !self.held {
            self.open.fetch_add(1, Ordering::SeqCst);
            self.held = true;
        }
        Ok(())
    }

    async fn execute(&mut self, _ctx: &FlowContext) -> Result<(), ExecutionError> {
        Ok(())
    }

    async fn clean_up(&mut self) {
        if self.held {
            self.open.fetch_sub(1, Ordering::SeqCst);
            self.held = false;
        }
    }
}
