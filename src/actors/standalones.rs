// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::engine::FlowContext;
use crate::errors::{ExecutionError, SetupErrors};
use crate::traits::{Actor, ActorBase, ActorRole};

/// Standalone form of [`crate::actors::transformers::SetVariable`]: sets `variable` to `value`.
pub struct SetVariableStandalone {
    base: ActorBase,
}

impl SetVariableStandalone {
    pub fn new(base: ActorBase) -> Self {
        Self { base }
    }
}

#[async_trait]
impl Actor for SetVariableStandalone {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        ActorRole::Standalone
    }

    fn quick_info(&self) -> Option<String> {
        let options = self.base.options();
        match (options.raw_text("variable"), options.raw_text("value")) {
            (Some(name), Some(value)) => Some(format!("${{{}}} = {}", name, value)),
            _ => None,
        }
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), SetupErrors> {
        let mut errors = SetupErrors::new();
        let vars = ctx.variables();
        self.base
            .check_option::<String>("variable", vars, true, &mut errors);
        self.base.check_option::<String>("value", vars, true, &mut errors);
        errors.into_result()
    }

    async fn execute(&mut self, ctx: &FlowContext) -> Result<(), ExecutionError> {
        let vars = ctx.variables();
        let name: String = self
            .base
            .option("variable", vars)?
            .ok_or_else(|| self.base.fail("option 'variable' is not set"))?;
        let value = self
            .base
            .options()
            .text("value", vars)
            .ok_or_else(|| self.base.fail("option 'value' is not set"))?;
        vars.set(name, value);
        Ok(())
    }
}

/// Requests a cooperative stop of the flow. The flow finishes the steps
/// already in flight and ends in the stopped state with `message` as reason.
pub struct StopFlow {
    base: ActorBase,
}

impl StopFlow {
    pub fn new(base: ActorBase) -> Self {
        Self { base }
    }
}

#[async_trait]
impl Actor for StopFlow {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        ActorRole::Standalone
    }

    fn quick_info(&self) -> Option<String> {
        self.base.options().raw_text("message")
    }

    async fn execute(&mut self, ctx: &FlowContext) -> Result<(), ExecutionError> {
        let message = self
            .base
            .options()
            .text("message", ctx.variables())
            .unwrap_or_else(|| format!("stopped by '{}'", self.base.full_name()));
        ctx.stop(message);
        Ok(())
    }
}
