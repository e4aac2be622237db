// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::engine::{director, pipeline, FlowContext};
use crate::errors::{ExecutionError, SetupErrors};
use crate::traits::actor::describe_line;
use crate::traits::{Actor, ActorBase, ActorRole, CombinationPolicy};

/// Runs a self-contained sub-flow each time a token passes through, then
/// forwards the token unchanged.
pub struct Trigger {
    base: ActorBase,
    body: Vec<Box<dyn Actor>>,
}

impl Trigger {
    pub fn new(base: ActorBase, body: Vec<Box<dyn Actor>>) -> Self {
        Self { base, body }
    }
}

#[async_trait]
impl Actor for Trigger {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        ActorRole::Transformer
    }

    fn policy(&self) -> Option<CombinationPolicy> {
        Some(CombinationPolicy::Sequential)
    }

    fn quick_info(&self) -> Option<String> {
        Some(format!("{} actors per token", self.body.len()))
    }

    async fn prepare(&mut self, parent: Option<&str>, ctx: &FlowContext, errors: &mut SetupErrors) {
        self.base.attach(parent);
        let path = self.base.full_name().to_string();
        director::prepare_children(&mut self.body, &path, ctx, errors).await;
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), SetupErrors> {
        let mut errors = director::set_up_children(&mut self.body, ctx).await;
        for error in pipeline::check_wiring(&self.body, self.base.full_name()) {
            errors.push(error);
        }
        let roles: Vec<ActorRole> = self.body.iter().map(|c| c.role()).collect();
        if pipeline::derive_role(&roles) != ActorRole::Standalone {
            errors.push(self.base.setup_error("the triggered sub-flow must be self-contained"));
        }
        errors.into_result()
    }

    async fn execute(&mut self, ctx: &FlowContext) -> Result<(), ExecutionError> {
        let token = self.base.require_input()?;
        pipeline::run(&mut self.body, None, ctx).await?;
        self.base.push_output(token);
        Ok(())
    }

    async fn wrap_up(&mut self, ctx: &FlowContext) {
        director::wrap_up_children(&mut self.body, ctx).await;
    }

    async fn clean_up(&mut self) {
        director::clean_up_children(&mut self.body).await;
    }

    async fn describe(&self, depth: usize, out: &mut String) {
        describe_line(&self.base, self.role(), self.quick_info(), depth, out);
        director::describe_children(&self.body, depth + 1, out).await;
    }
}
