// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::engine::{director, pipeline, FlowContext};
use crate::errors::{ExecutionError, SetupErrors};
use crate::token::PayloadType;
use crate::traits::actor::describe_line;
use crate::traits::{Actor, ActorBase, ActorRole, CombinationPolicy};

/// Runs its children as a pipeline.
///
/// The sequence's own role follows from its children: a sequence starting
/// with a source and ending with a sink is self-contained (standalone), one
/// starting with a transformer acts as a transformer, and so on.
pub struct Sequence {
    base: ActorBase,
    children: Vec<Box<dyn Actor>>,
    role: ActorRole,
}

impl Sequence {
    pub fn new(base: ActorBase, children: Vec<Box<dyn Actor>>) -> Self {
        let roles: Vec<ActorRole> = children.iter().map(|c| c.role()).collect();
        Self {
            base,
            role: pipeline::derive_role(&roles),
            children,
        }
    }

    pub fn children(&self) -> &[Box<dyn Actor>] {
        &self.children
    }
}

#[async_trait]
impl Actor for Sequence {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        self.role
    }

    fn policy(&self) -> Option<CombinationPolicy> {
        Some(CombinationPolicy::Sequential)
    }

    fn accepts(&self) -> Vec<PayloadType> {
        pipeline::chain_accepts(&self.children)
    }

    fn generates(&self) -> Vec<PayloadType> {
        pipeline::chain_generates(&self.children)
    }

    fn quick_info(&self) -> Option<String> {
        Some(format!("{} actors", self.children.len()))
    }

    async fn prepare(&mut self, parent: Option<&str>, ctx: &FlowContext, errors: &mut SetupErrors) {
        self.base.attach(parent);
        let path = self.base.full_name().to_string();
        director::prepare_children(&mut self.children, &path, ctx, errors).await;
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), SetupErrors> {
        let mut errors = director::set_up_children(&mut self.children, ctx).await;
        for error in pipeline::check_wiring(&self.children, self.base.full_name()) {
            errors.push(error);
        }
        errors.into_result()
    }

    async fn execute(&mut self, ctx: &FlowContext) -> Result<(), ExecutionError> {
        let input = self.base.take_input();
        let outputs = pipeline::run(&mut self.children, input, ctx).await?;
        for token in outputs {
            self.base.push_output(token);
        }
        Ok(())
    }

    async fn wrap_up(&mut self, ctx: &FlowContext) {
        director::wrap_up_children(&mut self.children, ctx).await;
    }

    async fn clean_up(&mut self) {
        director::clean_up_children(&mut self.children).await;
    }

    async fn describe(&self, depth: usize, out: &mut String) {
        describe_line(&self.base, self.role, self.quick_info(), depth, out);
        director::describe_children(&self.children, depth + 1, out).await;
    }
}
