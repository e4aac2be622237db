// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::engine::{director, FlowContext};
use crate::errors::{ExecutionError, SetupErrors};
use crate::observability::messages::actor::ErrorCaught;
use crate::observability::messages::StructuredLog;
use crate::token::PayloadType;
use crate::traits::actor::describe_line;
use crate::traits::{Actor, ActorBase, ActorRole, CombinationPolicy};

/// Runs its first child (`try`) and, if that fails, its second child
/// (`catch`) with the same input.
///
/// With `error_variable` set, the caught error message is stored in that
/// variable before `catch` runs. Stop requests are never caught.
pub struct TryCatch {
    base: ActorBase,
    children: Vec<Box<dyn Actor>>,
}

impl TryCatch {
    pub fn new(base: ActorBase, children: Vec<Box<dyn Actor>>) -> Self {
        Self { base, children }
    }
}

#[async_trait]
impl Actor for TryCatch {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        self.children
            .first()
            .map(|c| c.role())
            .unwrap_or(ActorRole::Standalone)
    }

    fn policy(&self) -> Option<CombinationPolicy> {
        Some(CombinationPolicy::Conditional)
    }

    fn accepts(&self) -> Vec<PayloadType> {
        self.children.first().map(|c| c.accepts()).unwrap_or_default()
    }

    fn generates(&self) -> Vec<PayloadType> {
        let mut types = Vec::new();
        for child in &self.children {
            for generated in child.generates() {
                if !types.contains(&generated) {
                    types.push(generated);
                }
            }
        }
        types
    }

    async fn prepare(&mut self, parent: Option<&str>, ctx: &FlowContext, errors: &mut SetupErrors) {
        self.base.attach(parent);
        let path = self.base.full_name().to_string();
        director::prepare_children(&mut self.children, &path, ctx, errors).await;
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), SetupErrors> {
        let mut errors = director::set_up_children(&mut self.children, ctx).await;
        match self.children.as_slice() {
            [try_actor, catch_actor] => {
                if try_actor.role() != catch_actor.role() {
                    errors.push(self.base.setup_error(format!(
                        "try ({}) and catch ({}) must play the same role",
                        try_actor.role(),
                        catch_actor.role()
                    )));
                }
            }
            _ => errors.push(self.base.setup_error(format!(
                "expected exactly two children (try and catch), found {}",
                self.children.len()
            ))),
        }
        errors.into_result()
    }

    async fn execute(&mut self, ctx: &FlowContext) -> Result<(), ExecutionError> {
        let input = self.base.take_input();
        let [try_actor, catch_actor] = self.children.as_mut_slice() else {
            return Err(self.base.fail("try/catch is missing its children"));
        };

        let error = match director::process(try_actor.as_mut(), input.clone(), ctx).await {
            Ok(()) => {
                for token in director::drain_output(try_actor.as_mut()) {
                    self.base.push_output(token);
                }
                return Ok(());
            }
            Err(error) => error,
        };
        director::drain_output(try_actor.as_mut());

        ErrorCaught {
            path: self.base.full_name(),
            error: &error,
        }
        .log();
        if let Some(variable) = self.base.options().text("error_variable", ctx.variables()) {
            ctx.variables().set(variable, error.to_string());
        }

        director::process(catch_actor.as_mut(), input, ctx).await?;
        for token in director::drain_output(catch_actor.as_mut()) {
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
        describe_line(&self.base, self.role(), self.quick_info(), depth, out);
        director::describe_children(&self.children, depth + 1, out).await;
    }
}
