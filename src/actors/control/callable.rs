// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::engine::{director, FlowContext};
use crate::errors::{ExecutionError, SetupError, SetupErrors};
use crate::observability::messages::actor::OptionalCallableMissing;
use crate::observability::messages::StructuredLog;
use crate::scope::{ActorRef, Variables};
use crate::token::PayloadType;
use crate::traits::actor::describe_line;
use crate::traits::{share, Actor, ActorBase, ActorRole, SharedActor};

/// Container for actors that are invoked by name from elsewhere in the flow.
///
/// The container never executes its children itself. It owns them and
/// registers each under its own name during preparation.
pub struct CallableActors {
    base: ActorBase,
    children: Vec<SharedActor>,
}

impl CallableActors {
    pub fn new(base: ActorBase, children: Vec<Box<dyn Actor>>) -> Self {
        Self {
            base,
            children: children.into_iter().map(share).collect(),
        }
    }
}

#[async_trait]
impl Actor for CallableActors {
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
        Some(format!("{} callable actors", self.children.len()))
    }

    async fn prepare(&mut self, parent: Option<&str>, ctx: &FlowContext, errors: &mut SetupErrors) {
        self.base.attach(parent);
        let path = self.base.full_name().to_string();
        director::prepare_shared(&self.children, &path, ctx, errors).await;
        for child in &self.children {
            let (name, full_name) = {
                let actor = child.lock().await;
                (actor.name().to_string(), actor.full_name().to_string())
            };
            if let Err(source) = ctx.callables().register(&name, child) {
                errors.push(SetupError::DuplicateName {
                    path: full_name,
                    source,
                });
            }
        }
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), SetupErrors> {
        let mut errors = SetupErrors::new();
        for child in &self.children {
            let mut child = child.lock().await;
            let within = ctx.within_callable(child.name());
            errors.absorb(director::set_up(child.as_mut(), &within).await);
        }
        errors.into_result()
    }

    async fn execute(&mut self, _ctx: &FlowContext) -> Result<(), ExecutionError> {
        Ok(())
    }

    async fn wrap_up(&mut self, ctx: &FlowContext) {
        director::wrap_up_shared(&self.children, ctx).await;
    }

    async fn clean_up(&mut self) {
        director::clean_up_shared(&self.children).await;
    }

    async fn describe(&self, depth: usize, out: &mut String) {
        describe_line(&self.base, self.role(), self.quick_info(), depth, out);
        director::describe_shared(&self.children, depth + 1, out).await;
    }
}

/// Invokes a callable actor registered under the `callable` option.
///
/// The reference plays the same role as its target: a callable source pulls
/// tokens from it, a callable transformer or sink pushes tokens into it.
/// With `optional: true` a missing target is logged once during setup and
/// the reference becomes a no-op (transformers then forward tokens as is).
pub struct CallableRef {
    base: ActorBase,
    role: ActorRole,
    target: Option<ActorRef>,
    accepts: Vec<PayloadType>,
    generates: Vec<PayloadType>,
    finished: bool,
}

impl CallableRef {
    pub fn new(base: ActorBase, role: ActorRole) -> Self {
        Self {
            base,
            role,
            target: None,
            accepts: Vec::new(),
            generates: Vec::new(),
            finished: true,
        }
    }

    pub fn source(base: ActorBase) -> Self {
        Self::new(base, ActorRole::Source)
    }

    pub fn transformer(base: ActorBase) -> Self {
        Self::new(base, ActorRole::Transformer)
    }

    pub fn sink(base: ActorBase) -> Self {
        Self::new(base, ActorRole::Sink)
    }

    fn callable_name(&self, vars: &Variables) -> Option<String> {
        self.base.options().text("callable", vars)
    }
}

#[async_trait]
impl Actor for CallableRef {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        self.role
    }

    fn accepts(&self) -> Vec<PayloadType> {
        if !self.role.takes_input() {
            Vec::new()
        } else if self.target.is_some() {
            self.accepts.clone()
        } else {
            vec![PayloadType::Unknown]
        }
    }

    fn generates(&self) -> Vec<PayloadType> {
        if !self.role.produces_output() {
            Vec::new()
        } else if self.target.is_some() {
            self.generates.clone()
        } else {
            vec![PayloadType::Unknown]
        }
    }

    fn quick_info(&self) -> Option<String> {
        let name = self
            .base
            .options()
            .raw_text("callable")
            .unwrap_or_else(|| "?".to_string());
        Some(if self.base.options().flag("optional") {
            format!("-> {} (optional)", name)
        } else {
            format!("-> {}", name)
        })
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), SetupErrors> {
        let mut errors = SetupErrors::new();
        self.target = None;
        self.finished = true;

        let optional = self
            .base
            .check_option::<bool>("optional", ctx.variables(), false, &mut errors)
            .unwrap_or(false);
        let Some(name) = self.callable_name(ctx.variables()) else {
            errors.push(SetupError::MissingOption {
                path: self.base.full_name().to_string(),
                option: "callable".to_string(),
            });
            return errors.into_result();
        };

        let target = match ctx.callables().resolve(&name) {
            Ok(target) => target,
            Err(_) if optional => {
                OptionalCallableMissing {
                    path: self.base.full_name(),
                    callable: &name,
                }
                .log();
                return errors.into_result();
            }
            Err(source) => {
                errors.push(SetupError::UnresolvedReference {
                    path: self.base.full_name().to_string(),
                    source,
                });
                return errors.into_result();
            }
        };

        if let Some(caller) = ctx.enclosing_callable() {
            if let Err(cycle) = ctx.callables().link(caller, &name) {
                errors.push(SetupError::IncompatibleWiring {
                    path: self.base.full_name().to_string(),
                    message: format!(
                        "callable '{}' would call itself: {}",
                        name,
                        cycle.join(" -> ")
                    ),
                });
                return errors.into_result();
            }
        }

        if let Some(actor) = target.upgrade() {
            // Only an enclosing actor holds a lock during setup.
            let Ok(actor) = actor.try_lock() else {
                errors.push(SetupError::IncompatibleWiring {
                    path: self.base.full_name().to_string(),
                    message: format!("callable '{}' contains this reference", name),
                });
                return errors.into_result();
            };
            if actor.role() != self.role {
                errors.push(SetupError::IncompatibleWiring {
                    path: self.base.full_name().to_string(),
                    message: format!(
                        "callable '{}' is a {}, expected a {}",
                        name,
                        actor.role(),
                        self.role
                    ),
                });
            }
            self.accepts = actor.accepts();
            self.generates = actor.generates();
        }
        self.target = Some(target);
        errors.into_result()
    }

    async fn execute(&mut self, ctx: &FlowContext) -> Result<(), ExecutionError> {
        let input = self.base.take_input();
        let Some(target) = self.target.as_ref().and_then(|t| t.upgrade()) else {
            if let Some(token) = input {
                if self.role == ActorRole::Transformer {
                    self.base.push_output(token);
                }
            }
            self.finished = true;
            return Ok(());
        };

        let mut actor = target.lock().await;
        director::process(actor.as_mut(), input, ctx).await?;
        for token in director::drain_output(actor.as_mut()) {
            self.base.push_output(token);
        }
        self.finished = actor.is_finished();
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    async fn wrap_up(&mut self, _ctx: &FlowContext) {
        self.target = None;
    }

    async fn describe(&self, depth: usize, out: &mut String) {
        describe_line(&self.base, self.role(), self.quick_info(), depth, out);
    }
}
