// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::{director, pipeline, FlowContext};
use crate::errors::{ExecutionError, SetupErrors};
use crate::scope::{Storage, StorageScope, Variables};
use crate::traits::actor::describe_line;
use crate::traits::{Actor, ActorBase, ActorRole, CombinationPolicy};

/// How a local scope starts out relative to the enclosing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeHandling {
    /// Nothing from outside is visible
    #[default]
    Empty,
    /// Starts with a private copy of the outer entries
    Copy,
    /// No separate scope at all
    Share,
}

impl FromStr for ScopeHandling {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "empty" => Ok(ScopeHandling::Empty),
            "copy" => Ok(ScopeHandling::Copy),
            "share" => Ok(ScopeHandling::Share),
            other => Err(format!(
                "unknown scope handling '{}', expected empty, copy or share",
                other
            )),
        }
    }
}

/// A [`crate::actors::control::Trigger`] whose sub-flow gets its own
/// variables and storage.
///
/// `scope_handling_variables` and `scope_handling_storage` decide how each
/// scope starts (default `empty`). After every run the variables named in
/// `propagate_variables` and the flow-scope storage keys named in
/// `propagate_storage` are copied to the enclosing scope. The local scope
/// lives from setup to clean-up, so it persists across tokens.
pub struct LocalScopeTrigger {
    base: ActorBase,
    body: Vec<Box<dyn Actor>>,
    variables: Option<Arc<Variables>>,
    storage: Option<Arc<Storage>>,
    propagate_variables: Vec<String>,
    propagate_storage: Vec<String>,
}

impl LocalScopeTrigger {
    pub fn new(base: ActorBase, body: Vec<Box<dyn Actor>>) -> Self {
        Self {
            base,
            body,
            variables: None,
            storage: None,
            propagate_variables: Vec::new(),
            propagate_storage: Vec::new(),
        }
    }

    fn local(&self, ctx: &FlowContext) -> FlowContext {
        let mut view = ctx.clone();
        if let Some(variables) = &self.variables {
            view = view.with_variables(variables.clone());
        }
        if let Some(storage) = &self.storage {
            view = view.with_storage(storage.clone());
        }
        view
    }

    fn names(&self, key: &str, ctx: &FlowContext, errors: &mut SetupErrors) -> Vec<String> {
        match self.base.options().list(key, ctx.variables()) {
            Ok(names) => names.unwrap_or_default(),
            Err(message) => {
                errors.push(self.base.setup_error(format!("option '{}': {}", key, message)));
                Vec::new()
            }
        }
    }

    fn propagate(&self, outer: &FlowContext) {
        if let Some(variables) = &self.variables {
            for name in &self.propagate_variables {
                if let Some(value) = variables.get(name) {
                    outer.variables().set(name.as_str(), value);
                }
            }
        }
        if let Some(storage) = &self.storage {
            for key in &self.propagate_storage {
                if let Some(value) = storage.get(&StorageScope::Flow, key) {
                    outer.storage().put(StorageScope::Flow, key.as_str(), value);
                }
            }
        }
    }
}

#[async_trait]
impl Actor for LocalScopeTrigger {
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
        let options = self.base.options();
        let handling = |key: &str| options.raw_text(key).unwrap_or_else(|| "empty".to_string());
        Some(format!(
            "variables: {}, storage: {}",
            handling("scope_handling_variables"),
            handling("scope_handling_storage")
        ))
    }

    async fn prepare(&mut self, parent: Option<&str>, ctx: &FlowContext, errors: &mut SetupErrors) {
        self.base.attach(parent);
        let path = self.base.full_name().to_string();
        director::prepare_children(&mut self.body, &path, ctx, errors).await;
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), SetupErrors> {
        let mut errors = SetupErrors::new();
        let vars = ctx.variables();
        let variable_handling = self
            .base
            .check_option::<ScopeHandling>("scope_handling_variables", vars, false, &mut errors)
            .unwrap_or_default();
        let storage_handling = self
            .base
            .check_option::<ScopeHandling>("scope_handling_storage", vars, false, &mut errors)
            .unwrap_or_default();
        self.propagate_variables = self.names("propagate_variables", ctx, &mut errors);
        self.propagate_storage = self.names("propagate_storage", ctx, &mut errors);

        self.variables = match variable_handling {
            ScopeHandling::Empty => Some(Arc::new(Variables::new())),
            ScopeHandling::Copy => Some(Arc::new(vars.fork())),
            ScopeHandling::Share => None,
        };
        self.storage = match storage_handling {
            ScopeHandling::Empty => Some(Arc::new(Storage::new())),
            ScopeHandling::Copy => Some(Arc::new(ctx.storage().fork())),
            ScopeHandling::Share => None,
        };

        let local = self.local(ctx);
        errors.extend(director::set_up_children(&mut self.body, &local).await);
        for error in pipeline::check_wiring(&self.body, self.base.full_name()) {
            errors.push(error);
        }
        let roles: Vec<ActorRole> = self.body.iter().map(|c| c.role()).collect();
        if pipeline::derive_role(&roles) != ActorRole::Standalone {
            errors.push(self.base.setup_error("the scoped sub-flow must be self-contained"));
        }
        errors.into_result()
    }

    async fn execute(&mut self, ctx: &FlowContext) -> Result<(), ExecutionError> {
        let token = self.base.require_input()?;
        let local = self.local(ctx);
        let result = pipeline::run(&mut self.body, None, &local).await;
        self.propagate(ctx);
        result?;
        self.base.push_output(token);
        Ok(())
    }

    async fn wrap_up(&mut self, ctx: &FlowContext) {
        let local = self.local(ctx);
        director::wrap_up_children(&mut self.body, &local).await;
    }

    async fn clean_up(&mut self) {
        director::clean_up_children(&mut self.body).await;
        self.variables = None;
        self.storage = None;
    }

    async fn describe(&self, depth: usize, out: &mut String) {
        describe_line(&self.base, self.role(), self.quick_info(), depth, out);
        director::describe_children(&self.body, depth + 1, out).await;
    }
}
