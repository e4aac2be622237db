// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::str::FromStr;

use async_trait::async_trait;

use crate::actors::conditions::ConditionConfig;
use crate::engine::{director, pipeline, FlowContext};
use crate::config::consts::DEFAULT_MAX_ITERATIONS;
use crate::errors::{ExecutionError, SetupErrors};
use crate::observability::messages::actor::LoopLimitReached;
use crate::observability::messages::StructuredLog;
use crate::scope::StorageScope;
use crate::token::{Payload, PayloadType, Token};
use crate::traits::actor::describe_line;
use crate::traits::{Actor, ActorBase, ActorRole, CombinationPolicy, Condition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// Runs the body `count` times
    Count,
    /// Runs the body until `condition` holds, at most `max_iterations` times
    Until,
    /// Runs the body once per element of an incoming array token
    ForEach,
}

impl FromStr for LoopMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "count" => Ok(LoopMode::Count),
            "until" => Ok(LoopMode::Until),
            "for_each" => Ok(LoopMode::ForEach),
            other => Err(format!(
                "unknown loop mode '{}', expected count, until or for_each",
                other
            )),
        }
    }
}

/// Re-executes its body, a pipeline of children.
///
/// The current iteration (starting at 1) is published in the variable named
/// by `iteration_variable`. Cache-scoped storage written by the body is
/// cleared when the loop exits unless `persistent` is set.
pub struct Loop {
    base: ActorBase,
    body: Vec<Box<dyn Actor>>,
    mode: Result<LoopMode, String>,
    condition: Option<Result<Box<dyn Condition>, String>>,
    iterations: u64,
}

impl Loop {
    pub fn new(base: ActorBase, body: Vec<Box<dyn Actor>>) -> Self {
        let mode = base
            .options()
            .raw_text("mode")
            .map_or(Ok(LoopMode::Count), |mode| mode.parse::<LoopMode>());
        let condition = base
            .options()
            .raw("condition")
            .map(|raw| ConditionConfig::from_value(raw).and_then(|c| c.build()));
        Self {
            base,
            body,
            mode,
            condition,
            iterations: 0,
        }
    }

    fn mode(&self) -> LoopMode {
        self.mode.as_ref().copied().unwrap_or(LoopMode::Count)
    }

    fn body_role(&self) -> ActorRole {
        let roles: Vec<ActorRole> = self.body.iter().map(|c| c.role()).collect();
        pipeline::derive_role(&roles)
    }

    fn scope(&self) -> StorageScope {
        StorageScope::Cache(self.base.full_name().to_string())
    }

    /// Iterations completed by the last execution.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    async fn iterate(
        &mut self,
        iteration: u64,
        input: Option<Token>,
        ctx: &FlowContext,
    ) -> Result<(), ExecutionError> {
        if let Some(variable) = self.base.options().text("iteration_variable", ctx.variables()) {
            ctx.variables().set(variable, iteration.to_string());
        }
        let scoped = ctx.with_cache_scope(self.base.full_name());
        let outputs = pipeline::run(&mut self.body, input, &scoped).await?;
        for token in outputs {
            self.base.push_output(token);
        }
        self.iterations = iteration;
        Ok(())
    }

    async fn run(&mut self, input: Option<Token>, ctx: &FlowContext) -> Result<(), ExecutionError> {
        let max_iterations =
            self.base
                .option_or("max_iterations", ctx.variables(), DEFAULT_MAX_ITERATIONS)?;
        match self.mode() {
            LoopMode::Count => {
                let count: u64 = self
                    .base
                    .option("count", ctx.variables())?
                    .ok_or_else(|| self.base.fail("option 'count' is not set"))?;
                for iteration in 1..=count {
                    if ctx.is_stopped() {
                        break;
                    }
                    self.iterate(iteration, input.clone(), ctx).await?;
                }
            }
            LoopMode::Until => {
                let mut iteration = 0;
                loop {
                    if ctx.is_stopped() {
                        break;
                    }
                    let done = match &self.condition {
                        Some(Ok(condition)) => condition.evaluate(input.as_ref(), ctx)?,
                        _ => return Err(self.base.fail("no valid condition")),
                    };
                    if done {
                        break;
                    }
                    if iteration == max_iterations {
                        LoopLimitReached {
                            path: self.base.full_name(),
                            limit: max_iterations,
                        }
                        .log();
                        break;
                    }
                    iteration += 1;
                    self.iterate(iteration, input.clone(), ctx).await?;
                }
            }
            LoopMode::ForEach => {
                let token = input.ok_or_else(|| self.base.fail("mode 'for_each' requires an input token"))?;
                let Payload::Array(items) = token.payload() else {
                    return Err(ExecutionError::TypeMismatch {
                        path: self.base.full_name().to_string(),
                        expected: PayloadType::Array.to_string(),
                        actual: token.payload_type().to_string(),
                    });
                };
                for (index, item) in items.iter().enumerate() {
                    if ctx.is_stopped() {
                        break;
                    }
                    let element = token.derive(item.clone(), self.base.full_name());
                    self.iterate(index as u64 + 1, Some(element), ctx).await?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Actor for Loop {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        let body = self.body_role();
        if self.mode() == LoopMode::ForEach {
            if body.produces_output() {
                ActorRole::Transformer
            } else {
                ActorRole::Sink
            }
        } else {
            body
        }
    }

    fn policy(&self) -> Option<CombinationPolicy> {
        Some(CombinationPolicy::Looping)
    }

    fn accepts(&self) -> Vec<PayloadType> {
        match self.mode() {
            LoopMode::ForEach => vec![PayloadType::Array],
            _ => pipeline::chain_accepts(&self.body),
        }
    }

    fn generates(&self) -> Vec<PayloadType> {
        pipeline::chain_generates(&self.body)
    }

    fn quick_info(&self) -> Option<String> {
        let options = self.base.options();
        let mut info = match self.mode() {
            LoopMode::Count => format!(
                "count: {}",
                options.raw_text("count").unwrap_or_else(|| "?".to_string())
            ),
            LoopMode::Until => match &self.condition {
                Some(Ok(condition)) => format!("until {}", condition.describe()),
                _ => "until ?".to_string(),
            },
            LoopMode::ForEach => "for each element".to_string(),
        };
        if let Some(variable) = options.raw_text("iteration_variable") {
            info.push_str(&format!(", iteration -> {}", variable));
        }
        if options.flag("persistent") {
            info.push_str(", persistent");
        }
        Some(info)
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
        let vars = ctx.variables();
        match &self.mode {
            Err(message) => errors.push(self.base.setup_error(message.clone())),
            Ok(LoopMode::Count) => {
                self.base.check_option::<u64>("count", vars, true, &mut errors);
            }
            Ok(LoopMode::Until) => match &self.condition {
                None => errors.push(self.base.setup_error("mode 'until' requires a condition")),
                Some(Err(message)) => errors.push(self.base.setup_error(message.clone())),
                Some(Ok(_)) => {}
            },
            Ok(LoopMode::ForEach) => {
                let body = self.body_role();
                if !self.body.is_empty() && !body.takes_input() {
                    errors.push(
                        self.base
                            .setup_error("mode 'for_each' requires a body that takes input"),
                    );
                }
            }
        }
        if let Some(max) = self.base.check_option::<u64>("max_iterations", vars, false, &mut errors) {
            if max == 0 {
                errors.push(self.base.setup_error("max_iterations must be at least 1"));
            }
        }
        self.base.check_option::<bool>("persistent", vars, false, &mut errors);
        self.iterations = 0;
        errors.into_result()
    }

    async fn execute(&mut self, ctx: &FlowContext) -> Result<(), ExecutionError> {
        let input = self.base.take_input();
        self.iterations = 0;
        let result = self.run(input, ctx).await;
        let persistent = self.base.option_or("persistent", ctx.variables(), false)?;
        if !persistent {
            ctx.storage().clear_scope(&self.scope());
        }
        result
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
