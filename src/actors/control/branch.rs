// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::config::consts::FLOW_MAX_THREADS;
use crate::engine::{director, FlowContext};
use crate::errors::{ExecutionError, SetupErrors};
use crate::token::{Payload, PayloadType, Token};
use crate::traits::actor::describe_line;
use crate::traits::{share, Actor, ActorBase, ActorRole, CombinationPolicy, SharedActor};

/// Fans each incoming token out to every branch.
///
/// Branches run one after another or concurrently on up to `max_threads`
/// tokio tasks (`-1` uses the flow default, `0` and `1` run sequentially).
/// Each branch sees its own cache-scoped storage. With `collect_output` the
/// branch acts as a join point and emits one array token holding the last
/// output of every branch, in branch order.
pub struct Branch {
    base: ActorBase,
    branches: Vec<SharedActor>,
    roles: Vec<ActorRole>,
    accepts: Vec<PayloadType>,
    collect_output: bool,
}

impl Branch {
    pub fn new(base: ActorBase, branches: Vec<Box<dyn Actor>>) -> Self {
        let roles = branches.iter().map(|b| b.role()).collect();
        let mut accepts: Vec<PayloadType> = Vec::new();
        for branch in &branches {
            for accepted in branch.accepts() {
                if !accepts.contains(&accepted) {
                    accepts.push(accepted);
                }
            }
        }
        let collect_output = base
            .options()
            .flag("collect_output");
        Self {
            base,
            branches: branches.into_iter().map(share).collect(),
            roles,
            accepts,
            collect_output,
        }
    }

    fn takes_input(&self) -> bool {
        self.roles.iter().any(|r| r.takes_input())
    }

    fn thread_count(&self, ctx: &FlowContext) -> Result<usize, ExecutionError> {
        let configured: i64 = self.base.option_or("max_threads", ctx.variables(), 1)?;
        Ok(match configured {
            FLOW_MAX_THREADS => ctx.max_threads(),
            n => usize::try_from(n).unwrap_or(1).max(1),
        })
    }

    /// Branches that do not take input run as self-contained sub-flows.
    fn input_for(&self, index: usize, input: &Option<Token>) -> Option<Token> {
        if self.roles[index].takes_input() {
            input.clone()
        } else {
            None
        }
    }

    fn scope_of(&self, index: usize) -> String {
        format!("{}#{}", self.base.full_name(), index)
    }
}

async fn run_branch(
    branch: SharedActor,
    input: Option<Token>,
    ctx: FlowContext,
) -> Result<Vec<Token>, ExecutionError> {
    let mut actor = branch.lock().await;
    let result = director::process(actor.as_mut(), input, &ctx).await;
    let outputs = director::drain_output(actor.as_mut());
    ctx.storage().clear_scope(&ctx.cache_scope());
    result.map(|_| outputs)
}

#[async_trait]
impl Actor for Branch {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        match (self.takes_input(), self.collect_output) {
            (true, true) => ActorRole::Transformer,
            (true, false) => ActorRole::Sink,
            (false, true) => ActorRole::Source,
            (false, false) => ActorRole::Standalone,
        }
    }

    fn policy(&self) -> Option<CombinationPolicy> {
        Some(CombinationPolicy::ParallelBranch)
    }

    fn accepts(&self) -> Vec<PayloadType> {
        if self.takes_input() {
            self.accepts.clone()
        } else {
            Vec::new()
        }
    }

    fn generates(&self) -> Vec<PayloadType> {
        if self.collect_output {
            vec![PayloadType::Array]
        } else {
            Vec::new()
        }
    }

    fn quick_info(&self) -> Option<String> {
        let threads = self
            .base
            .options()
            .raw_text("max_threads")
            .unwrap_or_else(|| "1".to_string());
        Some(format!(
            "{} branches, threads: {}{}",
            self.branches.len(),
            threads,
            if self.collect_output { ", collect" } else { "" }
        ))
    }

    async fn prepare(&mut self, parent: Option<&str>, ctx: &FlowContext, errors: &mut SetupErrors) {
        self.base.attach(parent);
        let path = self.base.full_name().to_string();
        director::prepare_shared(&self.branches, &path, ctx, errors).await;
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), SetupErrors> {
        let mut errors = director::set_up_shared(&self.branches, ctx).await;
        if self.branches.is_empty() {
            errors.push(self.base.setup_error("no branches defined"));
        }
        let threads = self
            .base
            .check_option::<i64>("max_threads", ctx.variables(), false, &mut errors);
        if threads.is_some_and(|n| n < FLOW_MAX_THREADS) {
            errors.push(self.base.setup_error("max_threads must be -1 or greater"));
        }
        errors.into_result()
    }

    async fn execute(&mut self, ctx: &FlowContext) -> Result<(), ExecutionError> {
        let input = self.base.take_input();
        let threads = self.thread_count(ctx)?;

        let results: Vec<Result<Vec<Token>, ExecutionError>> = if threads <= 1 {
            let mut results = Vec::with_capacity(self.branches.len());
            for (index, branch) in self.branches.iter().enumerate() {
                if ctx.is_stopped() {
                    break;
                }
                let scoped = ctx.with_cache_scope(self.scope_of(index));
                let input = self.input_for(index, &input);
                results.push(run_branch(branch.clone(), input, scoped).await);
            }
            results
        } else {
            let semaphore = Arc::new(Semaphore::new(threads));
            let handles: Vec<_> = self
                .branches
                .iter()
                .enumerate()
                .map(|(index, branch)| {
                    let branch = branch.clone();
                    let input = self.input_for(index, &input);
                    let scoped = ctx.with_cache_scope(self.scope_of(index));
                    let semaphore = semaphore.clone();
                    tokio::spawn(async move {
                        let _permit = semaphore
                            .acquire_owned()
                            .await
                            .map_err(|e| ExecutionError::internal(e.to_string()))?;
                        run_branch(branch, input, scoped).await
                    })
                })
                .collect();
            join_all(handles)
                .await
                .into_iter()
                .enumerate()
                .map(|(index, joined)| {
                    joined.unwrap_or_else(|e| {
                        Err(ExecutionError::internal(format!(
                            "branch #{} of '{}' panicked: {}",
                            index + 1,
                            self.base.full_name(),
                            e
                        )))
                    })
                })
                .collect()
        };

        let mut collected = Vec::with_capacity(results.len());
        let mut first_error = None;
        for result in results {
            match result {
                Ok(tokens) => collected.push(
                    tokens
                        .last()
                        .map(|t| t.payload().clone())
                        .unwrap_or(Payload::Null),
                ),
                Err(error) => {
                    first_error.get_or_insert(error);
                }
            }
        }
        if let Some(error) = first_error {
            return Err(error);
        }

        if self.collect_output && !ctx.is_stopped() {
            let joined = match &input {
                Some(token) => token.derive(Payload::Array(collected), self.base.full_name()),
                None => Token::new(Payload::Array(collected), self.base.full_name()),
            };
            self.base.push_output(joined);
        }
        Ok(())
    }

    async fn wrap_up(&mut self, ctx: &FlowContext) {
        director::wrap_up_shared(&self.branches, ctx).await;
    }

    async fn clean_up(&mut self) {
        director::clean_up_shared(&self.branches).await;
    }

    async fn describe(&self, depth: usize, out: &mut String) {
        describe_line(&self.base, self.role(), self.quick_info(), depth, out);
        director::describe_shared(&self.branches, depth + 1, out).await;
    }
}
