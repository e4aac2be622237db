// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Lifecycle steps the engine and every handler use to drive child actors.
//!
//! Handlers never call `Actor::execute`, `Actor::set_up`, `Actor::wrap_up` or
//! `Actor::clean_up` directly. They go through these functions, which add the
//! behavior every actor shares:
//!
//! * stop and pause checks at each step boundary
//! * `skip` pass-through
//! * runtime payload type checks
//! * refresh after variable changes
//! * non-fatal error handling and the flow error log
//! * exactly-once wrap-up and clean-up

use std::collections::HashSet;
use std::sync::atomic::Ordering;

use crate::engine::context::{ErrorLogEntry, FlowContext};
use crate::errors::{ExecutionError, FailureStrategy, SetupError, SetupErrors};
use crate::observability::messages::actor::{ActorFailed, ActorRefreshed, NonFatalError};
use crate::observability::messages::StructuredLog;
use crate::token::{PayloadType, Token};
use crate::traits::{Actor, ActorState, SharedActor};

/// Sets up one actor and subscribes it to changes of the variables its
/// options reference.
pub async fn set_up(actor: &mut dyn Actor, ctx: &FlowContext) -> Result<(), SetupErrors> {
    actor.base_mut().reset_lifecycle();
    let result = actor.set_up(ctx).await;
    match &result {
        Ok(()) => {
            actor.base_mut().set_state(ActorState::Initialized);
            subscribe_to_variables(actor, ctx);
        }
        Err(_) => actor.base_mut().set_state(ActorState::Error),
    }
    result
}

fn subscribe_to_variables(actor: &mut dyn Actor, ctx: &FlowContext) {
    let names: HashSet<String> = actor.base().options().variable_names().into_iter().collect();
    if names.is_empty() {
        return;
    }
    let stale = actor.base().stale_flag();
    let id = ctx.variables().add_listener(move |change| {
        if names.contains(&change.name) {
            stale.store(true, Ordering::Release);
        }
    });
    if let Some(previous) = actor.base_mut().set_listener(Some(id)) {
        ctx.variables().remove_listener(previous);
    }
}

/// Runs one step of `actor`: hands it `input` (if any) and executes it.
///
/// Returns `Ok` when the step succeeded, was skipped, was suppressed by a
/// stop request, or failed on an actor whose errors are non-fatal. Fatal
/// failures are returned with the failing actor's full path.
pub async fn process(
    actor: &mut dyn Actor,
    input: Option<Token>,
    ctx: &FlowContext,
) -> Result<(), ExecutionError> {
    ctx.checkpoint().await;
    if ctx.is_stopped() {
        actor.base_mut().set_state(ActorState::Stopped);
        return Ok(());
    }

    if actor.base().skip {
        if let Some(token) = input {
            if actor.role().produces_output() {
                actor.base_mut().push_output(token);
            }
        }
        return Ok(());
    }

    let summary = input.as_ref().map(Token::summary);
    let result = step(actor, input, ctx).await;

    match result {
        Ok(()) => {
            let state = if ctx.is_stopped() {
                ActorState::Stopped
            } else {
                ActorState::Initialized
            };
            actor.base_mut().set_state(state);
            Ok(())
        }
        Err(ExecutionError::Stopped { .. }) => {
            actor.base_mut().set_state(ActorState::Stopped);
            Ok(())
        }
        Err(error) if tolerates_errors(actor, ctx) => {
            actor.base_mut().take_input();
            actor.base_mut().set_state(ActorState::Initialized);
            let path = error.path().unwrap_or(actor.full_name()).to_string();
            NonFatalError {
                path: &path,
                error: &error,
                token: summary.as_deref(),
            }
            .log();
            ctx.record_error(ErrorLogEntry {
                actor: path,
                message: error.to_string(),
                token: summary,
            });
            Ok(())
        }
        Err(error) => {
            actor.base_mut().set_state(ActorState::Error);
            if error.path() == Some(actor.full_name()) {
                ActorFailed {
                    path: actor.full_name(),
                    error: &error,
                }
                .log();
            }
            Err(error)
        }
    }
}

async fn step(
    actor: &mut dyn Actor,
    input: Option<Token>,
    ctx: &FlowContext,
) -> Result<(), ExecutionError> {
    if let Some(token) = input {
        let accepts = actor.accepts();
        if !token.payload_type().is_accepted_by(&accepts) {
            return Err(ExecutionError::TypeMismatch {
                path: actor.full_name().to_string(),
                expected: PayloadType::list(&accepts),
                actual: token.payload_type().to_string(),
            });
        }
        actor.input(token);
    }

    if actor.base().take_stale() {
        ActorRefreshed {
            path: actor.full_name(),
        }
        .log();
        actor.refresh(ctx).await?;
    }

    actor.base_mut().set_state(ActorState::Executing);
    actor.execute(ctx).await
}

/// Whether a failure of `actor` is logged and skipped instead of ending the run.
pub fn tolerates_errors(actor: &dyn Actor, ctx: &FlowContext) -> bool {
    let base = actor.base();
    base.non_fatal
        || (ctx.failure_strategy() == FailureStrategy::ContinueOnError && !base.stop_flow_on_error)
}

/// Removes and returns every queued output token of `actor`.
pub fn drain_output(actor: &mut dyn Actor) -> Vec<Token> {
    let mut tokens = Vec::new();
    while let Some(token) = actor.output() {
        tokens.push(token);
    }
    tokens
}

/// Wraps up `actor` once; later calls are no-ops.
pub async fn wrap_up(actor: &mut dyn Actor, ctx: &FlowContext) {
    if !actor.base_mut().begin_wrap_up() {
        return;
    }
    actor.wrap_up(ctx).await;
    if let Some(listener) = actor.base_mut().set_listener(None) {
        ctx.variables().remove_listener(listener);
    }
    actor.base_mut().clear_tokens();
    let state = match actor.base().state() {
        ActorState::Error => ActorState::Error,
        ActorState::Stopped => ActorState::Stopped,
        _ if ctx.is_stopped() => ActorState::Stopped,
        _ => ActorState::Inactive,
    };
    actor.base_mut().set_state(state);
}

/// Cleans up `actor` once; later calls are no-ops.
pub async fn clean_up(actor: &mut dyn Actor) {
    if !actor.base_mut().begin_clean_up() {
        return;
    }
    actor.clean_up().await;
}

/// Prepares owned children below `parent`, rejecting duplicate sibling names.
pub async fn prepare_children(
    children: &mut [Box<dyn Actor>],
    parent: &str,
    ctx: &FlowContext,
    errors: &mut SetupErrors,
) {
    let mut seen = HashSet::new();
    for child in children.iter_mut() {
        if !seen.insert(child.name().to_string()) {
            errors.push(SetupError::invalid(
                parent,
                format!("actor name '{}' is used more than once", child.name()),
            ));
        }
        child.prepare(Some(parent), ctx, errors).await;
    }
}

/// Shared-child variant of [`prepare_children`].
pub async fn prepare_shared(
    children: &[SharedActor],
    parent: &str,
    ctx: &FlowContext,
    errors: &mut SetupErrors,
) {
    let mut seen = HashSet::new();
    for child in children {
        let mut child = child.lock().await;
        if !seen.insert(child.name().to_string()) {
            errors.push(SetupError::invalid(
                parent,
                format!("actor name '{}' is used more than once", child.name()),
            ));
        }
        child.prepare(Some(parent), ctx, errors).await;
    }
}

/// Sets up every child, collecting all errors.
pub async fn set_up_children(children: &mut [Box<dyn Actor>], ctx: &FlowContext) -> SetupErrors {
    let mut errors = SetupErrors::new();
    for child in children.iter_mut() {
        errors.absorb(set_up(child.as_mut(), ctx).await);
    }
    errors
}

pub async fn set_up_shared(children: &[SharedActor], ctx: &FlowContext) -> SetupErrors {
    let mut errors = SetupErrors::new();
    for child in children {
        let mut child = child.lock().await;
        errors.absorb(set_up(child.as_mut(), ctx).await);
    }
    errors
}

pub async fn wrap_up_children(children: &mut [Box<dyn Actor>], ctx: &FlowContext) {
    for child in children.iter_mut() {
        wrap_up(child.as_mut(), ctx).await;
    }
}

pub async fn wrap_up_shared(children: &[SharedActor], ctx: &FlowContext) {
    for child in children {
        wrap_up(child.lock().await.as_mut(), ctx).await;
    }
}

pub async fn clean_up_children(children: &mut [Box<dyn Actor>]) {
    for child in children.iter_mut() {
        clean_up(child.as_mut()).await;
    }
}

pub async fn clean_up_shared(children: &[SharedActor]) {
    for child in children {
        clean_up(child.lock().await.as_mut()).await;
    }
}

/// Appends the description of every child at `depth`.
pub async fn describe_children(children: &[Box<dyn Actor>], depth: usize, out: &mut String) {
    for child in children {
        child.describe(depth, out).await;
    }
}

pub async fn describe_shared(children: &[SharedActor], depth: usize, out: &mut String) {
    for child in children {
        child.lock().await.describe(depth, out).await;
    }
}
