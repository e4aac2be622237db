// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Sequential token drive shared by the flow root and sequence-like handlers.
//!
//! Leading standalones run once, in order. The remaining children form a
//! chain. A token leaving stage `i` is pushed through stages `i+1..n` before
//! stage `i` is asked for its next token, so tokens reach the end of the chain
//! in the order the head produced them. A source head is executed until it
//! reports it is finished.

use crate::engine::context::FlowContext;
use crate::engine::director::process;
use crate::errors::{ExecutionError, SetupError};
use crate::token::{PayloadType, Token};
use crate::traits::{Actor, ActorRole};

/// Role of a pipeline made of children with `roles`, in order.
pub fn derive_role(roles: &[ActorRole]) -> ActorRole {
    let chain: Vec<ActorRole> = roles
        .iter()
        .copied()
        .skip_while(|role| *role == ActorRole::Standalone)
        .collect();
    match (chain.first(), chain.last()) {
        (Some(head), Some(tail)) => match (head.takes_input(), tail.produces_output()) {
            (false, false) => ActorRole::Standalone,
            (false, true) => ActorRole::Source,
            (true, true) => ActorRole::Transformer,
            (true, false) => ActorRole::Sink,
        },
        _ => ActorRole::Standalone,
    }
}

/// Static wiring checks for a pipeline owned by `owner`.
pub fn check_wiring(children: &[Box<dyn Actor>], owner: &str) -> Vec<SetupError> {
    let mut errors = Vec::new();
    let start = children
        .iter()
        .position(|c| c.role() != ActorRole::Standalone)
        .unwrap_or(children.len());
    let chain = &children[start..];

    for (index, actor) in chain.iter().enumerate() {
        let role = actor.role();
        if role == ActorRole::Standalone {
            errors.push(SetupError::IncompatibleWiring {
                path: owner.to_string(),
                message: format!(
                    "standalone '{}' must come before the first source or transformer",
                    actor.name()
                ),
            });
            continue;
        }
        if index > 0 && role == ActorRole::Source {
            errors.push(SetupError::IncompatibleWiring {
                path: owner.to_string(),
                message: format!("source '{}' can only start a pipeline", actor.name()),
            });
        }
        if let Some(next) = chain.get(index + 1) {
            if !role.produces_output() {
                errors.push(SetupError::IncompatibleWiring {
                    path: owner.to_string(),
                    message: format!(
                        "'{}' produces no output for '{}'",
                        actor.name(),
                        next.name()
                    ),
                });
            } else if next.role().takes_input()
                && !PayloadType::compatible(&actor.generates(), &next.accepts())
            {
                errors.push(SetupError::IncompatibleWiring {
                    path: owner.to_string(),
                    message: format!(
                        "'{}' generates [{}] but '{}' accepts [{}]",
                        actor.name(),
                        PayloadType::list(&actor.generates()),
                        next.name(),
                        PayloadType::list(&next.accepts())
                    ),
                });
            }
        }
    }
    errors
}

/// Accepted input types of a pipeline: those of its first chain stage.
pub fn chain_accepts(children: &[Box<dyn Actor>]) -> Vec<PayloadType> {
    children
        .iter()
        .find(|c| c.role() != ActorRole::Standalone)
        .map(|head| head.accepts())
        .unwrap_or_default()
}

/// Generated types of a pipeline: those of its last stage.
pub fn chain_generates(children: &[Box<dyn Actor>]) -> Vec<PayloadType> {
    children
        .last()
        .filter(|tail| tail.role().produces_output())
        .map(|tail| tail.generates())
        .unwrap_or_default()
}

/// Drives `children` as a pipeline and returns the tokens leaving the last
/// stage, in order. `input` is handed to the head when it takes input and
/// dropped otherwise.
pub async fn run(
    children: &mut [Box<dyn Actor>],
    input: Option<Token>,
    ctx: &FlowContext,
) -> Result<Vec<Token>, ExecutionError> {
    let mut start = 0;
    while start < children.len() && children[start].role() == ActorRole::Standalone {
        if ctx.is_stopped() {
            return Ok(Vec::new());
        }
        process(children[start].as_mut(), None, ctx).await?;
        start += 1;
    }

    let chain = &mut children[start..];
    let mut outputs = Vec::new();
    if chain.is_empty() {
        return Ok(outputs);
    }

    if chain[0].role().takes_input() {
        if let Some(token) = input {
            process(chain[0].as_mut(), Some(token), ctx).await?;
            drain(chain, &mut outputs, ctx).await?;
        }
        return Ok(outputs);
    }

    loop {
        if ctx.is_stopped() {
            break;
        }
        process(chain[0].as_mut(), None, ctx).await?;
        drain(chain, &mut outputs, ctx).await?;
        if chain[0].base().skip || chain[0].is_finished() {
            break;
        }
    }
    Ok(outputs)
}

async fn drain(
    chain: &mut [Box<dyn Actor>],
    outputs: &mut Vec<Token>,
    ctx: &FlowContext,
) -> Result<(), ExecutionError> {
    let mut pending = vec![0usize];
    while let Some(&stage) = pending.last() {
        if ctx.is_stopped() {
            break;
        }
        match chain[stage].output() {
            None => {
                pending.pop();
            }
            Some(token) => {
                let next = stage + 1;
                if next == chain.len() {
                    outputs.push(token);
                } else {
                    process(chain[next].as_mut(), Some(token), ctx).await?;
                    pending.push(next);
                }
            }
        }
    }
    Ok(())
}
