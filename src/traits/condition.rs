// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::FlowContext;
use crate::errors::ExecutionError;
use crate::token::Token;

/// Boolean test used by conditional and looping handlers.
///
/// `token` is `None` when the condition is evaluated outside a token's path,
/// e.g. before a loop iteration.
pub trait Condition: Send + Sync {
    fn evaluate(&self, token: Option<&Token>, ctx: &FlowContext) -> Result<bool, ExecutionError>;

    fn describe(&self) -> String;
}
