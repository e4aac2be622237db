// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, SetupErrors};

/// How the flow reacts when an actor's `execute` fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStrategy {
    /// The first failure aborts the whole run unless the actor is marked non-fatal.
    #[default]
    FailFast,
    /// Every failure is logged and the offending token dropped, except for actors
    /// marked `stop_flow_on_error`.
    ContinueOnError,
}

/// A failure while tokens are moving.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutionError {
    #[error("Actor '{path}' failed: {message}")]
    ActorFailed { path: String, message: String },

    #[error("Actor '{path}' does not accept {actual} (accepts: {expected})")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Flow stopped: {reason}")]
    Stopped { reason: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ExecutionError {
    /// Tree path of the failing actor, when the error is tied to one.
    pub fn path(&self) -> Option<&str> {
        match self {
            ExecutionError::ActorFailed { path, .. } | ExecutionError::TypeMismatch { path, .. } => {
                Some(path)
            }
            _ => None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ExecutionError::Internal {
            message: message.into(),
        }
    }
}

/// Top-level error returned by [`crate::engine::Flow`] operations.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("flow setup failed: {0}")]
    Setup(#[from] SetupErrors),

    #[error("flow execution failed: {0}")]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot {operation} a flow in state {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },
}
