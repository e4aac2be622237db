// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for flow lifecycle and control events.
//!
//! This module contains message types for logging events related to:
//! * Flow setup and run lifecycle (start, completion, failure)
//! * Cooperative stop and pause/resume requests
//! * Variable substitution

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Flow run started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use actorflow::observability::messages::flow::FlowStarted;
///
/// let msg = FlowStarted {
///     flow_name: "demo",
///     flow_id: "1d6e",
///     actor_count: 4,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct FlowStarted<'a> {
    pub flow_name: &'a str,
    pub flow_id: &'a str,
    pub actor_count: usize,
}

impl Display for FlowStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting flow '{}' ({}) with {} actors",
            self.flow_name, self.flow_id, self.actor_count
        )
    }
}

impl StructuredLog for FlowStarted<'_> {
    fn log(&self) {
        tracing::info!(
            flow_name = self.flow_name,
            flow_id = self.flow_id,
            actor_count = self.actor_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "flow",
            span_name = name,
            flow_name = self.flow_name,
            flow_id = self.flow_id,
        )
    }
}

/// Flow run finished in a terminal state.
///
/// # Log Level
/// `info!` for completed and stopped runs, `error!` for failed ones
pub struct FlowFinished<'a> {
    pub flow_name: &'a str,
    pub state: &'a str,
    pub duration: std::time::Duration,
    pub non_fatal_errors: usize,
}

impl Display for FlowFinished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Flow '{}' finished as {} in {:?} ({} non-fatal errors)",
            self.flow_name, self.state, self.duration, self.non_fatal_errors
        )
    }
}

impl StructuredLog for FlowFinished<'_> {
    fn log(&self) {
        if self.state == "failed" {
            tracing::error!(
                flow_name = self.flow_name,
                state = self.state,
                duration_ms = self.duration.as_millis() as u64,
                non_fatal_errors = self.non_fatal_errors,
                "{}", self
            );
        } else {
            tracing::info!(
                flow_name = self.flow_name,
                state = self.state,
                duration_ms = self.duration.as_millis() as u64,
                non_fatal_errors = self.non_fatal_errors,
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "flow_finished",
            span_name = name,
            flow_name = self.flow_name,
            state = self.state,
            duration = ?self.duration,
        )
    }
}

/// Setup found errors; no token will move.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct FlowSetupFailed<'a> {
    pub flow_name: &'a str,
    pub error_count: usize,
    pub errors: &'a str,
}

impl Display for FlowSetupFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Setup of flow '{}' failed with {} error(s): {}",
            self.flow_name, self.error_count, self.errors
        )
    }
}

impl StructuredLog for FlowSetupFailed<'_> {
    fn log(&self) {
        tracing::error!(
            flow_name = self.flow_name,
            error_count = self.error_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "flow_setup_failed",
            span_name = name,
            flow_name = self.flow_name,
            error_count = self.error_count,
        )
    }
}

/// A stop, pause or resume request reached the flow.
///
/// # Log Level
/// `info!` - Important operational event
pub struct FlowControl<'a> {
    pub flow_name: &'a str,
    pub action: &'a str,
    pub reason: Option<&'a str>,
}

impl Display for FlowControl<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.reason {
            Some(reason) => write!(f, "Flow '{}': {} ({})", self.flow_name, self.action, reason),
            None => write!(f, "Flow '{}': {}", self.flow_name, self.action),
        }
    }
}

impl StructuredLog for FlowControl<'_> {
    fn log(&self) {
        tracing::info!(
            flow_name = self.flow_name,
            action = self.action,
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "flow_control",
            span_name = name,
            flow_name = self.flow_name,
            action = self.action,
        )
    }
}

/// A `${name}` placeholder referenced a variable that is not set.
///
/// # Log Level
/// `warn!` - Expands to the empty string, which is usually a flow authoring mistake
///
/// # Example
/// ```
/// use actorflow::observability::messages::flow::UnresolvedVariable;
///
/// let msg = UnresolvedVariable {
///     name: "output_dir",
///     template: "${output_dir}/result.csv",
/// };
///
/// assert_eq!(
///     msg.to_string(),
///     "Variable 'output_dir' is not set, expanding to empty string in '${output_dir}/result.csv'"
/// );
/// ```
pub struct UnresolvedVariable<'a> {
    pub name: &'a str,
    pub template: &'a str,
}

impl Display for UnresolvedVariable<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Variable '{}' is not set, expanding to empty string in '{}'",
            self.name, self.template
        )
    }
}

impl StructuredLog for UnresolvedVariable<'_> {
    fn log(&self) {
        tracing::warn!(variable = self.name, template = self.template, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "unresolved_variable",
            span_name = name,
            variable = self.name,
        )
    }
}
