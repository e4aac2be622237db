// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for actor execution and handler events.
//!
//! This module contains message types for logging events related to:
//! * Actor failures, fatal and non-fatal
//! * Tokens dropped by handlers
//! * Trigger, loop and callable reference decisions

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// An actor failed and the failure aborts the enclosing run.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use actorflow::observability::messages::actor::ActorFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
/// let msg = ActorFailed {
///     path: "flow.writer",
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct ActorFailed<'a> {
    pub path: &'a str,
    pub error: &'a dyn std::fmt::Display,
}

impl Display for ActorFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Actor '{}' failed: {}", self.path, self.error)
    }
}

impl StructuredLog for ActorFailed<'_> {
    fn log(&self) {
        tracing::error!(
            actor = self.path,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("actor_failed", span_name = name, actor = self.path)
    }
}

/// An actor failed but is allowed to; the token is dropped and the flow continues.
///
/// # Log Level
/// `warn!` - Recorded in the flow's error log
pub struct NonFatalError<'a> {
    pub path: &'a str,
    pub error: &'a dyn std::fmt::Display,
    pub token: Option<&'a str>,
}

impl Display for NonFatalError<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.token {
            Some(token) => write!(
                f,
                "Actor '{}' failed on token ({}), continuing: {}",
                self.path, token, self.error
            ),
            None => write!(f, "Actor '{}' failed, continuing: {}", self.path, self.error),
        }
    }
}

impl StructuredLog for NonFatalError<'_> {
    fn log(&self) {
        tracing::warn!(
            actor = self.path,
            error = %self.error,
            token = self.token,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("non_fatal_error", span_name = name, actor = self.path)
    }
}

/// A handler dropped a token without an error, e.g. no switch case matched.
///
/// # Log Level
/// `debug!` - Expected during normal operation
pub struct TokenDropped<'a> {
    pub path: &'a str,
    pub token: &'a str,
    pub reason: &'a str,
}

impl Display for TokenDropped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Actor '{}' dropped token ({}): {}",
            self.path, self.token, self.reason
        )
    }
}

impl StructuredLog for TokenDropped<'_> {
    fn log(&self) {
        tracing::debug!(
            actor = self.path,
            token = self.token,
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("token_dropped", span_name = name, actor = self.path)
    }
}

/// Options of an actor are re-read because referenced variables changed.
///
/// # Log Level
/// `debug!`
pub struct ActorRefreshed<'a> {
    pub path: &'a str,
}

impl Display for ActorRefreshed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Variables of actor '{}' changed, refreshing", self.path)
    }
}

impl StructuredLog for ActorRefreshed<'_> {
    fn log(&self) {
        tracing::debug!(actor = self.path, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("actor_refreshed", span_name = name, actor = self.path)
    }
}

/// An event trigger fired and runs its body.
///
/// # Log Level
/// `debug!` - High-frequency event
pub struct TriggerFired<'a> {
    pub path: &'a str,
    pub fire: u64,
    pub coalesced: usize,
}

impl Display for TriggerFired<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Trigger '{}' fired (#{})", self.path, self.fire)?;
        if self.coalesced > 0 {
            write!(f, ", {} pending fires coalesced", self.coalesced)?;
        }
        Ok(())
    }
}

impl StructuredLog for TriggerFired<'_> {
    fn log(&self) {
        tracing::debug!(
            actor = self.path,
            fire = self.fire,
            coalesced = self.coalesced,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "trigger_fire",
            span_name = name,
            actor = self.path,
            fire = self.fire,
        )
    }
}

/// An event trigger stopped listening for fires.
///
/// # Log Level
/// `debug!`
pub struct TriggerStopped<'a> {
    pub path: &'a str,
    pub fires: u64,
}

impl Display for TriggerStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Trigger '{}' stopped after {} fires", self.path, self.fires)
    }
}

impl StructuredLog for TriggerStopped<'_> {
    fn log(&self) {
        tracing::debug!(actor = self.path, fires = self.fires, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("trigger_stopped", span_name = name, actor = self.path)
    }
}

/// An optional callable reference could not be resolved; the actor does nothing.
///
/// # Log Level
/// `info!`
pub struct OptionalCallableMissing<'a> {
    pub path: &'a str,
    pub callable: &'a str,
}

impl Display for OptionalCallableMissing<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Optional callable actor '{}' referenced by '{}' not found, ignoring",
            self.callable, self.path
        )
    }
}

impl StructuredLog for OptionalCallableMissing<'_> {
    fn log(&self) {
        tracing::info!(actor = self.path, callable = self.callable, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "optional_callable_missing",
            span_name = name,
            actor = self.path,
            callable = self.callable,
        )
    }
}

/// A loop hit its iteration safety limit before its condition held.
///
/// # Log Level
/// `warn!`
pub struct LoopLimitReached<'a> {
    pub path: &'a str,
    pub limit: u64,
}

impl Display for LoopLimitReached<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Loop '{}' reached its limit of {} iterations, exiting",
            self.path, self.limit
        )
    }
}

impl StructuredLog for LoopLimitReached<'_> {
    fn log(&self) {
        tracing::warn!(actor = self.path, limit = self.limit, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("loop_limit", span_name = name, actor = self.path)
    }
}

/// A try/catch handler caught an error from its try branch.
///
/// # Log Level
/// `warn!`
pub struct ErrorCaught<'a> {
    pub path: &'a str,
    pub error: &'a dyn std::fmt::Display,
}

impl Display for ErrorCaught<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "'{}' caught error, running catch branch: {}", self.path, self.error)
    }
}

impl StructuredLog for ErrorCaught<'_> {
    fn log(&self) {
        tracing::warn!(actor = self.path, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("error_caught", span_name = name, actor = self.path)
    }
}
