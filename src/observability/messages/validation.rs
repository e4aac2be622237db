// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for flow definition validation warnings and errors.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// An option key the actor class does not know; it is ignored.
///
/// # Log Level
/// `warn!` - Often a typo, sometimes an option of a newer version
///
/// # Example
/// ```
/// use actorflow::observability::messages::validation::UnknownOptionIgnored;
///
/// let msg = UnknownOptionIgnored {
///     path: "flow.numbers",
///     class: "integer_range",
///     option: "stpe",
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct UnknownOptionIgnored<'a> {
    pub path: &'a str,
    pub class: &'a str,
    pub option: &'a str,
}

impl Display for UnknownOptionIgnored<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Ignoring unknown option '{}' of '{}' ({})",
            self.option, self.path, self.class
        )
    }
}

impl StructuredLog for UnknownOptionIgnored<'_> {
    fn log(&self) {
        tracing::warn!(
            actor = self.path,
            class = self.class,
            option = self.option,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "unknown_option",
            span_name = name,
            actor = self.path,
            option = self.option,
        )
    }
}

/// Flow definition failed structural validation.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct FlowValidationFailed<'a> {
    pub flow_name: &'a str,
    pub error_count: usize,
}

impl Display for FlowValidationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Flow definition '{}' failed validation with {} error(s)",
            self.flow_name, self.error_count
        )
    }
}

impl StructuredLog for FlowValidationFailed<'_> {
    fn log(&self) {
        tracing::error!(
            flow_name = self.flow_name,
            error_count = self.error_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            flow_name = self.flow_name,
            error_count = self.error_count,
        )
    }
}
