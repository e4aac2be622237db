// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for consistent, human-readable output and
//! [`StructuredLog`] to emit itself at its documented level with typed fields.
//!
//! * `flow` - flow lifecycle and control events
//! * `actor` - actor execution and handler events
//! * `validation` - flow definition validation warnings and errors
//!
//! # Usage Pattern
//!
//! ```rust
//! use actorflow::observability::messages::flow::FlowStarted;
//!
//! let msg = FlowStarted {
//!     flow_name: "demo",
//!     flow_id: "8d9c",
//!     actor_count: 5,
//! };
//!
//! tracing::info!("{}", msg);
//! ```

use tracing::Span;

pub mod actor;
pub mod flow;
pub mod validation;

/// A message that knows its own level and fields.
pub trait StructuredLog {
    /// Emits the message as a tracing event.
    fn log(&self);

    /// A span carrying the message fields, for instrumenting the work it describes.
    fn span(&self, name: &str) -> Span;
}
