// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! This module provides centralized message types for all diagnostic and operational
//! logging of the flow engine. Message types follow a struct-based pattern with
//! `Display` for the human-readable text and [`messages::StructuredLog`] for emitting
//! the event with typed fields:
//!
//! * No magic strings scattered through actors and the engine
//! * One place to change wording
//! * Consistent field names across subsystems
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::flow` - flow lifecycle, stop/pause control and variable lookups
//! * `messages::actor` - actor execution, error handling and handler decisions
//! * `messages::validation` - flow definition validation and option warnings
//!
//! # Usage
//!
//! ```rust
//! use actorflow::observability::messages::actor::ActorFailed;
//! use actorflow::observability::messages::StructuredLog;
//!
//! let error = std::io::Error::new(std::io::ErrorKind::Other, "test error");
//! ActorFailed {
//!     path: "flow.writer",
//!     error: &error,
//! }
//! .log();
//! ```

pub mod messages;
