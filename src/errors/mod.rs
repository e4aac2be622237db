// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod execution;
mod registry;
mod setup;

pub use config::{ConfigError, ValidationError};
pub use execution::{ExecutionError, FailureStrategy, FlowError};
pub use registry::{DuplicateNameError, UnresolvedReferenceError};
pub use setup::{SetupError, SetupErrors};
