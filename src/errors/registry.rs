// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors for the callable actor registry.

/// A callable name was registered twice in the same flow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Callable name '{name}' is already used in this scope")]
pub struct DuplicateNameError {
    pub name: String,
}

/// No live callable actor is registered under the requested name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Callable actor '{name}' not found")]
pub struct UnresolvedReferenceError {
    pub name: String,
}
