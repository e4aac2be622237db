// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

/// Structural problems found in a flow definition before any actor is built.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// An actor was declared without a name
    EmptyName {
        /// Dotted path of the enclosing actor
        parent: String,
    },
    /// Two children of the same parent share a name
    DuplicateSiblingName {
        /// Dotted path of the enclosing actor
        parent: String,
        /// The repeated name
        name: String,
    },
    /// The actor class is not known to the registry
    UnknownClass {
        /// Dotted path of the offending actor
        path: String,
        /// The class identifier as written in the definition
        class: String,
    },
    /// The actor name contains characters outside `[A-Za-z0-9_\-:. ]`
    InvalidName {
        /// Dotted path of the enclosing actor
        parent: String,
        /// The rejected name
        name: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyName { parent } => {
                write!(f, "Actor below '{}' has an empty name", parent)
            }
            ValidationError::DuplicateSiblingName { parent, name } => {
                write!(
                    f,
                    "Name '{}' is used more than once below '{}'",
                    name, parent
                )
            }
            ValidationError::UnknownClass { path, class } => {
                write!(f, "Actor '{}' uses unknown class '{}'", path, class)
            }
            ValidationError::InvalidName { parent, name } => {
                write!(
                    f,
                    "Actor name '{}' below '{}' contains invalid characters",
                    name, parent
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised while reading or writing flow definition files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access flow file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse flow definition: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Configuration validation failed:\n{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<ValidationError>),
}
