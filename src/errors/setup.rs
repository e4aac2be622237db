// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use crate::errors::{DuplicateNameError, UnresolvedReferenceError};

/// A problem detected before any token moves.
///
/// Every variant carries the full tree path of the actor that raised it so a
/// flow author can find the offending node without re-running the flow.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SetupError {
    #[error("{path}: option '{option}' is invalid: {message}")]
    InvalidOption {
        path: String,
        option: String,
        message: String,
    },

    #[error("{path}: required option '{option}' is missing")]
    MissingOption { path: String, option: String },

    #[error("{path}: {source}")]
    DuplicateName {
        path: String,
        #[source]
        source: DuplicateNameError,
    },

    #[error("{path}: {source}")]
    UnresolvedReference {
        path: String,
        #[source]
        source: UnresolvedReferenceError,
    },

    #[error("{path}: incompatible wiring: {message}")]
    IncompatibleWiring { path: String, message: String },

    #[error("{path}: unknown actor class '{class}'")]
    UnknownClass { path: String, class: String },

    #[error("{path}: {message}")]
    Invalid { path: String, message: String },
}

impl SetupError {
    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        SetupError::Invalid {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Tree path of the actor the error belongs to.
    pub fn path(&self) -> &str {
        match self {
            SetupError::InvalidOption { path, .. }
            | SetupError::MissingOption { path, .. }
            | SetupError::DuplicateName { path, .. }
            | SetupError::UnresolvedReference { path, .. }
            | SetupError::IncompatibleWiring { path, .. }
            | SetupError::UnknownClass { path, .. }
            | SetupError::Invalid { path, .. } => path,
        }
    }
}

/// All setup errors of a flow, surfaced together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetupErrors(pub Vec<SetupError>);

impl SetupErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, error: SetupError) {
        self.0.push(error);
    }

    pub fn extend(&mut self, other: SetupErrors) {
        self.0.extend(other.0);
    }

    /// Records the error half of `result`, if any.
    pub fn absorb(&mut self, result: Result<(), SetupErrors>) {
        if let Err(errors) = result {
            self.extend(errors);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SetupError> {
        self.0.iter()
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), SetupErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for SetupErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} setup error(s)", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for SetupErrors {}

impl From<SetupError> for SetupErrors {
    fn from(error: SetupError) -> Self {
        Self(vec![error])
    }
}

impl From<Vec<SetupError>> for SetupErrors {
    fn from(errors: Vec<SetupError>) -> Self {
        Self(errors)
    }
}
