// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Tokens: the unit of data passed between actors.
//!
//! A [`Token`] carries exactly one [`Payload`] plus the ordered list of actors
//! that produced it. Tokens are never mutated in place; an actor that
//! transforms a token creates a new one with [`Token::derive`], which appends a
//! provenance record for the deriving actor.
//!
//! ```
//! use actorflow::token::{Payload, PayloadType, Token};
//!
//! let source = Token::new(Payload::Integer(21), "flow.numbers");
//! let doubled = source.derive(Payload::Integer(42), "flow.double");
//!
//! assert_eq!(doubled.payload_type(), PayloadType::Integer);
//! assert_eq!(doubled.provenance().len(), 2);
//! assert_eq!(source.provenance().len(), 1);
//! ```

mod payload;

pub(crate) use payload::exact_i64;
pub use payload::{Payload, PayloadType};

use chrono::{DateTime, Utc};

/// One hop in a token's history.
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
    /// Full name of the actor that emitted the token
    pub actor: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    payload: Payload,
    provenance: Vec<Provenance>,
}

impl Token {
    /// Creates a token emitted by `actor`.
    pub fn new(payload: impl Into<Payload>, actor: &str) -> Self {
        Self {
            payload: payload.into(),
            provenance: vec![Provenance {
                actor: actor.to_string(),
                timestamp: Utc::now(),
            }],
        }
    }

    /// Creates a token without any history, e.g. for injecting test input.
    pub fn anonymous(payload: impl Into<Payload>) -> Self {
        Self {
            payload: payload.into(),
            provenance: Vec::new(),
        }
    }

    /// Produces a new token carrying `payload`, keeping this token's history
    /// and recording `actor` as the latest hop.
    pub fn derive(&self, payload: impl Into<Payload>, actor: &str) -> Self {
        let mut provenance = self.provenance.clone();
        provenance.push(Provenance {
            actor: actor.to_string(),
            timestamp: Utc::now(),
        });
        Self {
            payload: payload.into(),
            provenance,
        }
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }

    pub fn payload_type(&self) -> PayloadType {
        self.payload.payload_type()
    }

    pub fn provenance(&self) -> &[Provenance] {
        &self.provenance
    }

    /// Short description used in logs and the error log.
    pub fn summary(&self) -> String {
        let text = self.payload.to_text();
        let shortened: String = text.chars().take(64).collect();
        if shortened.len() < text.len() {
            format!("{}: {}...", self.payload_type(), shortened)
        } else {
            format!("{}: {}", self.payload_type(), shortened)
        }
    }
}
