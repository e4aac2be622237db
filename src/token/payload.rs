// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Runtime type tag of a [`Payload`], used for `accepts`/`generates` checks.
///
/// `Unknown` is the wildcard: an actor accepting `Unknown` takes anything, and
/// an actor generating `Unknown` is compatible with any consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadType {
    Unknown,
    Null,
    Boolean,
    Integer,
    Float,
    Text,
    Bytes,
    Array,
    Json,
    Object,
}

impl PayloadType {
    /// True when a token of type `self` may be handed to an actor accepting `accepted`.
    pub fn is_accepted_by(self, accepted: &[PayloadType]) -> bool {
        self == PayloadType::Unknown
            || accepted
                .iter()
                .any(|t| *t == PayloadType::Unknown || *t == self)
    }

    /// Static wiring check between a producer and a consumer.
    pub fn compatible(generates: &[PayloadType], accepts: &[PayloadType]) -> bool {
        generates.is_empty()
            || accepts.is_empty()
            || generates.iter().any(|g| g.is_accepted_by(accepts))
    }

    pub fn list(types: &[PayloadType]) -> String {
        types
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PayloadType::Unknown => "unknown",
            PayloadType::Null => "null",
            PayloadType::Boolean => "boolean",
            PayloadType::Integer => "integer",
            PayloadType::Float => "float",
            PayloadType::Text => "text",
            PayloadType::Bytes => "bytes",
            PayloadType::Array => "array",
            PayloadType::Json => "json",
            PayloadType::Object => "object",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for PayloadType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s {
            "unknown" => PayloadType::Unknown,
            "null" => PayloadType::Null,
            "boolean" => PayloadType::Boolean,
            "integer" => PayloadType::Integer,
            "float" => PayloadType::Float,
            "text" => PayloadType::Text,
            "bytes" => PayloadType::Bytes,
            "array" => PayloadType::Array,
            "json" => PayloadType::Json,
            "object" => PayloadType::Object,
            other => return Err(format!("unknown payload type '{}'", other)),
        };
        Ok(parsed)
    }
}

/// The value carried by a token.
#[derive(Clone)]
pub enum Payload {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Array(Vec<Payload>),
    Json(serde_json::Value),
    /// Opaque value for leaf actors exchanging their own types.
    Object(Arc<dyn Any + Send + Sync>),
}

impl Payload {
    pub fn payload_type(&self) -> PayloadType {
        match self {
            Payload::Null => PayloadType::Null,
            Payload::Boolean(_) => PayloadType::Boolean,
            Payload::Integer(_) => PayloadType::Integer,
            Payload::Float(_) => PayloadType::Float,
            Payload::Text(_) => PayloadType::Text,
            Payload::Bytes(_) => PayloadType::Bytes,
            Payload::Array(_) => PayloadType::Array,
            Payload::Json(_) => PayloadType::Json,
            Payload::Object(_) => PayloadType::Object,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Payload::Integer(v) => Some(*v),
            Payload::Float(v) => exact_i64(*v),
            Payload::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Payload::Integer(v) => Some(*v as f64),
            Payload::Float(v) => Some(*v),
            Payload::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Downcasts an [`Payload::Object`] to a concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Payload::Object(obj) => obj.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Textual rendering used for variables, conditions and logging.
    pub fn to_text(&self) -> String {
        match self {
            Payload::Null => String::new(),
            Payload::Boolean(v) => v.to_string(),
            Payload::Integer(v) => v.to_string(),
            Payload::Float(v) => v.to_string(),
            Payload::Text(s) => s.clone(),
            Payload::Bytes(b) => format!("<{} bytes>", b.len()),
            Payload::Array(items) => format!(
                "[{}]",
                items.iter().map(|p| p.to_text()).collect::<Vec<_>>().join(", ")
            ),
            Payload::Json(v) => v.to_string(),
            Payload::Object(_) => "<object>".to_string(),
        }
    }
}

impl Payload {
    /// Converts this payload into `target`, parsing text where needed.
    pub fn convert(&self, target: PayloadType) -> Result<Payload, String> {
        if self.payload_type() == target || target == PayloadType::Unknown {
            return Ok(self.clone());
        }
        let fail = || format!("cannot convert {} '{}' to {}", self.payload_type(), self.to_text(), target);
        match target {
            PayloadType::Text => Ok(Payload::Text(self.to_text())),
            PayloadType::Integer => self.as_i64().map(Payload::Integer).ok_or_else(fail),
            PayloadType::Float => self.as_f64().map(Payload::Float).ok_or_else(fail),
            PayloadType::Boolean => match self {
                Payload::Integer(v) => Ok(Payload::Boolean(*v != 0)),
                Payload::Text(s) => s.trim().parse::<bool>().map(Payload::Boolean).map_err(|_| fail()),
                _ => Err(fail()),
            },
            PayloadType::Bytes => match self {
                Payload::Text(s) => Ok(Payload::Bytes(s.as_bytes().to_vec())),
                _ => Err(fail()),
            },
            PayloadType::Json => match self {
                Payload::Text(s) => serde_json::from_str(s).map(Payload::Json).map_err(|_| fail()),
                Payload::Null => Ok(Payload::Json(serde_json::Value::Null)),
                Payload::Boolean(v) => Ok(Payload::Json((*v).into())),
                Payload::Integer(v) => Ok(Payload::Json((*v).into())),
                Payload::Float(v) => Ok(Payload::Json((*v).into())),
                _ => Err(fail()),
            },
            PayloadType::Array => Ok(Payload::Array(vec![self.clone()])),
            PayloadType::Null => Ok(Payload::Null),
            PayloadType::Object | PayloadType::Unknown => Err(fail()),
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Null => f.write_str("Null"),
            Payload::Boolean(v) => f.debug_tuple("Boolean").field(v).finish(),
            Payload::Integer(v) => f.debug_tuple("Integer").field(v).finish(),
            Payload::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Payload::Text(v) => f.debug_tuple("Text").field(v).finish(),
            Payload::Bytes(v) => f.debug_tuple("Bytes").field(&v.len()).finish(),
            Payload::Array(v) => f.debug_tuple("Array").field(v).finish(),
            Payload::Json(v) => f.debug_tuple("Json").field(v).finish(),
            Payload::Object(_) => f.write_str("Object(..)"),
        }
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Payload::Null, Payload::Null) => true,
            (Payload::Boolean(a), Payload::Boolean(b)) => a == b,
            (Payload::Integer(a), Payload::Integer(b)) => a == b,
            (Payload::Float(a), Payload::Float(b)) => a == b,
            (Payload::Text(a), Payload::Text(b)) => a == b,
            (Payload::Bytes(a), Payload::Bytes(b)) => a == b,
            (Payload::Array(a), Payload::Array(b)) => a == b,
            (Payload::Json(a), Payload::Json(b)) => a == b,
            (Payload::Object(a), Payload::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Payload {
    fn from(v: bool) -> Self {
        Payload::Boolean(v)
    }
}

impl From<i64> for Payload {
    fn from(v: i64) -> Self {
        Payload::Integer(v)
    }
}

impl From<f64> for Payload {
    fn from(v: f64) -> Self {
        Payload::Float(v)
    }
}

impl From<&str> for Payload {
    fn from(v: &str) -> Self {
        Payload::Text(v.to_string())
    }
}

impl From<String> for Payload {
    fn from(v: String) -> Self {
        Payload::Text(v)
    }
}

impl From<Vec<Payload>> for Payload {
    fn from(v: Vec<Payload>) -> Self {
        Payload::Array(v)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(v: serde_json::Value) -> Self {
        Payload::Json(v)
    }
}

/// `value` as an `i64` when it is integral and in range; `as` would saturate.
pub(crate) fn exact_i64(value: f64) -> Option<i64> {
    // 2^63 is exact in f64, i64::MAX is not.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (value.fract() == 0.0 && (-LIMIT..LIMIT).contains(&value)).then_some(value as i64)
}
