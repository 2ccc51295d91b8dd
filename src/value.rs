//! Dynamic values flowing between nodes, and the conversion rules applied at
//! consumer boundaries.
//!
//! Producer ports and argument bags carry [`serde_json::Value`]s; consumer
//! slots have a declared [`ValueType`] (derived from their authoring-time
//! default). When the two disagree, [`coerce`] attempts a generic
//! conversion. Every call site treats a failed conversion as non-fatal: the
//! consumer keeps its pre-existing default and the failure is logged as a
//! warning upstream.
//!
//! One asymmetry is intentional: boolean-producing values are passed through
//! untouched regardless of the consumer's declared type. That mirrors the
//! authoring tool's behavior and keeps truthiness decisions in one place
//! ([`to_bool`]).

use miette::Diagnostic;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Declared type of a consumer slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueType {
    Bool,
    Integer,
    Float,
    Text,
}

impl ValueType {
    /// The type descriptor of a dynamic value, if it has a scalar one.
    ///
    /// Arrays, objects, and null have no slot type and yield `None`.
    #[must_use]
    pub fn of(value: &Value) -> Option<ValueType> {
        match value {
            Value::Bool(_) => Some(ValueType::Bool),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(ValueType::Integer),
            Value::Number(_) => Some(ValueType::Float),
            Value::String(_) => Some(ValueType::Text),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// Errors raised by value conversion.
#[derive(Debug, Error, Diagnostic)]
pub enum CoerceError {
    #[error("cannot convert {value} to {target}")]
    #[diagnostic(
        code(taleflow::value::unconvertible),
        help("The consumer slot keeps its authored default when conversion fails.")
    )]
    Unconvertible { value: Value, target: ValueType },
}

impl CoerceError {
    fn new(value: &Value, target: ValueType) -> Self {
        Self::Unconvertible {
            value: value.clone(),
            target,
        }
    }
}

/// Convert `value` to the consumer's declared type.
///
/// Booleans pass through as-is for every target; otherwise the conversion is
/// the generic scalar one ("true"/"false" strings to bool, numeric strings to
/// numbers, scalars to their text form).
pub fn coerce(value: &Value, target: ValueType) -> Result<Value, CoerceError> {
    if value.is_boolean() {
        return Ok(value.clone());
    }
    match target {
        ValueType::Bool => to_bool(value).map(Value::Bool),
        ValueType::Integer => to_integer(value).map(Value::from),
        ValueType::Float => to_float(value).map(Value::from),
        ValueType::Text => to_text(value).map(Value::String),
    }
}

/// Truthiness conversion: bools pass through, "true"/"false" strings parse
/// (trimmed, case-insensitive), numbers are true when non-zero.
pub fn to_bool(value: &Value) -> Result<bool, CoerceError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.eq_ignore_ascii_case("true") {
                Ok(true)
            } else if trimmed.eq_ignore_ascii_case("false") {
                Ok(false)
            } else {
                Err(CoerceError::new(value, ValueType::Bool))
            }
        }
        Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
        _ => Err(CoerceError::new(value, ValueType::Bool)),
    }
}

pub fn to_integer(value: &Value) -> Result<i64, CoerceError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .ok_or_else(|| CoerceError::new(value, ValueType::Integer)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| CoerceError::new(value, ValueType::Integer)),
        Value::Bool(b) => Ok(i64::from(*b)),
        _ => Err(CoerceError::new(value, ValueType::Integer)),
    }
}

pub fn to_float(value: &Value) -> Result<f64, CoerceError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| CoerceError::new(value, ValueType::Float)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| CoerceError::new(value, ValueType::Float)),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        _ => Err(CoerceError::new(value, ValueType::Float)),
    }
}

pub fn to_text(value: &Value) -> Result<String, CoerceError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(CoerceError::new(value, ValueType::Text)),
    }
}
