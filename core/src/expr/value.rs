//! Runtime value types

use serde_json::{Number, Value as JsonValue};
use std::fmt;

/// Largest integer an f64 holds exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Runtime value type
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
}

impl Val {
    /// Check if value is truthy (for conditionals)
    ///
    /// `false`, `null`, `0`, `NaN` and the empty string are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Val::Null => false,
            Val::Bool(b) => *b,
            Val::Num(n) => *n != 0.0 && !n.is_nan(),
            Val::Str(s) => !s.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Null => "null",
            Val::Bool(_) => "boolean",
            Val::Num(_) => "number",
            Val::Str(_) => "string",
        }
    }

    /// Numeric view used by arithmetic and ordering.
    ///
    /// Strings convert only when they hold a number; `None` otherwise.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Val::Null => Some(0.0),
            Val::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Val::Num(n) => Some(*n),
            Val::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Some(0.0)
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
        }
    }

    /// Convert to JSON for storage in the parameter store.
    ///
    /// Integral numbers become JSON integers so they render as `3`, not `3.0`,
    /// when substituted back into templates. Non-finite numbers become `null`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Val::Null => JsonValue::Null,
            Val::Bool(b) => JsonValue::Bool(*b),
            Val::Num(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                JsonValue::from(*n as i64)
            }
            Val::Num(n) => Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Val::Str(s) => JsonValue::String(s.clone()),
        }
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Null => f.write_str("null"),
            Val::Bool(b) => write!(f, "{}", b),
            Val::Num(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                write!(f, "{}", *n as i64)
            }
            Val::Num(n) => write!(f, "{}", n),
            Val::Str(s) => f.write_str(s),
        }
    }
}
