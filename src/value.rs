//! Scalar values exchanged with parameters and quantities.
//!
//! Every control or read endpoint traffics in [`Value`], a small scalar enum
//! normalized at the parameter boundary: a parameter declares a [`ValueKind`]
//! and every assignment is coerced against it. Numeric kinds convert where
//! the conversion is lossless enough to be useful (int widens to float,
//! float truncates toward zero to int, numeric text parses); anything else
//! fails immediately with a [`SweepError::ValueKind`] naming both kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SweepError, SweepResult};

/// A scalar value held by a parameter or produced by a quantity read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Signed integer scalar.
    Int(i64),
    /// Floating-point scalar.
    Float(f64),
    /// Free-form text, e.g. a discrete instrument mode.
    Text(String),
    /// Boolean flag.
    Bool(bool),
}

/// Declared kind of a parameter, or the observed kind of a [`Value`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    /// Untyped: accepts any value unchanged.
    Any,
    /// 64-bit float; accepts int and numeric text.
    Float,
    /// 64-bit signed integer; accepts float (truncated) and integral text.
    Int,
    /// Text only.
    Text,
    /// Boolean only.
    Bool,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Any => "any",
            ValueKind::Float => "float",
            ValueKind::Int => "int",
            ValueKind::Text => "text",
            ValueKind::Bool => "bool",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl Value {
    /// The kind this value actually carries.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Text(_) => ValueKind::Text,
            Value::Bool(_) => ValueKind::Bool,
        }
    }

    /// Numeric view as `f64`; `None` for text and bool.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Integer view; floats truncate toward zero, `None` otherwise.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    /// Coerce this value to a parameter's declared kind.
    ///
    /// `parameter` is used only to name the endpoint in the error.
    pub fn coerce(self, kind: ValueKind, parameter: &str) -> SweepResult<Value> {
        let got = self.kind();
        let reject = |got| SweepError::ValueKind {
            parameter: parameter.to_string(),
            expected: kind,
            got,
        };
        match kind {
            ValueKind::Any => Ok(self),
            ValueKind::Float => match self {
                Value::Float(v) => Ok(Value::Float(v)),
                Value::Int(v) => Ok(Value::Float(v as f64)),
                Value::Text(s) => match s.trim().parse::<f64>() {
                    Ok(v) => Ok(Value::Float(v)),
                    Err(_) => Err(reject(got)),
                },
                Value::Bool(_) => Err(reject(got)),
            },
            ValueKind::Int => match self {
                Value::Int(v) => Ok(Value::Int(v)),
                // Truncation toward zero matches the behavior of the
                // numeric conversion discrete instrument ranges expect.
                Value::Float(v) if v.is_finite() => Ok(Value::Int(v as i64)),
                Value::Text(s) => match s.trim().parse::<i64>() {
                    Ok(v) => Ok(Value::Int(v)),
                    Err(_) => Err(reject(got)),
                },
                _ => Err(reject(got)),
            },
            ValueKind::Text => match self {
                Value::Text(s) => Ok(Value::Text(s)),
                other => Err(reject(other.kind())),
            },
            ValueKind::Bool => match self {
                Value::Bool(b) => Ok(Value::Bool(b)),
                other => Err(reject(other.kind())),
            },
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
