//! Candidate value types.

use core::fmt;

use serde::{Deserialize, Serialize};

/// An opaque, non-primitive candidate value such as a serialized fitted
/// sub-model.
///
/// The payload is treated as raw bytes: two opaque values are equal only when
/// their kinds and bytes match exactly. The evaluation cache stores these
/// out-of-line, keyed by the hash of their content.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpaqueValue {
    /// A human-readable type tag, e.g. `"pca"` or `"scaler"`.
    pub kind: String,
    /// The serialized object.
    pub bytes: Vec<u8>,
}

impl OpaqueValue {
    /// Creates a new opaque value.
    #[must_use]
    pub fn new(kind: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: kind.into(),
            bytes: bytes.into(),
        }
    }
}

/// A concrete candidate value for one hyperparameter.
///
/// Deserializes from plain JSON scalars (`true`, `3`, `0.5`, `"gini"`);
/// integers are preferred over floats when both would fit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// A boolean flag.
    Bool(bool),
    /// An integer value.
    Int(i64),
    /// A floating-point value. Must be finite.
    Float(f64),
    /// A string value, e.g. a categorical label.
    Str(String),
    /// A non-primitive value stored out-of-line by the cache.
    Object(OpaqueValue),
}

impl ParamValue {
    /// Returns the integer value, if this is an [`Int`](Self::Int).
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as `f64` for [`Float`](Self::Float) and [`Int`](Self::Int).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Returns the string value, if this is a [`Str`](Self::Str).
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the boolean value, if this is a [`Bool`](Self::Bool).
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the opaque payload, if this is an [`Object`](Self::Object).
    #[must_use]
    pub fn as_object(&self) -> Option<&OpaqueValue> {
        match self {
            Self::Object(v) => Some(v),
            _ => None,
        }
    }

    /// Returns `true` for values the cache can key directly.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Self::Object(_))
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
            Self::Object(v) => write!(f, "<{} ({} bytes)>", v.kind, v.bytes.len()),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<OpaqueValue> for ParamValue {
    fn from(v: OpaqueValue) -> Self {
        Self::Object(v)
    }
}
