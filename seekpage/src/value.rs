//! Typed scalar values used as sort keys, cursor fields and filter operands
//!
//! [`FieldValue`] is the single value currency of the engine. Storage
//! collaborators hand sort-key values out of their rows as `FieldValue`s, the
//! cursor codec serializes them with explicit type tags, and the keyset
//! predicate compares them.
//!
//! # Ordering
//!
//! `FieldValue` has a total order so that keyset comparison is deterministic
//! even for heterogeneous or dirty columns:
//!
//! - `Null` sorts before everything else
//! - numeric variants (`Int`, `UInt`, `Float`) compare by numeric value; when
//!   two numbers of different variants are numerically equal the variant rank
//!   decides
//! - floats use IEEE 754 total ordering (`f64::total_cmp`)
//! - otherwise values of different types order by their type rank
//!
//! # Example
//!
//! ```rust
//! use seekpage::FieldValue;
//!
//! assert!(FieldValue::Null < FieldValue::from(0_i64));
//! assert!(FieldValue::from(2_i64) < FieldValue::from(2.5_f64));
//! assert!(FieldValue::from("apple") < FieldValue::from("banana"));
//! ```

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A typed scalar value
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Absent value
    Null,
    /// Boolean value
    Bool(bool),
    /// Signed 64-bit integer
    Int(i64),
    /// Unsigned 64-bit integer
    UInt(u64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 text
    Text(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// UTC timestamp with nanosecond precision
    Timestamp(DateTime<Utc>),
    /// UUID (any version)
    Uuid(Uuid),
}

impl FieldValue {
    /// Stable wire tag for this variant
    ///
    /// The tag is part of the cursor token format; changing an existing
    /// assignment requires a new cursor format version.
    pub const fn type_tag(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) => 2,
            Self::UInt(_) => 3,
            Self::Float(_) => 4,
            Self::Text(_) => 5,
            Self::Bytes(_) => 6,
            Self::Timestamp(_) => 7,
            Self::Uuid(_) => 8,
        }
    }

    /// Human-readable type name, used in error messages and logs
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Timestamp(_) => "timestamp",
            Self::Uuid(_) => "uuid",
        }
    }

    /// Returns true for `Null`
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::UInt(_) | Self::Float(_))
    }

    /// Compare by value alone
    ///
    /// Numerically equal `Int`, `UInt` and `Float` values compare equal here.
    /// [`Ord`] breaks those ties by variant to stay a total order for sorting.
    pub fn value_cmp(&self, other: &Self) -> Ordering {
        if self.is_numeric() && other.is_numeric() {
            numeric_cmp(self, other)
        } else {
            self.cmp(other)
        }
    }
}

fn numeric_cmp(left: &FieldValue, right: &FieldValue) -> Ordering {
    use FieldValue::{Float, Int, UInt};

    match (left, right) {
        (Int(a), Int(b)) => a.cmp(b),
        (UInt(a), UInt(b)) => a.cmp(b),
        (Float(a), Float(b)) => a.total_cmp(b),
        (Int(a), UInt(b)) => i128::from(*a).cmp(&i128::from(*b)),
        (UInt(a), Int(b)) => i128::from(*a).cmp(&i128::from(*b)),
        (Int(a), Float(b)) => (*a as f64).total_cmp(b),
        (UInt(a), Float(b)) => (*a as f64).total_cmp(b),
        (Float(a), Int(b)) => a.total_cmp(&(*b as f64)),
        (Float(a), UInt(b)) => a.total_cmp(&(*b as f64)),
        _ => Ordering::Equal,
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.is_numeric() && other.is_numeric() {
            return numeric_cmp(self, other).then_with(|| self.type_tag().cmp(&other.type_tag()));
        }

        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (Self::Uuid(a), Self::Uuid(b)) => a.cmp(b),
            _ => self.type_tag().cmp(&other.type_tag()),
        }
    }
}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FieldValue {}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(n) => write!(f, "{}", n),
            Self::UInt(n) => write!(f, "{}", n),
            Self::Float(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{:?}", s),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Self::Uuid(id) => write!(f, "{}", id),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<u64> for FieldValue {
    fn from(n: u64) -> Self {
        Self::UInt(n)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}

impl From<Uuid> for FieldValue {
    fn from(id: Uuid) -> Self {
        Self::Uuid(id)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<&serde_json::Value> for FieldValue {
    /// Convert a JSON scalar into a field value
    ///
    /// Integers that fit `i64` become `Int`, larger ones `UInt`, everything
    /// else numeric becomes `Float`. Arrays and objects are carried as their
    /// compact JSON text so they still order deterministically.
    fn from(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }
}
