//! Opaque continuation cursors
//!
//! A [`Cursor`] records the sort-key values of the last row a client has
//! seen, plus the signature of the ordering it was minted under. Clients only
//! ever hold the encoded [`CursorToken`]; the only way to produce or read one
//! is through [`CursorCodec`], which keeps the wire layout free to change
//! behind its version byte.

mod codec;

pub use codec::{CursorCodec, CURSOR_FORMAT_VERSION, MAX_CURSOR_TOKEN_LEN};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sort::{SortSignature, MAX_SORT_FIELDS};
use crate::value::FieldValue;

/// Reasons a cursor token cannot be decoded
///
/// Tokens come from clients, so every variant describes untrusted input and
/// maps to [`PaginationError::InvalidCursor`](crate::PaginationError).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CursorDecodeError {
    /// Token is empty or only whitespace
    #[error("cursor token is empty")]
    Empty,

    /// Token text is longer than [`MAX_CURSOR_TOKEN_LEN`]
    #[error("cursor token exceeds max length: {len} chars (max {max})")]
    TooLong { len: usize, max: usize },

    /// Token is not unpadded base64url
    #[error("cursor token is not valid base64url")]
    InvalidEncoding,

    /// Decoded bytes end before a complete header, value or tag
    #[error("cursor token is truncated")]
    Truncated,

    /// Authentication tag does not match the body (tampered, or minted under another secret)
    #[error("cursor token failed its integrity check")]
    ChecksumMismatch,

    /// Version byte this build does not understand
    #[error("unsupported cursor format version {0}")]
    UnsupportedVersion(u8),

    /// Value carries a type tag this build does not understand
    #[error("unknown field type tag {0}")]
    UnknownTypeTag(u8),

    /// Text value is not valid UTF-8
    #[error("cursor text field is not valid UTF-8")]
    InvalidUtf8,

    /// Timestamp value is outside the representable range
    #[error("cursor timestamp field is out of range")]
    InvalidTimestamp,

    /// Declared value count is larger than any sort specification allows
    #[error("cursor declares {0} fields (max {max})", max = MAX_SORT_FIELDS)]
    TooManyFields(usize),

    /// Bytes remain after the declared number of values
    #[error("cursor token has {0} unexpected trailing bytes")]
    TrailingBytes(usize),

    /// Value count differs from the request's sort field count
    #[error("cursor has {found} fields but the sort specification has {expected}")]
    ArityMismatch { expected: usize, found: usize },
}

/// Encoded cursor as handed to clients
///
/// Serializes as a plain string. Its content is not part of any contract.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CursorToken(String);

impl CursorToken {
    pub(crate) fn new(token: String) -> Self {
        Self(token)
    }

    /// The token text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the token text
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CursorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for CursorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CursorToken({})", self.0)
    }
}

impl AsRef<str> for CursorToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<CursorToken> for String {
    fn from(token: CursorToken) -> Self {
        token.0
    }
}

/// A decoded cursor
///
/// The field values are crate-private: callers can inspect which ordering a
/// cursor belongs to, never the position it encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    version: u8,
    signature: SortSignature,
    values: Vec<FieldValue>,
}

impl Cursor {
    pub(crate) fn new(version: u8, signature: SortSignature, values: Vec<FieldValue>) -> Self {
        Self {
            version,
            signature,
            values,
        }
    }

    /// Format version the cursor was encoded with
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Signature of the ordering the cursor was minted under
    pub fn signature(&self) -> SortSignature {
        self.signature
    }

    /// Number of sort-key values carried
    pub fn arity(&self) -> usize {
        self.values.len()
    }

    #[cfg(test)]
    pub(crate) fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub(crate) fn into_values(self) -> Vec<FieldValue> {
        self.values
    }
}
