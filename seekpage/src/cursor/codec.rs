//! Cursor wire format
//!
//! Layout of a version 1 token before base64url (no padding) encoding:
//!
//! ```text
//! +---------+----------------+-------------+-----------------------+---------+
//! | version | sort signature | field count | fields (tag, payload) | auth    |
//! | u8 = 1  | 16 bytes       | u16 BE      | ...                   | 8 bytes |
//! +---------+----------------+-------------+-----------------------+---------+
//! ```
//!
//! Field payloads by tag: null (none), bool (1 byte), int/uint/float (8 bytes
//! big-endian), text/bytes (u32 BE length + data), timestamp (i64 BE seconds +
//! u32 BE nanoseconds), uuid (16 bytes).
//!
//! The trailing 8 bytes are a truncated BLAKE3 hash of everything before
//! them, keyed with the configured secret when there is one. Without a
//! secret the tag only detects corruption; with one it also rejects tokens a
//! client assembled by hand.

use std::fmt;

use base64::prelude::*;
use chrono::DateTime;
use uuid::Uuid;

use super::{Cursor, CursorDecodeError, CursorToken};
use crate::error::Result;
use crate::guard::ConsistencyGuard;
use crate::sort::{SortSignature, SortSpec, MAX_SORT_FIELDS, SIGNATURE_LEN};
use crate::value::FieldValue;

/// Current cursor format version
pub const CURSOR_FORMAT_VERSION: u8 = 1;

/// Longest token text accepted by [`CursorCodec::decode`]
pub const MAX_CURSOR_TOKEN_LEN: usize = 64 * 1024;

const AUTH_TAG_LEN: usize = 8;
const HEADER_LEN: usize = 1 + SIGNATURE_LEN + 2;
const KEY_DERIVATION_CONTEXT: &str = "seekpage 2024 cursor authentication key";

/// Encodes and decodes cursor tokens
///
/// # Example
///
/// ```rust
/// use seekpage::{CursorCodec, FieldValue, SortSpec};
///
/// let codec = CursorCodec::with_secret("server-side secret");
/// let spec = SortSpec::parse("score:desc", "id").unwrap();
///
/// let token = codec.encode(&[FieldValue::Int(90), FieldValue::Int(7)], spec.signature());
/// let cursor = codec.decode_for(token.as_str(), &spec).unwrap();
/// assert_eq!(cursor.arity(), 2);
/// ```
#[derive(Clone, Default)]
pub struct CursorCodec {
    key: Option<[u8; 32]>,
}

impl CursorCodec {
    /// Codec with an unkeyed integrity check
    pub fn new() -> Self {
        Self { key: None }
    }

    /// Codec whose tokens are authenticated with a key derived from `secret`
    pub fn with_secret(secret: &str) -> Self {
        let key = blake3::derive_key(KEY_DERIVATION_CONTEXT, secret.as_bytes());
        Self { key: Some(key) }
    }

    /// Codec keyed with raw key material
    pub fn from_key(key: [u8; 32]) -> Self {
        Self { key: Some(key) }
    }

    /// Whether tokens are authenticated with a secret
    pub fn is_keyed(&self) -> bool {
        self.key.is_some()
    }

    /// Encode sort-key values minted under `signature` into a token
    ///
    /// `values` holds one value per field of a [`SortSpec`], so at most
    /// [`MAX_SORT_FIELDS`]. Anything past that is not encoded, and the token
    /// then fails the arity check on the way back in.
    pub fn encode(&self, values: &[FieldValue], signature: SortSignature) -> CursorToken {
        let values = &values[..values.len().min(MAX_SORT_FIELDS)];
        // MAX_SORT_FIELDS fits the u16 count.
        let count = u16::try_from(values.len()).unwrap_or(u16::MAX);

        let mut buf = Vec::with_capacity(HEADER_LEN + values.len() * 9 + AUTH_TAG_LEN);
        buf.push(CURSOR_FORMAT_VERSION);
        buf.extend_from_slice(signature.as_bytes());
        buf.extend_from_slice(&count.to_be_bytes());

        for value in values {
            write_value(&mut buf, value);
        }

        let tag = self.auth_tag(&buf);
        buf.extend_from_slice(&tag);

        CursorToken::new(BASE64_URL_SAFE_NO_PAD.encode(&buf))
    }

    /// Decode a token without checking which ordering it belongs to
    ///
    /// The token may include surrounding whitespace, which is trimmed.
    pub fn decode(&self, token: &str) -> std::result::Result<Cursor, CursorDecodeError> {
        let token = token.trim();

        if token.is_empty() {
            return Err(CursorDecodeError::Empty);
        }

        if token.len() > MAX_CURSOR_TOKEN_LEN {
            return Err(CursorDecodeError::TooLong {
                len: token.len(),
                max: MAX_CURSOR_TOKEN_LEN,
            });
        }

        let bytes = BASE64_URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| CursorDecodeError::InvalidEncoding)?;

        if bytes.len() < HEADER_LEN + AUTH_TAG_LEN {
            return Err(CursorDecodeError::Truncated);
        }

        let (body, tag) = bytes.split_at(bytes.len() - AUTH_TAG_LEN);
        if !constant_time_eq(&self.auth_tag(body), tag) {
            return Err(CursorDecodeError::ChecksumMismatch);
        }

        let mut reader = Reader::new(body);

        let version = reader.u8()?;
        if version != CURSOR_FORMAT_VERSION {
            return Err(CursorDecodeError::UnsupportedVersion(version));
        }

        let mut signature = [0_u8; SIGNATURE_LEN];
        signature.copy_from_slice(reader.take(SIGNATURE_LEN)?);

        let count = usize::from(reader.u16()?);
        if count > MAX_SORT_FIELDS {
            return Err(CursorDecodeError::TooManyFields(count));
        }
        let mut values = Vec::with_capacity(count.min(body.len()));
        for _ in 0..count {
            values.push(read_value(&mut reader)?);
        }

        if reader.remaining() > 0 {
            return Err(CursorDecodeError::TrailingBytes(reader.remaining()));
        }

        Ok(Cursor::new(
            version,
            SortSignature::from_bytes(signature),
            values,
        ))
    }

    /// Decode a token and check it against the request's sort specification
    ///
    /// # Errors
    ///
    /// - [`PaginationError::InvalidCursor`](crate::PaginationError) for
    ///   malformed tokens or a field count that does not match `spec`
    /// - [`PaginationError::CursorSortMismatch`](crate::PaginationError) when
    ///   the token was minted under another ordering
    pub fn decode_for(&self, token: &str, spec: &SortSpec) -> Result<Cursor> {
        let cursor = self.decode(token)?;
        ConsistencyGuard::check(&cursor, spec)?;
        Ok(cursor)
    }

    fn auth_tag(&self, body: &[u8]) -> [u8; AUTH_TAG_LEN] {
        let hash = match &self.key {
            Some(key) => blake3::keyed_hash(key, body),
            None => blake3::hash(body),
        };
        let mut tag = [0_u8; AUTH_TAG_LEN];
        tag.copy_from_slice(&hash.as_bytes()[..AUTH_TAG_LEN]);
        tag
    }
}

impl fmt::Debug for CursorCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CursorCodec")
            .field("keyed", &self.is_keyed())
            .finish()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn write_value(buf: &mut Vec<u8>, value: &FieldValue) {
    buf.push(value.type_tag());

    match value {
        FieldValue::Null => {}
        FieldValue::Bool(b) => buf.push(u8::from(*b)),
        FieldValue::Int(n) => buf.extend_from_slice(&n.to_be_bytes()),
        FieldValue::UInt(n) => buf.extend_from_slice(&n.to_be_bytes()),
        FieldValue::Float(n) => buf.extend_from_slice(&n.to_bits().to_be_bytes()),
        FieldValue::Text(s) => write_len_prefixed(buf, s.as_bytes()),
        FieldValue::Bytes(b) => write_len_prefixed(buf, b),
        FieldValue::Timestamp(ts) => {
            buf.extend_from_slice(&ts.timestamp().to_be_bytes());
            buf.extend_from_slice(&ts.timestamp_subsec_nanos().to_be_bytes());
        }
        FieldValue::Uuid(id) => buf.extend_from_slice(id.as_bytes()),
    }
}

fn write_len_prefixed(buf: &mut Vec<u8>, data: &[u8]) {
    buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
    buf.extend_from_slice(data);
}

fn read_value(reader: &mut Reader<'_>) -> std::result::Result<FieldValue, CursorDecodeError> {
    let tag = reader.u8()?;

    let value = match tag {
        0 => FieldValue::Null,
        1 => match reader.u8()? {
            0 => FieldValue::Bool(false),
            1 => FieldValue::Bool(true),
            // Only 0 and 1 are ever written; anything else is tampering.
            _ => return Err(CursorDecodeError::InvalidEncoding),
        },
        2 => FieldValue::Int(i64::from_be_bytes(reader.array()?)),
        3 => FieldValue::UInt(u64::from_be_bytes(reader.array()?)),
        4 => FieldValue::Float(f64::from_bits(u64::from_be_bytes(reader.array()?))),
        5 => {
            let data = reader.len_prefixed()?;
            let Ok(text) = std::str::from_utf8(data) else {
                return Err(CursorDecodeError::InvalidUtf8);
            };
            FieldValue::Text(text.to_string())
        }
        6 => FieldValue::Bytes(reader.len_prefixed()?.to_vec()),
        7 => {
            let secs = i64::from_be_bytes(reader.array()?);
            let nanos = u32::from_be_bytes(reader.array()?);
            let ts = DateTime::from_timestamp(secs, nanos)
                .ok_or(CursorDecodeError::InvalidTimestamp)?;
            FieldValue::Timestamp(ts)
        }
        8 => FieldValue::Uuid(Uuid::from_bytes(reader.array()?)),
        other => return Err(CursorDecodeError::UnknownTypeTag(other)),
    };

    Ok(value)
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize) -> std::result::Result<&'a [u8], CursorDecodeError> {
        if self.remaining() < len {
            return Err(CursorDecodeError::Truncated);
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> std::result::Result<[u8; N], CursorDecodeError> {
        let mut out = [0_u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> std::result::Result<u8, CursorDecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> std::result::Result<u16, CursorDecodeError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    fn len_prefixed(&mut self) -> std::result::Result<&'a [u8], CursorDecodeError> {
        let len = u32::from_be_bytes(self.array()?) as usize;
        self.take(len)
    }
}
