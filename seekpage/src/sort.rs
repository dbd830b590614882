//! Sort specifications and their signatures
//!
//! A [`SortSpec`] is the ordering a page request is served in. It is always a
//! total order: construction normalizes the caller's fields so that the list
//! ends with the collection's unique, not-null key (the tiebreaker). Because
//! the tiebreaker is injected here, the pagers never need a special case for
//! "ordering with ties".
//!
//! # Example
//!
//! ```rust
//! use seekpage::{SortDirection, SortField, SortSpec};
//!
//! // Caller sorts by creation time only; the unique "id" is appended.
//! let spec = SortSpec::new(vec![SortField::desc("created_at")], "id").unwrap();
//! assert_eq!(spec.len(), 2);
//! assert_eq!(spec.fields()[1].name(), "id");
//! assert_eq!(spec.fields()[1].direction(), SortDirection::Ascending);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PaginationError, Result};
use crate::value::FieldValue;

/// Width of a sort signature in bytes
pub const SIGNATURE_LEN: usize = 16;

// Bumped whenever the canonical signature input changes.
/// Most fields a sort specification may hold, unique key included
pub const MAX_SORT_FIELDS: usize = 64;

const SIGNATURE_DOMAIN: &str = "seekpage.sort-signature.v1";

/// Direction for ordering results
///
/// # Example
///
/// ```rust
/// use seekpage::SortDirection;
///
/// assert_eq!(format!("{}", SortDirection::Ascending), "asc");
/// assert_eq!(format!("{}", SortDirection::Descending), "desc");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    #[serde(alias = "asc")]
    Ascending,
    /// Sort in descending order (Z-A, 9-0)
    #[serde(alias = "desc")]
    Descending,
}

impl SortDirection {
    /// Apply this direction to an ascending comparison result
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

impl FromStr for SortDirection {
    type Err = PaginationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            other => Err(PaginationError::InvalidSortSpec(format!(
                "unknown sort direction '{}'",
                other
            ))),
        }
    }
}

/// A single `(field, direction)` entry of a sort specification
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortField {
    name: String,
    #[serde(default)]
    direction: SortDirection,
}

impl SortField {
    /// Create a sort field
    pub fn new(name: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            name: name.into(),
            direction,
        }
    }

    /// Ascending sort on `name`
    pub fn asc(name: impl Into<String>) -> Self {
        Self::new(name, SortDirection::Ascending)
    }

    /// Descending sort on `name`
    pub fn desc(name: impl Into<String>) -> Self {
        Self::new(name, SortDirection::Descending)
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sort direction
    pub fn direction(&self) -> SortDirection {
        self.direction
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.direction)
    }
}

impl FromStr for SortField {
    type Err = PaginationError;

    /// Parse `name` or `name:asc` / `name:desc`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once(':') {
            Some((name, direction)) => Ok(Self::new(name.trim(), direction.trim().parse()?)),
            None => Ok(Self::asc(s)),
        }
    }
}

/// Fixed-width hash identifying a normalized sort specification
///
/// Embedded in every cursor so a cursor minted under one ordering cannot be
/// replayed against another.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortSignature([u8; SIGNATURE_LEN]);

impl SortSignature {
    /// Wrap raw signature bytes
    pub const fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw signature bytes
    pub const fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }
}

impl fmt::Display for SortSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for SortSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SortSignature({})", self)
    }
}

/// Validate that a field name is a plain (optionally dotted) identifier
///
/// Sort fields are forwarded to storage collaborators that may splice them
/// into query text, so anything beyond `[A-Za-z_][A-Za-z0-9_.]*` is rejected.
pub fn validate_field_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_head = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');

    if valid_head && valid_tail && !name.ends_with('.') && !name.contains("..") {
        Ok(())
    } else {
        Err(PaginationError::InvalidSortSpec(format!(
            "invalid field name '{}'",
            name
        )))
    }
}

/// A normalized, totally ordered sort specification
///
/// Invariants upheld by construction:
/// - at least one field
/// - no duplicate field names
/// - the last field is the unique key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortSpec {
    fields: Vec<SortField>,
    signature: SortSignature,
}

impl SortSpec {
    /// Build a sort specification terminated by `unique_key`
    ///
    /// If `unique_key` is missing from `fields` it is appended ascending. If
    /// it appears before the end, the fields after it are dropped: they can
    /// never influence an order that is already total.
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError::InvalidSortSpec`] for invalid or duplicate
    /// field names, or when the normalized spec would exceed
    /// [`MAX_SORT_FIELDS`].
    pub fn new(fields: Vec<SortField>, unique_key: impl Into<String>) -> Result<Self> {
        let unique_key = unique_key.into();
        validate_field_name(&unique_key)?;

        let mut normalized: Vec<SortField> = Vec::with_capacity(fields.len() + 1);
        for field in fields {
            validate_field_name(field.name())?;
            if normalized.iter().any(|f| f.name == field.name) {
                return Err(PaginationError::InvalidSortSpec(format!(
                    "field '{}' appears more than once",
                    field.name
                )));
            }
            let is_key = field.name == unique_key;
            normalized.push(field);
            if is_key {
                break;
            }
        }

        if normalized.last().map(|f| f.name.as_str()) != Some(unique_key.as_str()) {
            normalized.push(SortField::asc(unique_key));
        }

        if normalized.len() > MAX_SORT_FIELDS {
            return Err(PaginationError::InvalidSortSpec(format!(
                "{} fields exceeds the maximum of {}",
                normalized.len(),
                MAX_SORT_FIELDS
            )));
        }

        let signature = compute_signature(&normalized);
        Ok(Self {
            fields: normalized,
            signature,
        })
    }

    /// Sort by the unique key alone
    pub fn by_key(unique_key: impl Into<String>) -> Result<Self> {
        Self::new(Vec::new(), unique_key)
    }

    /// Parse a comma separated list such as `"created_at:desc,name"`
    pub fn parse(spec: &str, unique_key: impl Into<String>) -> Result<Self> {
        let fields = spec
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(SortField::from_str)
            .collect::<Result<Vec<_>>>()?;
        Self::new(fields, unique_key)
    }

    /// The normalized fields, tiebreaker last
    pub fn fields(&self) -> &[SortField] {
        &self.fields
    }

    /// Number of fields, which is also the arity of this ordering's cursors
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false; a normalized spec holds at least the unique key
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The tiebreaker field
    pub fn unique_key(&self) -> &SortField {
        // Non-empty by construction.
        &self.fields[self.fields.len() - 1]
    }

    /// Signature identifying this ordering
    pub fn signature(&self) -> SortSignature {
        self.signature
    }

    /// Compare two sort keys (one value per field) under this ordering
    ///
    /// Each field's direction flips the comparison sense for that field; the
    /// first non-equal field decides.
    pub fn compare_keys(&self, left: &[FieldValue], right: &[FieldValue]) -> Ordering {
        self.fields
            .iter()
            .zip(left.iter().zip(right))
            .map(|(field, (l, r))| field.direction.apply(l.cmp(r)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.fields.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}

fn compute_signature(fields: &[SortField]) -> SortSignature {
    let mut hasher = blake3::Hasher::new();
    hasher.update(SIGNATURE_DOMAIN.as_bytes());

    for field in fields {
        hasher.update(&(field.name.len() as u32).to_be_bytes());
        hasher.update(field.name.as_bytes());
        hasher.update(&[match field.direction {
            SortDirection::Ascending => 0,
            SortDirection::Descending => 1,
        }]);
    }

    let hash = hasher.finalize();
    let mut out = [0_u8; SIGNATURE_LEN];
    out.copy_from_slice(&hash.as_bytes()[..SIGNATURE_LEN]);
    SortSignature(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_direction_display() {
        assert_eq!(format!("{}", SortDirection::Ascending), "asc");
        assert_eq!(format!("{}", SortDirection::Descending), "desc");
    }

    #[test]
    fn test_sort_direction_default() {
        assert_eq!(SortDirection::default(), SortDirection::Ascending);
    }

    #[test]
    fn test_sort_direction_parse() {
        let parse = |s: &str| s.parse::<SortDirection>();
        assert_eq!(parse("DESC").unwrap(), SortDirection::Descending);
        assert_eq!(parse("ascending").unwrap(), SortDirection::Ascending);
        assert!(parse("sideways").is_err());
    }

    #[test]
    fn test_tiebreaker_appended_when_missing() {
        let spec = SortSpec::new(vec![SortField::asc("a"), SortField::desc("b")], "id").unwrap();
        let names: Vec<&str> = spec.fields().iter().map(SortField::name).collect();
        assert_eq!(names, vec!["a", "b", "id"]);
        assert_eq!(spec.unique_key().direction(), SortDirection::Ascending);
    }

    #[test]
    fn test_declared_tiebreaker_keeps_its_direction() {
        let spec = SortSpec::new(vec![SortField::asc("a"), SortField::desc("id")], "id").unwrap();
        assert_eq!(spec.len(), 2);
        assert_eq!(spec.unique_key().direction(), SortDirection::Descending);
    }

    #[test]
    fn test_fields_after_unique_key_are_dropped() {
        let spec = SortSpec::new(
            vec![SortField::asc("id"), SortField::desc("created_at")],
            "id",
        )
        .unwrap();
        assert_eq!(spec.len(), 1);
        assert_eq!(spec, SortSpec::by_key("id").unwrap());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = SortSpec::new(vec![SortField::asc("a"), SortField::desc("a")], "id").unwrap_err();
        assert!(matches!(err, PaginationError::InvalidSortSpec(_)));
    }

    #[test]
    fn test_field_count_is_capped() {
        let fields = |n: usize| (0..n).map(|i| SortField::asc(format!("f{i}"))).collect::<Vec<_>>();

        let at_cap = SortSpec::new(fields(MAX_SORT_FIELDS - 1), "id").unwrap();
        assert_eq!(at_cap.len(), MAX_SORT_FIELDS);

        let err = SortSpec::new(fields(MAX_SORT_FIELDS), "id").unwrap_err();
        assert!(matches!(err, PaginationError::InvalidSortSpec(_)));
    }

    #[test]
    fn test_invalid_field_names_rejected() {
        assert!(validate_field_name("created_at").is_ok());
        assert!(validate_field_name("users.created_at").is_ok());
        assert!(validate_field_name("").is_err());
        assert!(validate_field_name("1abc").is_err());
        assert!(validate_field_name("name; DROP TABLE users").is_err());
        assert!(validate_field_name("a..b").is_err());
        assert!(SortSpec::by_key("id)").is_err());
    }

    #[test]
    fn test_parse() {
        let spec = SortSpec::parse("created_at:desc, name", "id").unwrap();
        assert_eq!(spec.to_string(), "created_at:desc,name:asc,id:asc");
    }

    #[test]
    fn test_signature_is_stable_and_direction_sensitive() {
        let a = SortSpec::parse("score:desc", "id").unwrap();
        let b = SortSpec::parse("score:desc", "id").unwrap();
        let c = SortSpec::parse("score:asc", "id").unwrap();
        assert_eq!(a.signature(), b.signature());
        assert_ne!(a.signature(), c.signature());
    }

    #[test]
    fn test_signature_distinguishes_field_boundaries() {
        let a = SortSpec::parse("ab,c", "id").unwrap();
        let b = SortSpec::parse("a,bc", "id").unwrap();
        assert_ne!(a.signature(), b.signature());
    }

    #[test]
    fn test_compare_keys_flips_descending_fields() {
        let spec = SortSpec::parse("a,b:desc", "id").unwrap();
        let cmp = |left: [i64; 3], right: [i64; 3]| {
            let left: Vec<FieldValue> = left.into_iter().map(FieldValue::Int).collect();
            let right: Vec<FieldValue> = right.into_iter().map(FieldValue::Int).collect();
            spec.compare_keys(&left, &right)
        };

        assert_eq!(cmp([1, 5, 1], [2, 0, 0]), Ordering::Less);
        assert_eq!(cmp([1, 5, 9], [1, 4, 0]), Ordering::Less);
        assert_eq!(cmp([1, 5, 1], [1, 5, 2]), Ordering::Less);
        assert_eq!(cmp([1, 5, 2], [1, 5, 2]), Ordering::Equal);
    }

    #[test]
    fn test_signature_display_is_hex() {
        let spec = SortSpec::by_key("id").unwrap();
        let hex = spec.signature().to_string();
        assert_eq!(hex.len(), SIGNATURE_LEN * 2);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
