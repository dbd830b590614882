//! Cursor/ordering consistency checks

use crate::cursor::{Cursor, CursorDecodeError};
use crate::error::{PaginationError, Result};
use crate::sort::{SortSignature, SortSpec};

/// Rejects cursors minted under a different ordering than the current request
///
/// A reconfigured sort and a stale or forged cursor are indistinguishable
/// here and both surface as [`PaginationError::CursorSortMismatch`].
pub struct ConsistencyGuard;

impl ConsistencyGuard {
    /// Compare a decoded signature with the current sort specification
    pub fn validate(decoded: SortSignature, current: &SortSpec) -> Result<()> {
        let expected = current.signature();
        if decoded != expected {
            tracing::debug!(
                %expected,
                found = %decoded,
                "Cursor signature does not match request ordering"
            );
            return Err(PaginationError::CursorSortMismatch {
                expected,
                found: decoded,
            });
        }
        Ok(())
    }

    /// Validate signature and arity of a decoded cursor
    pub fn check(cursor: &Cursor, current: &SortSpec) -> Result<()> {
        Self::validate(cursor.signature(), current)?;

        if cursor.arity() != current.len() {
            return Err(PaginationError::InvalidCursor(
                CursorDecodeError::ArityMismatch {
                    expected: current.len(),
                    found: cursor.arity(),
                },
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldValue;

    #[test]
    fn test_matching_signature_passes() {
        let spec = SortSpec::parse("name", "id").unwrap();
        let result = ConsistencyGuard::validate(spec.signature(), &spec);
        assert!(result.is_ok());
    }

    #[test]
    fn test_reconfigured_sort_is_rejected() {
        let old = SortSpec::parse("name", "id").unwrap();
        let new = SortSpec::parse("name:desc", "id").unwrap();
        let err = ConsistencyGuard::validate(old.signature(), &new).unwrap_err();
        assert!(matches!(err, PaginationError::CursorSortMismatch { .. }));
    }

    #[test]
    fn test_arity_mismatch_is_invalid_cursor() {
        let spec = SortSpec::parse("name", "id").unwrap();
        let cursor = Cursor::new(1, spec.signature(), vec![FieldValue::Int(1)]);
        let err = ConsistencyGuard::check(&cursor, &spec).unwrap_err();
        assert!(matches!(
            err,
            PaginationError::InvalidCursor(CursorDecodeError::ArityMismatch {
                expected: 2,
                found: 1
            })
        ));
    }
}
