//! Error types for the pagination engine
//!
//! Every failure a page request can produce is a [`PaginationError`]. The
//! variants map one-to-one onto the engine's error taxonomy and each carries
//! a stable [`code`](PaginationError::code) so transports can translate them
//! without matching on display strings.

use std::time::Duration;

use thiserror::Error;

use crate::cursor::CursorDecodeError;
use crate::sort::SortSignature;
use crate::source::SourceError;

/// Result type alias using the engine error
pub type Result<T> = std::result::Result<T, PaginationError>;

/// Main error type for the pagination engine
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum PaginationError {
    /// Requested limit is outside `[1, max_limit]`
    #[error("Invalid limit {limit}: must be between 1 and {max}")]
    InvalidLimit {
        /// The limit as supplied by the caller
        limit: i64,
        /// Configured maximum
        max: u32,
    },

    /// Requested page number is below 1
    #[error("Invalid page {page}: page numbers start at 1")]
    InvalidPage {
        /// The page number as supplied by the caller
        page: i64,
    },

    /// Cursor token could not be decoded
    #[error("Invalid cursor: {0}")]
    InvalidCursor(#[from] CursorDecodeError),

    /// Cursor was minted for a different sort specification
    #[error("Cursor was issued for ordering {found}, request uses {expected}")]
    CursorSortMismatch {
        /// Signature of the request's sort specification
        expected: SortSignature,
        /// Signature embedded in the cursor
        found: SortSignature,
    },

    /// Offset request would skip more rows than allowed
    #[error("Offset {skip} exceeds maximum skip depth {max}; use keyset paging")]
    MaxOffsetExceeded {
        /// Rows the request would skip (saturated on overflow)
        skip: u64,
        /// Configured maximum skip depth
        max: u64,
    },

    /// Storage collaborator failed; carries the original cause
    #[error("Upstream query failed: {0}")]
    UpstreamQueryFailed(#[source] SourceError),

    /// Deadline expired while the page was being fetched
    #[error("Page fetch timed out after {budget:?}")]
    Timeout {
        /// Time the fetch was allowed to take
        budget: Duration,
    },

    /// Sort specification could not be built
    #[error("Invalid sort specification: {0}")]
    InvalidSortSpec(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),
}

impl PaginationError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidLimit { .. } => "invalid_limit",
            Self::InvalidPage { .. } => "invalid_page",
            Self::InvalidCursor(_) => "invalid_cursor",
            Self::CursorSortMismatch { .. } => "cursor_sort_mismatch",
            Self::MaxOffsetExceeded { .. } => "max_offset_exceeded",
            Self::UpstreamQueryFailed(_) => "upstream_query_failed",
            Self::Timeout { .. } => "timeout",
            Self::InvalidSortSpec(_) => "invalid_sort_spec",
            Self::Config(_) => "config",
        }
    }

    /// True for errors raised before any storage call was made
    ///
    /// These are caused by the request itself and will fail again if the
    /// same request is repeated.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidLimit { .. }
                | Self::InvalidPage { .. }
                | Self::InvalidCursor(_)
                | Self::CursorSortMismatch { .. }
                | Self::MaxOffsetExceeded { .. }
                | Self::InvalidSortSpec(_)
        )
    }
}

impl PaginationError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::from(figment::Error::from(message.into()))
    }
}

impl From<figment::Error> for PaginationError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl From<SourceError> for PaginationError {
    fn from(err: SourceError) -> Self {
        Self::UpstreamQueryFailed(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SourceErrorKind, SourceOperation};

    #[test]
    fn test_error_codes() {
        assert_eq!(
            PaginationError::InvalidLimit { limit: 0, max: 100 }.code(),
            "invalid_limit"
        );
        assert_eq!(
            PaginationError::InvalidPage { page: 0 }.code(),
            "invalid_page"
        );
        assert_eq!(
            PaginationError::InvalidCursor(CursorDecodeError::Empty).code(),
            "invalid_cursor"
        );
        assert_eq!(
            PaginationError::Timeout {
                budget: Duration::from_millis(10)
            }
            .code(),
            "timeout"
        );
    }

    #[test]
    fn test_validation_classification() {
        assert!(PaginationError::InvalidPage { page: -1 }.is_validation());
        let too_deep = PaginationError::MaxOffsetExceeded { skip: 10, max: 5 };
        assert!(too_deep.is_validation());
        assert!(!PaginationError::Timeout {
            budget: Duration::from_secs(1)
        }
        .is_validation());
    }

    #[test]
    fn test_upstream_error_keeps_source() {
        let cause = SourceError::new(
            SourceOperation::Range,
            SourceErrorKind::ConnectionFailed,
            "connection reset",
        );
        let err = PaginationError::from(cause.clone());
        assert_eq!(err.code(), "upstream_query_failed");

        let source = std::error::Error::source(&err).expect("source should be kept");
        assert_eq!(source.to_string(), cause.to_string());
    }

    #[test]
    fn test_display_messages() {
        let err = PaginationError::InvalidLimit {
            limit: 500,
            max: 100,
        };
        assert_eq!(
            err.to_string(),
            "Invalid limit 500: must be between 1 and 100"
        );

        let err = PaginationError::MaxOffsetExceeded {
            skip: 20000,
            max: 10000,
        };
        assert!(err.to_string().contains("20000"));
    }
}
