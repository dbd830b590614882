//! Storage collaborator error types
//!
//! Collaborators report failures as [`SourceError`]. The engine wraps them in
//! [`PaginationError::UpstreamQueryFailed`](crate::PaginationError) without
//! changing their kind, so callers can still decide whether to retry.
//!
//! # Example
//!
//! ```rust
//! use seekpage::source::{SourceError, SourceErrorKind, SourceOperation};
//!
//! let error = SourceError::connection_failed(SourceOperation::Range, "connection reset");
//! assert!(matches!(error.kind, SourceErrorKind::ConnectionFailed));
//! assert!(error.is_retriable());
//! ```

use std::fmt;

/// Collaborator operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceOperation {
    /// Ordered range query (keyset seek or first page)
    Range,
    /// Ordered skip/limit query
    Skip,
    /// Count query
    Count,
}

impl fmt::Display for SourceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range => write!(f, "range"),
            Self::Skip => write!(f, "skip"),
            Self::Count => write!(f, "count"),
        }
    }
}

/// Category of collaborator error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceErrorKind {
    /// Failed to reach the backing store
    ConnectionFailed,
    /// The store's own timeout fired
    Timeout,
    /// The query was rejected or failed to execute
    QueryFailed,
    /// A returned row is missing a sort field or cannot be read
    MalformedRow,
    /// The caller may not read this collection
    PermissionDenied,
    /// Other unclassified error
    Other,
}

impl fmt::Display for SourceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::QueryFailed => write!(f, "query_failed"),
            Self::MalformedRow => write!(f, "malformed_row"),
            Self::PermissionDenied => write!(f, "permission_denied"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured collaborator error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    /// The operation being performed when the error occurred
    pub operation: SourceOperation,
    /// The category of error
    pub kind: SourceErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Additional context (e.g., collection name, field name)
    pub context: Option<String>,
}

impl SourceError {
    /// Create a new collaborator error
    pub fn new(
        operation: SourceOperation,
        kind: SourceErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            context: None,
        }
    }

    /// Create a connection failed error
    pub fn connection_failed(operation: SourceOperation, message: impl Into<String>) -> Self {
        Self::new(operation, SourceErrorKind::ConnectionFailed, message)
    }

    /// Create a query failed error
    pub fn query_failed(operation: SourceOperation, message: impl Into<String>) -> Self {
        Self::new(operation, SourceErrorKind::QueryFailed, message)
    }

    /// Create a timeout error
    pub fn timeout(operation: SourceOperation, message: impl Into<String>) -> Self {
        Self::new(operation, SourceErrorKind::Timeout, message)
    }

    /// Create a malformed row error naming the unreadable field
    pub fn malformed_row(operation: SourceOperation, field: impl Into<String>) -> Self {
        Self::new(
            operation,
            SourceErrorKind::MalformedRow,
            "Row is missing a sort field",
        )
        .with_context(field)
    }

    /// Attach context to an existing error
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: SourceOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    ///
    /// The engine never retries; this is a hint for callers.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            SourceErrorKind::ConnectionFailed | SourceErrorKind::Timeout
        )
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Source {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let Some(ref context) = self.context {
            write!(f, " [{}]", context)?;
        }
        Ok(())
    }
}

impl std::error::Error for SourceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_operation_display() {
        assert_eq!(format!("{}", SourceOperation::Range), "range");
        assert_eq!(format!("{}", SourceOperation::Skip), "skip");
        assert_eq!(format!("{}", SourceOperation::Count), "count");
    }

    #[test]
    fn test_source_error_kind_display() {
        assert_eq!(
            format!("{}", SourceErrorKind::ConnectionFailed),
            "connection_failed"
        );
        assert_eq!(
            format!("{}", SourceErrorKind::MalformedRow),
            "malformed_row"
        );
        assert_eq!(format!("{}", SourceErrorKind::Other), "other");
    }

    #[test]
    fn test_malformed_row_carries_field() {
        let error = SourceError::malformed_row(SourceOperation::Range, "created_at");
        assert_eq!(error.kind, SourceErrorKind::MalformedRow);
        assert_eq!(error.context, Some("created_at".to_string()));
        assert!(error.to_string().ends_with("[created_at]"));
    }

    #[test]
    fn test_with_operation() {
        let error = SourceError::query_failed(SourceOperation::Range, "syntax error")
            .with_operation(SourceOperation::Skip);
        assert_eq!(error.operation, SourceOperation::Skip);
    }

    #[test]
    fn test_is_retriable() {
        let reset = SourceError::connection_failed(SourceOperation::Range, "reset");
        let slow = SourceError::timeout(SourceOperation::Count, "slow");
        let bad = SourceError::query_failed(SourceOperation::Range, "bad");
        let malformed = SourceError::malformed_row(SourceOperation::Skip, "id");

        assert!(reset.is_retriable());
        assert!(slow.is_retriable());
        assert!(!bad.is_retriable());
        assert!(!malformed.is_retriable());
    }

    #[test]
    fn test_display_without_context() {
        let error = SourceError::query_failed(SourceOperation::Skip, "Query failed");
        let display = format!("{}", error);
        assert_eq!(
            display,
            "Source query_failed error during skip: Query failed"
        );
    }

    #[test]
    fn test_error_is_error_trait() {
        let source = SourceError::connection_failed(SourceOperation::Range, "down");
        let error: Box<dyn std::error::Error> = Box::new(source);
        assert!(error.to_string().contains("connection_failed"));
    }
}
