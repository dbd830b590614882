//! Storage collaborator interface
//!
//! The engine never executes queries itself. It describes the window it
//! needs as a [`RangeQuery`] and hands it to a [`PageSource`], which runs it
//! against whatever store backs the collection and returns rows in SortSpec
//! order.
//!
//! # Overview
//!
//! - [`PageSource`]: ordered range queries and counts (RPITIT, no boxing)
//! - [`SortKey`]: how the engine reads sort-key values out of a row
//! - [`MemorySource`]: an in-memory collaborator for tests and tooling
//!
//! # Example
//!
//! ```rust,ignore
//! use seekpage::source::{PageSource, Position, RangeQuery, SourceResult};
//!
//! struct EventStore {
//!     pool: PgPool,
//! }
//!
//! impl PageSource<Event> for EventStore {
//!     async fn fetch(&self, query: RangeQuery<'_>) -> SourceResult<Vec<Event>> {
//!         let mut sql = String::from("SELECT * FROM events");
//!         let mut binds = Vec::new();
//!         if let Position::After(seek) = &query.position {
//!             let (clause, values) = seek.to_sql(1);
//!             sql.push_str(&format!(" WHERE {clause}"));
//!             binds = values;
//!         }
//!         // ORDER BY query.sort, LIMIT query.limit, OFFSET for Position::Skip
//!         todo!()
//!     }
//!
//!     async fn count(&self, filters: &[FilterCondition]) -> SourceResult<u64> {
//!         todo!()
//!     }
//! }
//! ```

mod error;
mod memory;

pub use error::{SourceError, SourceErrorKind, SourceOperation};
pub use memory::MemorySource;

use std::future::Future;

use crate::filter::FilterCondition;
use crate::keyset::SeekPredicate;
use crate::sort::SortSpec;
use crate::value::FieldValue;

/// Result type for collaborator operations
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Read access to a row's sort-key values
pub trait SortKey {
    /// The value of `field`, or `None` when the row has no such field
    fn sort_value(&self, field: &str) -> Option<FieldValue>;
}

impl SortKey for serde_json::Value {
    /// Looks up `field` in a JSON object; dotted names walk nested objects
    fn sort_value(&self, field: &str) -> Option<FieldValue> {
        field
            .split('.')
            .try_fold(self, |value, segment| value.get(segment))
            .map(FieldValue::from)
    }
}

/// Extract the full sort key of `row` under `sort`
///
/// # Errors
///
/// Returns a [`SourceErrorKind::MalformedRow`] error naming the first field
/// the row does not carry.
pub fn sort_key_of<R: SortKey + ?Sized>(
    row: &R,
    sort: &SortSpec,
    operation: SourceOperation,
) -> SourceResult<Vec<FieldValue>> {
    sort.fields()
        .iter()
        .map(|field| {
            row.sort_value(field.name())
                .ok_or_else(|| SourceError::malformed_row(operation, field.name()))
        })
        .collect()
}

/// Where in the ordered sequence a window starts
#[derive(Debug, Clone, Copy)]
pub enum Position<'a> {
    /// From the first row
    Start,
    /// Strictly after the row the predicate was built from
    After(&'a SeekPredicate),
    /// After skipping this many rows
    Skip(u64),
}

impl Position<'_> {
    /// The collaborator operation this position implies
    pub fn operation(&self) -> SourceOperation {
        match self {
            Self::Skip(_) => SourceOperation::Skip,
            Self::Start | Self::After(_) => SourceOperation::Range,
        }
    }
}

/// An ordered window request
#[derive(Debug, Clone, Copy)]
pub struct RangeQuery<'a> {
    /// Ordering the rows must be returned in
    pub sort: &'a SortSpec,
    /// Filters narrowing the collection
    pub filters: &'a [FilterCondition],
    /// Start of the window
    pub position: Position<'a>,
    /// Maximum rows to return (already includes the look-ahead row)
    pub limit: usize,
}

/// Storage collaborator executing ordered range queries
///
/// Implementations must return rows ordered by `query.sort` and no more than
/// `query.limit` of them. They must not retry internally on the engine's
/// behalf; the engine surfaces every error to its caller unchanged in kind.
pub trait PageSource<R>: Send + Sync {
    /// Fetch one ordered window
    fn fetch(&self, query: RangeQuery<'_>)
        -> impl Future<Output = SourceResult<Vec<R>>> + Send;

    /// Count rows matching `filters`
    fn count(&self, filters: &[FilterCondition])
        -> impl Future<Output = SourceResult<u64>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_sort_value() {
        let row = json!({"id": 3, "author": {"name": "ada"}});
        assert_eq!(row.sort_value("id"), Some(FieldValue::Int(3)));
        assert_eq!(row.sort_value("author.name"), Some(FieldValue::from("ada")));
        assert_eq!(row.sort_value("missing"), None);
    }

    #[test]
    fn test_sort_key_of_reports_missing_field() {
        let sort = SortSpec::parse("created_at", "id").unwrap();
        let row = json!({"id": 1});
        let err = sort_key_of(&row, &sort, SourceOperation::Range).unwrap_err();
        assert_eq!(err.kind, SourceErrorKind::MalformedRow);
        assert_eq!(err.context.as_deref(), Some("created_at"));
    }

    #[test]
    fn test_position_operation() {
        assert_eq!(Position::Start.operation(), SourceOperation::Range);
        assert_eq!(Position::Skip(10).operation(), SourceOperation::Skip);
    }
}
