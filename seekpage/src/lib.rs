//! # seekpage
//!
//! Deterministic pagination over ordered, mutating collections.
//!
//! ## Features
//!
//! - **Total ordering**: every [`SortSpec`] ends in a unique key, appended when missing
//! - **Keyset pagination**: pages start strictly after an opaque cursor, so concurrent inserts and deletes never shift later pages
//! - **Offset pagination**: numbered pages with a capped skip depth
//! - **N+1 windowing**: `has_more` without a count query
//! - **Signed cursors**: versioned, checksummed tokens bound to the ordering they were minted under
//! - **Optional totals**: exact, cached by a background refresher, or omitted
//! - **Deadlines**: every fetch is bounded; an expired query is dropped, never retried
//!
//! The engine never runs queries itself. A [`PageSource`] collaborator
//! executes ordered range queries against whatever store holds the rows.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use seekpage::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = PagerConfig::load()?;
//!     init_tracing(&config);
//!
//!     let source = MemorySource::new(vec![
//!         json!({"id": 1, "created_at": "2024-01-02"}),
//!         json!({"id": 2, "created_at": "2024-01-01"}),
//!     ]);
//!     let pager = Pager::new(Arc::new(source), config)?;
//!
//!     let sort = SortSpec::parse("created_at:desc", "id")?;
//!     let first = pager.paginate(PageRequest::keyset(sort.clone()).with_limit(1)).await?;
//!
//!     if let Some(cursor) = first.next_cursor() {
//!         let next = pager.paginate(PageRequest::after(sort, cursor.as_str())).await?;
//!         println!("{}", serde_json::to_string_pretty(&next).unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod count;
pub mod cursor;
pub mod error;
pub mod filter;
pub mod guard;
pub mod keyset;
pub mod observability;
pub mod offset;
pub mod pager;
pub mod request;
pub mod sort;
pub mod source;
pub mod value;
pub mod window;

pub use config::{CountMode, CursorSecret, PagerConfig};
pub use count::{CachedCount, CountEstimator, ExactCount, NoCount, TotalCount};
pub use cursor::{Cursor, CursorCodec, CursorDecodeError, CursorToken};
pub use error::{PaginationError, Result};
pub use filter::{FilterCondition, FilterOperator, FilterValue};
pub use guard::ConsistencyGuard;
pub use keyset::{KeysetPager, SeekPredicate};
pub use offset::OffsetPager;
pub use pager::{Pager, PagerState};
pub use request::{PageLinks, PageRequest, PageResult, Strategy};
pub use sort::{SortDirection, SortField, SortSignature, SortSpec};
pub use source::{MemorySource, PageSource, SortKey, SourceError, SourceErrorKind};
pub use value::FieldValue;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{CountMode, PagerConfig};
    pub use crate::count::{CountEstimator, TotalCount};
    pub use crate::cursor::{CursorCodec, CursorToken};
    pub use crate::error::{PaginationError, Result};
    pub use crate::filter::FilterCondition;
    pub use crate::observability::init_tracing;
    pub use crate::pager::Pager;
    pub use crate::request::{PageLinks, PageRequest, PageResult};
    pub use crate::sort::{SortDirection, SortField, SortSpec};
    pub use crate::source::{
        MemorySource, PageSource, Position, RangeQuery, SortKey, SourceError, SourceResult,
    };
    pub use crate::value::FieldValue;
}
