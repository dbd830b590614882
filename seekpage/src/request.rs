//! Page requests and results
//!
//! # Example
//!
//! ```rust
//! use seekpage::{FilterCondition, PageRequest, SortSpec};
//!
//! let sort = SortSpec::parse("created_at:desc", "id").unwrap();
//!
//! // First keyset page of 25 active users, with a total
//! let request = PageRequest::keyset(sort.clone())
//!     .with_limit(25)
//!     .with_filter(FilterCondition::eq("status", "active"))
//!     .with_count();
//! assert!(request.include_count);
//!
//! // Third offset page with the configured default size
//! let request = PageRequest::offset(sort, 3);
//! assert_eq!(request.limit, None);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::count::TotalCount;
use crate::cursor::CursorToken;
use crate::filter::FilterCondition;
use crate::sort::SortSpec;

/// Pagination strategy and position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Page number, 1-based
    Offset { page: i64 },
    /// Continuation token from a previous result; `None` for the first page
    Keyset { cursor: Option<String> },
}

/// A request for one page
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub strategy: Strategy,
    /// Page size; `None` uses the configured default
    pub limit: Option<i64>,
    pub sort: SortSpec,
    pub filters: Vec<FilterCondition>,
    /// Ask the count estimator for a total
    pub include_count: bool,
    /// Point after which the fetch is abandoned; `None` uses the configured timeout
    pub deadline: Option<Instant>,
}

impl PageRequest {
    fn with_strategy(sort: SortSpec, strategy: Strategy) -> Self {
        Self {
            strategy,
            limit: None,
            sort,
            filters: Vec::new(),
            include_count: false,
            deadline: None,
        }
    }

    /// Offset request for page number `page`
    #[must_use]
    pub fn offset(sort: SortSpec, page: i64) -> Self {
        Self::with_strategy(sort, Strategy::Offset { page })
    }

    /// First keyset page
    #[must_use]
    pub fn keyset(sort: SortSpec) -> Self {
        Self::with_strategy(sort, Strategy::Keyset { cursor: None })
    }

    /// Keyset page continuing from `cursor`
    #[must_use]
    pub fn after(sort: SortSpec, cursor: impl Into<String>) -> Self {
        Self::with_strategy(
            sort,
            Strategy::Keyset {
                cursor: Some(cursor.into()),
            },
        )
    }

    #[must_use]
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: FilterCondition) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn with_filters(mut self, filters: Vec<FilterCondition>) -> Self {
        self.filters.extend(filters);
        self
    }

    /// Request a total count
    #[must_use]
    pub fn with_count(mut self) -> Self {
        self.include_count = true;
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline `timeout` from now
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }
}

/// Navigation from a page to its neighbours
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum PageLinks {
    Offset {
        page: u64,
        next_page: Option<u64>,
        previous_page: Option<u64>,
    },
    Keyset {
        /// Present iff more rows follow
        next_cursor: Option<CursorToken>,
    },
}

/// One page of rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<R> {
    pub items: Vec<R>,
    pub has_more: bool,
    pub limit: u32,
    pub links: PageLinks,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<TotalCount>,
}

impl<R> PageResult<R> {
    /// Cursor for the following keyset page
    pub fn next_cursor(&self) -> Option<&CursorToken> {
        match &self.links {
            PageLinks::Keyset { next_cursor } => next_cursor.as_ref(),
            PageLinks::Offset { .. } => None,
        }
    }

    /// Number of the following offset page
    pub fn next_page(&self) -> Option<u64> {
        match self.links {
            PageLinks::Offset { next_page, .. } => next_page,
            PageLinks::Keyset { .. } => None,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Convert every item, keeping links and counts
    pub fn map<T>(self, f: impl FnMut(R) -> T) -> PageResult<T> {
        PageResult {
            items: self.items.into_iter().map(f).collect(),
            has_more: self.has_more,
            limit: self.limit,
            links: self.links,
            total_count: self.total_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builders() {
        let sort = SortSpec::by_key("id").unwrap();
        let request = PageRequest::after(sort, "abc")
            .with_limit(5)
            .with_filters(vec![FilterCondition::is_not_null("name")])
            .with_timeout(Duration::from_secs(1));
        assert_eq!(
            request.strategy,
            Strategy::Keyset {
                cursor: Some("abc".to_string())
            }
        );
        assert_eq!(request.limit, Some(5));
        assert_eq!(request.filters.len(), 1);
        assert!(request.deadline.is_some());
        assert!(!request.include_count);
    }

    #[test]
    fn test_serialize_offset_result() {
        let result = PageResult {
            items: vec![1, 2],
            has_more: true,
            limit: 2,
            links: PageLinks::Offset {
                page: 1,
                next_page: Some(2),
                previous_page: None,
            },
            total_count: Some(TotalCount::exact(5)),
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "items": [1, 2],
                "has_more": true,
                "limit": 2,
                "links": {"strategy": "offset", "page": 1, "next_page": 2, "previous_page": null},
                "total_count": {"value": 5, "exact": true}
            })
        );
    }

    #[test]
    fn test_map_keeps_links() {
        let result = PageResult {
            items: vec![1, 2],
            has_more: false,
            limit: 10,
            links: PageLinks::Keyset { next_cursor: None },
            total_count: None,
        };
        let mapped = result.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20]);
        assert!(mapped.next_cursor().is_none());
        assert_eq!(mapped.next_page(), None);
        let value = serde_json::to_value(&mapped).unwrap();
        assert!(value.get("total_count").is_none());
    }
}
