//! Offset (skip/limit) pagination
//!
//! Pages are addressed by number, so page `n` is whatever currently sits at
//! positions `(n - 1) * limit ..`. A write ahead of that range between two
//! requests shifts it: rows can be repeated or skipped across pages. Callers
//! needing stable traversal under writes should use keyset pagination.

use crate::error::{PaginationError, Result};
use crate::filter::FilterCondition;
use crate::sort::SortSpec;
use crate::source::{PageSource, Position, RangeQuery};
use crate::window::Window;

/// Skip/limit window fetching with a capped skip depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetPager {
    max_skip_depth: u64,
}

impl OffsetPager {
    pub fn new(max_skip_depth: u64) -> Self {
        Self { max_skip_depth }
    }

    pub fn max_skip_depth(&self) -> u64 {
        self.max_skip_depth
    }

    /// Rows to skip for `page`, checked against the depth cap
    ///
    /// # Errors
    ///
    /// [`PaginationError::InvalidPage`] for `page < 1`,
    /// [`PaginationError::MaxOffsetExceeded`] when the skip is past the cap
    /// or does not fit in a `u64`.
    pub fn skip_for(&self, page: i64, limit: usize) -> Result<u64> {
        if page < 1 {
            return Err(PaginationError::InvalidPage { page });
        }

        // page >= 1, so the conversion cannot fail.
        let preceding = u64::try_from(page - 1).unwrap_or(u64::MAX);
        let skip = preceding
            .checked_mul(limit as u64)
            .unwrap_or(u64::MAX);

        if skip > self.max_skip_depth {
            return Err(PaginationError::MaxOffsetExceeded {
                skip,
                max: self.max_skip_depth,
            });
        }
        Ok(skip)
    }

    /// Fetch page number `page` (1-based)
    ///
    /// Validation happens before the collaborator is called; on success
    /// exactly one query for `limit + 1` rows is issued.
    pub async fn fetch<R, S>(
        &self,
        source: &S,
        sort: &SortSpec,
        page: i64,
        limit: usize,
        filters: &[FilterCondition],
    ) -> Result<Window<R>>
    where
        S: PageSource<R> + ?Sized,
    {
        let skip = self.skip_for(page, limit)?;

        let rows = source
            .fetch(RangeQuery {
                sort,
                filters,
                position: Position::Skip(skip),
                limit: Window::<R>::fetch_size(limit),
            })
            .await?;

        tracing::debug!(
            page,
            skip,
            returned = rows.len(),
            limit,
            "Offset query returned"
        );

        Ok(Window::from_lookahead(rows, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use serde_json::{json, Value};

    fn ids(rows: &[Value]) -> Vec<i64> {
        rows.iter().map(|r| r["id"].as_i64().unwrap()).collect()
    }

    #[test]
    fn test_skip_for() {
        let pager = OffsetPager::new(100);
        assert_eq!(pager.skip_for(1, 20).unwrap(), 0);
        assert_eq!(pager.skip_for(6, 20).unwrap(), 100);
        assert!(matches!(
            pager.skip_for(7, 20),
            Err(PaginationError::MaxOffsetExceeded {
                skip: 120,
                max: 100
            })
        ));
    }

    #[test]
    fn test_invalid_page_numbers() {
        let pager = OffsetPager::new(100);
        assert!(matches!(
            pager.skip_for(0, 10),
            Err(PaginationError::InvalidPage { page: 0 })
        ));
        assert!(matches!(
            pager.skip_for(-3, 10),
            Err(PaginationError::InvalidPage { page: -3 })
        ));
    }

    #[test]
    fn test_overflowing_skip_is_capped() {
        let pager = OffsetPager::new(u64::MAX - 1);
        assert!(matches!(
            pager.skip_for(i64::MAX, usize::MAX),
            Err(PaginationError::MaxOffsetExceeded { skip: u64::MAX, .. })
        ));
    }

    #[tokio::test]
    async fn test_pages_and_termination() {
        let source = MemorySource::new((1..=5).map(|id| json!({"id": id})).collect::<Vec<_>>());
        let sort = SortSpec::by_key("id").unwrap();
        let pager = OffsetPager::new(1000);

        let second = pager.fetch(&source, &sort, 2, 2, &[]).await.unwrap();
        assert_eq!(ids(&second.rows), vec![3, 4]);
        assert!(second.has_more);

        let third = pager.fetch(&source, &sort, 3, 2, &[]).await.unwrap();
        assert_eq!(ids(&third.rows), vec![5]);
        assert!(!third.has_more);

        let past_end = pager.fetch(&source, &sort, 9, 2, &[]).await.unwrap();
        assert!(past_end.rows.is_empty());
        assert!(!past_end.has_more);
    }

    #[tokio::test]
    async fn test_depth_cap_checked_before_storage() {
        let source: MemorySource<Value> = MemorySource::default();
        let operation = crate::source::SourceOperation::Skip;
        let failure = crate::source::SourceError::connection_failed(operation, "unreachable");
        source.set_failure(Some(failure));
        let sort = SortSpec::by_key("id").unwrap();
        let err = OffsetPager::new(10)
            .fetch(&source, &sort, 3, 10, &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PaginationError::MaxOffsetExceeded { skip: 20, max: 10 }
        ));
    }
}
