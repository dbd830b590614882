//! Total-count estimation
//!
//! Counting a large collection can cost more than fetching a page, so the
//! engine treats totals as optional. A [`CountEstimator`] is consulted
//! alongside the row fetch and may answer exactly, from a periodically
//! refreshed snapshot, or not at all. Failures never fail the page: the total
//! is simply left out.

mod cached;

pub use cached::CachedCount;

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::CountMode;
use crate::error::Result;
use crate::filter::FilterCondition;
use crate::source::PageSource;

/// A total row count and whether it is exact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalCount {
    pub value: u64,
    /// False when the value comes from a cached snapshot
    pub exact: bool,
}

impl TotalCount {
    pub fn exact(value: u64) -> Self {
        Self { value, exact: true }
    }

    pub fn approximate(value: u64) -> Self {
        Self {
            value,
            exact: false,
        }
    }
}

/// Source of total counts for page results
#[async_trait]
pub trait CountEstimator: Send + Sync {
    /// Estimate the number of rows matching `filters`, or `None` when unavailable
    async fn estimate(&self, filters: &[FilterCondition]) -> Option<TotalCount>;
}

/// Counts by asking the storage collaborator on every request
pub struct ExactCount<S, R> {
    source: Arc<S>,
    _rows: PhantomData<fn() -> R>,
}

impl<S, R> ExactCount<S, R> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            _rows: PhantomData,
        }
    }
}

#[async_trait]
impl<S, R> CountEstimator for ExactCount<S, R>
where
    S: PageSource<R>,
{
    async fn estimate(&self, filters: &[FilterCondition]) -> Option<TotalCount> {
        match self.source.count(filters).await {
            Ok(value) => Some(TotalCount::exact(value)),
            Err(error) => {
                tracing::warn!(%error, "Exact count failed; omitting total");
                None
            }
        }
    }
}

/// Never reports a total
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCount;

#[async_trait]
impl CountEstimator for NoCount {
    async fn estimate(&self, _filters: &[FilterCondition]) -> Option<TotalCount> {
        None
    }
}

/// Build the estimator for a configured [`CountMode`]
///
/// [`CountMode::Cached`] spawns its refresher on the current tokio runtime
/// and counts the unfiltered collection every `refresh_interval`.
///
/// # Errors
///
/// [`PaginationError::Config`](crate::PaginationError::Config) for cached
/// mode outside a tokio runtime.
pub fn estimator_for<S, R>(
    mode: CountMode,
    source: Arc<S>,
    refresh_interval: Duration,
) -> Result<Arc<dyn CountEstimator>>
where
    S: PageSource<R> + 'static,
    R: 'static,
{
    let estimator: Arc<dyn CountEstimator> = match mode {
        CountMode::Exact => Arc::new(ExactCount::<S, R>::new(source)),
        CountMode::Cached => Arc::new(CachedCount::spawn::<S, R>(
            source,
            Vec::new(),
            refresh_interval,
        )?),
        CountMode::Omitted => Arc::new(NoCount),
    };
    Ok(estimator)
}
