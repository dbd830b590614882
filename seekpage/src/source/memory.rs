//! In-memory page source
//!
//! Holds rows in a shared vector and answers range queries by filtering,
//! sorting and slicing. Cloning a `MemorySource` shares the same rows, so a
//! test can mutate the collection between page requests and observe how each
//! strategy copes.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use super::{sort_key_of, PageSource, Position, RangeQuery, SortKey, SourceError, SourceResult};
use crate::filter::FilterCondition;
use crate::value::FieldValue;

#[derive(Debug)]
struct Inner<R> {
    rows: Vec<R>,
    latency: Option<Duration>,
    failure: Option<SourceError>,
}

/// Shared in-memory collection
#[derive(Debug)]
pub struct MemorySource<R> {
    inner: Arc<RwLock<Inner<R>>>,
}

impl<R> Clone for MemorySource<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> Default for MemorySource<R> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<R> MemorySource<R> {
    /// Create a source over `rows` (any order)
    pub fn new(rows: Vec<R>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                rows,
                latency: None,
                failure: None,
            })),
        }
    }

    /// Delay every query by `latency`
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.write(|inner| inner.latency = Some(latency));
        self
    }

    /// Make every subsequent query fail with `failure` (or succeed again with `None`)
    pub fn set_failure(&self, failure: Option<SourceError>) {
        self.write(|inner| inner.failure = failure);
    }

    /// Add a row
    pub fn insert(&self, row: R) {
        self.write(|inner| inner.rows.push(row));
    }

    /// Remove every row matching `predicate`, returning how many were removed
    pub fn remove_where(&self, predicate: impl Fn(&R) -> bool) -> usize {
        self.write(|inner| {
            let before = inner.rows.len();
            inner.rows.retain(|row| !predicate(row));
            before - inner.rows.len()
        })
    }

    /// Number of rows currently held
    pub fn len(&self) -> usize {
        self.read(|inner| inner.rows.len())
    }

    /// Whether the source holds no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave the rows half-updated, so
    // a poisoned lock is recovered rather than propagated.
    fn read<T>(&self, f: impl FnOnce(&Inner<R>) -> T) -> T {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Inner<R>) -> T) -> T {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    fn latency(&self) -> Option<Duration> {
        self.read(|inner| inner.latency)
    }
}

fn passes_filters<R: SortKey>(row: &R, filters: &[FilterCondition]) -> bool {
    filters
        .iter()
        .all(|filter| filter.matches(row.sort_value(&filter.field).as_ref()))
}

impl<R> PageSource<R> for MemorySource<R>
where
    R: SortKey + Clone + Send + Sync,
{
    async fn fetch(&self, query: RangeQuery<'_>) -> SourceResult<Vec<R>> {
        if let Some(latency) = self.latency() {
            tokio::time::sleep(latency).await;
        }

        let operation = query.position.operation();

        self.read(|inner| {
            if let Some(failure) = &inner.failure {
                return Err(failure.clone().with_operation(operation));
            }

            let mut keyed: Vec<(Vec<FieldValue>, &R)> = Vec::with_capacity(inner.rows.len());
            for row in &inner.rows {
                if !passes_filters(row, query.filters) {
                    continue;
                }
                let key = sort_key_of(row, query.sort, operation)?;
                if let Position::After(seek) = query.position {
                    if !seek.matches_key(&key) {
                        continue;
                    }
                }
                keyed.push((key, row));
            }

            keyed.sort_by(|(a, _), (b, _)| query.sort.compare_keys(a, b));

            let skip = match query.position {
                Position::Skip(skip) => usize::try_from(skip).unwrap_or(usize::MAX),
                Position::Start | Position::After(_) => 0,
            };

            Ok(keyed
                .into_iter()
                .skip(skip)
                .take(query.limit)
                .map(|(_, row)| row.clone())
                .collect())
        })
    }

    async fn count(&self, filters: &[FilterCondition]) -> SourceResult<u64> {
        if let Some(latency) = self.latency() {
            tokio::time::sleep(latency).await;
        }

        let operation = super::SourceOperation::Count;
        self.read(|inner| {
            if let Some(failure) = &inner.failure {
                return Err(failure.clone().with_operation(operation));
            }
            Ok(inner
                .rows
                .iter()
                .filter(|row| passes_filters(*row, filters))
                .count() as u64)
        })
    }
}
