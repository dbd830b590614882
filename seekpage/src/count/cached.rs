//! Cached total counts
//!
//! A refresher task owns the only writer of a `watch` channel and republishes
//! the count on a fixed interval. Page requests read the latest snapshot
//! without ever touching storage, so a slow count query can not slow pages
//! down. Readers always see a whole published value.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{CountEstimator, TotalCount};
use crate::error::{PaginationError, Result};
use crate::filter::FilterCondition;
use crate::source::PageSource;

const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(1);

/// Count estimator backed by a periodically refreshed snapshot
///
/// Only requests whose filters equal the refresher's filters are answered;
/// any other filter set gets no total, since the snapshot says nothing about
/// it.
///
/// Dropping the estimator cancels its refresher.
pub struct CachedCount {
    snapshot: watch::Receiver<Option<u64>>,
    filters: Vec<FilterCondition>,
    shutdown: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl CachedCount {
    /// Spawn a refresher counting rows matching `filters` every `interval`
    ///
    /// The first refresh starts immediately.
    ///
    /// # Errors
    ///
    /// [`PaginationError::Config`] when called outside a tokio runtime.
    pub fn spawn<S, R>(
        source: Arc<S>,
        filters: Vec<FilterCondition>,
        interval: Duration,
    ) -> Result<Self>
    where
        S: PageSource<R> + 'static,
        R: 'static,
    {
        Self::spawn_with_cancellation(source, filters, interval, CancellationToken::new())
    }

    /// Like [`spawn`](Self::spawn), stopping when `parent` is cancelled too
    pub fn spawn_with_cancellation<S, R>(
        source: Arc<S>,
        filters: Vec<FilterCondition>,
        interval: Duration,
        parent: CancellationToken,
    ) -> Result<Self>
    where
        S: PageSource<R> + 'static,
        R: 'static,
    {
        let runtime = Handle::try_current().map_err(|_| {
            PaginationError::config("cached counting needs a running tokio runtime")
        })?;

        let (tx, rx) = watch::channel(None);
        let shutdown = parent.child_token();

        let refresher = CountRefresher {
            source,
            filters: filters.clone(),
            interval,
            publisher: tx,
            shutdown: shutdown.clone(),
        };
        let handle = runtime.spawn(refresher.run::<R>());

        tracing::info!(interval = ?interval, "Count refresher started");

        Ok(Self {
            snapshot: rx,
            filters,
            shutdown,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// The last published count, if any refresh has succeeded yet
    pub fn current(&self) -> Option<u64> {
        *self.snapshot.borrow()
    }

    /// A receiver observing every published count
    pub fn subscribe(&self) -> watch::Receiver<Option<u64>> {
        self.snapshot.clone()
    }

    /// Whether the refresher task is still running
    pub fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled()
    }

    /// Stop the refresher and wait for it to exit
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(error) = handle.await {
                tracing::warn!(%error, "Count refresher ended abnormally");
            }
        }
    }
}

impl Drop for CachedCount {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for CachedCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedCount")
            .field("current", &self.current())
            .field("filters", &self.filters)
            .field("running", &self.is_running())
            .finish()
    }
}

#[async_trait]
impl CountEstimator for CachedCount {
    async fn estimate(&self, filters: &[FilterCondition]) -> Option<TotalCount> {
        if filters != self.filters.as_slice() {
            tracing::debug!("Request filters differ from cached count; omitting total");
            return None;
        }
        self.current().map(TotalCount::approximate)
    }
}

struct CountRefresher<S> {
    source: Arc<S>,
    filters: Vec<FilterCondition>,
    interval: Duration,
    publisher: watch::Sender<Option<u64>>,
    shutdown: CancellationToken,
}

impl<S> CountRefresher<S> {
    async fn run<R>(self)
    where
        S: PageSource<R>,
    {
        let mut ticker = tokio::time::interval(self.interval.max(MIN_REFRESH_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                result = self.source.count(&self.filters) => result,
            };

            match result {
                Ok(count) => {
                    self.publisher.send_replace(Some(count));
                    tracing::debug!(count, "Published refreshed count");
                }
                Err(error) => {
                    tracing::warn!(%error, "Count refresh failed; keeping previous snapshot");
                }
            }
        }

        tracing::info!("Count refresher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemorySource, SourceError, SourceOperation};
    use serde_json::{json, Value};

    const TICK: Duration = Duration::from_millis(10);

    async fn wait_for_count(count: &CachedCount, expected: u64) {
        let mut rx = count.subscribe();
        let published = rx.wait_for(|v| *v == Some(expected));
        tokio::time::timeout(Duration::from_secs(5), published)
            .await
            .expect("refresher did not publish in time")
            .expect("refresher dropped its sender");
    }

    fn source(n: i64) -> Arc<MemorySource<Value>> {
        let rows = (1..=n).map(|id| json!({"id": id})).collect();
        Arc::new(MemorySource::new(rows))
    }

    #[tokio::test]
    async fn test_publishes_and_refreshes() {
        let source = source(3);
        let count = CachedCount::spawn(Arc::clone(&source), Vec::new(), TICK).unwrap();

        wait_for_count(&count, 3).await;
        assert_eq!(count.estimate(&[]).await, Some(TotalCount::approximate(3)));

        source.insert(json!({"id": 4}));
        wait_for_count(&count, 4).await;

        count.shutdown().await;
    }

    #[tokio::test]
    async fn test_other_filters_get_no_total() {
        let count = CachedCount::spawn(source(2), Vec::new(), TICK).unwrap();
        wait_for_count(&count, 2).await;

        let filters = vec![FilterCondition::gt("id", 1_i64)];
        assert_eq!(count.estimate(&filters).await, None);
        count.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_running() {
        let source = source(2);
        let failure = SourceError::connection_failed(SourceOperation::Count, "down");
        source.set_failure(Some(failure));
        let count = CachedCount::spawn(Arc::clone(&source), Vec::new(), TICK).unwrap();

        tokio::time::sleep(TICK * 3).await;
        assert_eq!(count.current(), None);
        assert_eq!(count.estimate(&[]).await, None);
        assert!(count.is_running());

        source.set_failure(None);
        wait_for_count(&count, 2).await;
        count.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_and_parent_cancellation() {
        let count = CachedCount::spawn(source(1), Vec::new(), TICK).unwrap();
        count.shutdown().await;
        assert!(!count.is_running());

        let parent = CancellationToken::new();
        let child = CachedCount::spawn_with_cancellation(
            source(1),
            Vec::new(),
            TICK,
            parent.clone(),
        )
        .unwrap();
        parent.cancel();
        assert!(!child.is_running());
        child.shutdown().await;
    }

    #[test]
    fn test_spawn_outside_runtime_is_config_error() {
        let result = CachedCount::spawn::<_, Value>(source(1), Vec::new(), TICK);
        assert!(matches!(result, Err(PaginationError::Config(_))));
    }
}
