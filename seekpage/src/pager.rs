//! Pagination facade
//!
//! [`Pager`] ties the pieces together for one request at a time:
//!
//! ```text
//! Idle -> Validating -> Fetching -> Assembling -> Done
//!            |             |
//!            +-> Failed <--+
//! ```
//!
//! Validation (limit bounds, page number, skip depth, cursor decoding and
//! ordering checks) completes before the storage collaborator is touched.
//! The row fetch and the optional count then run concurrently. The fetch is
//! bounded by the request deadline; the count by the shorter of that deadline
//! and `count_timeout_ms`, so a slow count costs a page at most its own
//! budget. A failed fetch returns at once. No state survives between
//! requests.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::OptionFuture;
use tokio::time::Instant;

use crate::config::PagerConfig;
use crate::count::{self, CountEstimator, TotalCount};
use crate::cursor::CursorCodec;
use crate::error::{PaginationError, Result};
use crate::keyset::{KeysetPager, KeysetWindow};
use crate::offset::OffsetPager;
use crate::request::{PageLinks, PageRequest, PageResult, Strategy};
use crate::source::{PageSource, SortKey};
use crate::value::FieldValue;
use crate::window::Window;

/// Request lifecycle stage, traced at debug level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerState {
    Idle,
    Validating,
    Fetching,
    Assembling,
    Done,
    Failed,
}

impl fmt::Display for PagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Fetching => "fetching",
            Self::Assembling => "assembling",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

struct Lifecycle {
    state: PagerState,
}

impl Lifecycle {
    fn start() -> Self {
        Self {
            state: PagerState::Idle,
        }
    }

    fn enter(&mut self, next: PagerState) {
        tracing::debug!(from = %self.state, to = %next, "Pager state transition");
        self.state = next;
    }

    fn fail(&mut self, error: &PaginationError) {
        tracing::debug!(
            from = %self.state,
            to = %PagerState::Failed,
            code = error.code(),
            "Pager state transition"
        );
        self.state = PagerState::Failed;
    }
}

/// Validated request, ready to fetch
enum Plan {
    Offset { page: i64, limit: usize },
    Keyset {
        after: Option<Vec<FieldValue>>,
        limit: usize,
    },
}

impl Plan {
    fn limit(&self) -> u32 {
        let limit = match self {
            Self::Offset { limit, .. } | Self::Keyset { limit, .. } => *limit,
        };
        // Bounded by max_limit during planning.
        u32::try_from(limit).unwrap_or(u32::MAX)
    }
}

enum Fetched<R> {
    Offset { page: i64, window: Window<R> },
    Keyset(KeysetWindow<R>),
}

/// Pagination engine over one storage collaborator
pub struct Pager<S, R> {
    config: PagerConfig,
    codec: CursorCodec,
    source: Arc<S>,
    estimator: Arc<dyn CountEstimator>,
    offset: OffsetPager,
    _rows: PhantomData<fn() -> R>,
}

impl<S, R> Pager<S, R>
where
    S: PageSource<R> + 'static,
    R: SortKey + 'static,
{
    /// Build a pager from configuration
    ///
    /// The count estimator follows `config.count_mode`; cached mode spawns
    /// its refresher on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// [`PaginationError::Config`] when the configuration fails validation,
    /// or when cached counting is configured outside a tokio runtime.
    pub fn new(source: Arc<S>, config: PagerConfig) -> Result<Self> {
        config.validate()?;

        let estimator = count::estimator_for::<S, R>(
            config.count_mode,
            Arc::clone(&source),
            config.cache_refresh_interval(),
        )?;

        tracing::debug!(
            count_mode = %config.count_mode,
            max_limit = config.max_limit,
            max_skip_depth = config.max_skip_depth,
            keyed_cursors = config.cursor_secret.is_some(),
            "Pager configured"
        );

        Ok(Self {
            codec: config.cursor_codec(),
            offset: OffsetPager::new(config.max_skip_depth),
            config,
            source,
            estimator,
            _rows: PhantomData,
        })
    }
}

impl<S, R> Pager<S, R>
where
    S: PageSource<R>,
    R: SortKey,
{
    /// Replace the count estimator
    #[must_use]
    pub fn with_estimator(mut self, estimator: Arc<dyn CountEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Replace the cursor codec
    #[must_use]
    pub fn with_codec(mut self, codec: CursorCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn config(&self) -> &PagerConfig {
        &self.config
    }

    pub fn codec(&self) -> &CursorCodec {
        &self.codec
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Produce one page for `request`
    ///
    /// # Errors
    ///
    /// Validation errors ([`InvalidLimit`], [`InvalidPage`],
    /// [`InvalidCursor`], [`CursorSortMismatch`], [`MaxOffsetExceeded`]) are
    /// returned before storage is queried. [`UpstreamQueryFailed`] carries a
    /// collaborator failure unchanged; [`Timeout`] means the deadline passed
    /// while rows were being fetched. Count problems never fail the page.
    ///
    /// [`InvalidLimit`]: PaginationError::InvalidLimit
    /// [`InvalidPage`]: PaginationError::InvalidPage
    /// [`InvalidCursor`]: PaginationError::InvalidCursor
    /// [`CursorSortMismatch`]: PaginationError::CursorSortMismatch
    /// [`MaxOffsetExceeded`]: PaginationError::MaxOffsetExceeded
    /// [`UpstreamQueryFailed`]: PaginationError::UpstreamQueryFailed
    /// [`Timeout`]: PaginationError::Timeout
    pub async fn paginate(&self, request: PageRequest) -> Result<PageResult<R>> {
        let mut lifecycle = Lifecycle::start();

        lifecycle.enter(PagerState::Validating);
        let plan = match self.plan(&request) {
            Ok(plan) => plan,
            Err(error) => {
                lifecycle.fail(&error);
                return Err(error);
            }
        };

        lifecycle.enter(PagerState::Fetching);
        let limit = plan.limit();
        let started = Instant::now();
        let deadline = request
            .deadline
            .unwrap_or_else(|| started + self.config.query_timeout());
        let budget = deadline.saturating_duration_since(started);

        let count_deadline = deadline.min(started + self.config.count_timeout());
        let count: OptionFuture<_> = request
            .include_count
            .then(|| self.count_before(count_deadline, &request))
            .into();
        let fetch = tokio::time::timeout_at(deadline, self.fetch(plan, &request));
        tokio::pin!(count, fetch);

        let mut total_count = None;
        let mut counted = !request.include_count;
        let fetched = loop {
            tokio::select! {
                fetched = &mut fetch => break fetched,
                total = &mut count, if !counted => {
                    total_count = total.flatten();
                    counted = true;
                }
            }
        };

        let fetched = match fetched {
            Ok(Ok(fetched)) => fetched,
            Ok(Err(error)) => {
                if let PaginationError::UpstreamQueryFailed(source) = &error {
                    tracing::warn!(error = %source, "Page fetch failed");
                }
                lifecycle.fail(&error);
                return Err(error);
            }
            Err(_) => {
                let error = PaginationError::Timeout { budget };
                tracing::warn!(budget = ?budget, "Page fetch exceeded its deadline");
                lifecycle.fail(&error);
                return Err(error);
            }
        };

        // Rows are ready; the count only gets what is left of its own budget.
        if !counted {
            total_count = count.await.flatten();
        }

        lifecycle.enter(PagerState::Assembling);
        let result = self.assemble(fetched, limit, &request, total_count);

        tracing::debug!(
            items = result.items.len(),
            has_more = result.has_more,
            elapsed = ?started.elapsed(),
            "Page assembled"
        );
        lifecycle.enter(PagerState::Done);

        Ok(result)
    }

    fn resolve_limit(&self, requested: Option<i64>) -> Result<usize> {
        let max = self.config.max_limit;
        let limit = requested.unwrap_or(i64::from(self.config.default_limit));
        if limit < 1 || limit > i64::from(max) {
            return Err(PaginationError::InvalidLimit { limit, max });
        }
        // Bounded by max_limit (a u32) above.
        Ok(usize::try_from(limit).unwrap_or(usize::MAX))
    }

    fn plan(&self, request: &PageRequest) -> Result<Plan> {
        let limit = self.resolve_limit(request.limit)?;

        match &request.strategy {
            Strategy::Offset { page } => {
                self.offset.skip_for(*page, limit)?;
                Ok(Plan::Offset { page: *page, limit })
            }
            Strategy::Keyset { cursor: None } => Ok(Plan::Keyset { after: None, limit }),
            Strategy::Keyset {
                cursor: Some(token),
            } => {
                let cursor = self.codec.decode_for(token, &request.sort)?;
                Ok(Plan::Keyset {
                    after: Some(cursor.into_values()),
                    limit,
                })
            }
        }
    }

    async fn fetch(&self, plan: Plan, request: &PageRequest) -> Result<Fetched<R>> {
        let source = self.source.as_ref();
        match plan {
            Plan::Offset { page, limit } => {
                let window = self
                    .offset
                    .fetch(source, &request.sort, page, limit, &request.filters)
                    .await?;
                Ok(Fetched::Offset { page, window })
            }
            Plan::Keyset { after, limit } => {
                let window = KeysetPager
                    .fetch(source, &request.sort, after, limit, &request.filters)
                    .await?;
                Ok(Fetched::Keyset(window))
            }
        }
    }

    async fn count_before(&self, deadline: Instant, request: &PageRequest) -> Option<TotalCount> {
        match tokio::time::timeout_at(deadline, self.estimator.estimate(&request.filters)).await {
            Ok(total) => total,
            Err(_) => {
                tracing::warn!("Count did not finish within its budget; omitting total");
                None
            }
        }
    }

    fn assemble(
        &self,
        fetched: Fetched<R>,
        limit: u32,
        request: &PageRequest,
        total_count: Option<TotalCount>,
    ) -> PageResult<R> {
        let (window, links) = match fetched {
            Fetched::Offset { page, window } => {
                // Validated >= 1 during planning.
                let page = page.unsigned_abs();
                let links = PageLinks::Offset {
                    page,
                    next_page: window.has_more.then(|| page.saturating_add(1)),
                    previous_page: (page > 1).then(|| page - 1),
                };
                (window, links)
            }
            Fetched::Keyset(KeysetWindow { window, next_key }) => {
                let next_cursor = next_key
                    .map(|key| self.codec.encode(&key, request.sort.signature()));
                (window, PageLinks::Keyset { next_cursor })
            }
        };

        PageResult {
            limit,
            has_more: window.has_more,
            items: window.rows,
            links,
            total_count,
        }
    }
}

impl<S, R> fmt::Debug for Pager<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pager")
            .field("config", &self.config)
            .field("codec", &self.codec)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}
