//! N+1 windowing

/// One bounded window of rows
///
/// Produced by asking the collaborator for `limit + 1` rows: the extra row is
/// never returned, it only proves that more data exists.
#[derive(Debug, Clone, PartialEq)]
pub struct Window<R> {
    /// At most `limit` rows, in sort order
    pub rows: Vec<R>,
    /// Whether the collaborator returned the look-ahead row
    pub has_more: bool,
}

impl<R> Window<R> {
    /// Trim an over-fetched result down to `limit` rows
    pub fn from_lookahead(mut rows: Vec<R>, limit: usize) -> Self {
        let has_more = rows.len() > limit;
        rows.truncate(limit);
        Self { rows, has_more }
    }

    /// Number of rows to request for a window of `limit`
    pub fn fetch_size(limit: usize) -> usize {
        limit.saturating_add(1)
    }

    /// The last row of the trimmed window
    pub fn last(&self) -> Option<&R> {
        self.rows.last()
    }
}
