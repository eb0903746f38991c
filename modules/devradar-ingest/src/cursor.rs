//! Generic pagination state machine.
//!
//! Drives a source adapter page by page until the source is exhausted or the
//! safety cap is hit. Three strategies: offset/page-number, opaque
//! continuation token, and time-window over descending feeds. A fetch that
//! exhausts its retries terminates the cursor with a fatal error carrying the
//! last good position — never an empty page, so callers can tell "no more
//! pages" from "fetch failed".

use chrono::{DateTime, Utc};
use thiserror::Error;

use devradar_common::{PaginationStyle, RawItem, SourceDescriptor, SourceFilters};

use crate::adapters::{FetchError, SourceAdapter};
use crate::retry::{with_retry, RetryError, RetryPolicy};

/// What an adapter needs to fetch one page.
#[derive(Debug, Clone)]
pub struct PageRequest {
    /// 1-based page ordinal within this run.
    pub page: u32,
    pub page_size: u32,
    /// Continuation token from the previous page, for token-paged sources.
    pub token: Option<String>,
    /// Lower bound for time-windowed sources.
    pub window_start: DateTime<Utc>,
}

/// One page of raw items plus whatever the adapter learned about what comes next.
#[derive(Debug, Clone, Default)]
pub struct RawPage {
    pub items: Vec<RawItem>,
    /// Server-issued continuation token, when the source hands one out.
    pub next_token: Option<String>,
    /// Publication time of the oldest item on the page, when the adapter can
    /// tell. Time-window cursors stop on it.
    pub oldest_published: Option<DateTime<Utc>>,
}

impl RawPage {
    pub fn new(items: Vec<RawItem>) -> Self {
        Self {
            items,
            next_token: None,
            oldest_published: None,
        }
    }
}

#[derive(Debug, Error)]
#[error("page fetch failed at {position}: {source}")]
pub struct CursorError {
    /// Last good cursor position, so a re-run's cost is bounded.
    pub position: String,
    #[source]
    pub source: RetryError<FetchError>,
}

#[derive(Debug, Clone)]
enum CursorState {
    Offset { page: u32 },
    Token { page: u32, token: Option<String> },
    TimeWindow { page: u32 },
}

/// Sequential pager over one source for one run.
pub struct PagingCursor {
    source_id: &'static str,
    state: CursorState,
    page_size: u32,
    max_pages: u32,
    window_start: DateTime<Utc>,
    pages_fetched: u32,
    done: bool,
}

impl PagingCursor {
    pub fn new(
        descriptor: &SourceDescriptor,
        window_start: DateTime<Utc>,
        page_size_override: Option<u32>,
    ) -> Self {
        let state = match descriptor.pagination {
            PaginationStyle::Offset => CursorState::Offset { page: 1 },
            PaginationStyle::Token => CursorState::Token { page: 1, token: None },
            PaginationStyle::TimeWindow => CursorState::TimeWindow { page: 1 },
        };
        Self {
            source_id: descriptor.id,
            state,
            page_size: page_size_override.unwrap_or(descriptor.page_size),
            max_pages: descriptor.max_pages,
            window_start,
            pages_fetched: 0,
            done: false,
        }
    }

    /// Human-readable position for logs and FAILED reports.
    pub fn position(&self) -> String {
        match &self.state {
            CursorState::Offset { page } => format!("page {page}"),
            CursorState::Token { page, token } => match token {
                Some(t) => format!("page {page} (after {t})"),
                None => format!("page {page}"),
            },
            CursorState::TimeWindow { page } => format!("page {page}"),
        }
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Fetch the next page, or `None` once the source is exhausted.
    ///
    /// Each fetch goes through the retry controller; a fetch that exhausts
    /// retries (or fails fatally) ends the run, not the page sequence.
    pub async fn next_page(
        &mut self,
        adapter: &dyn SourceAdapter,
        filters: &SourceFilters,
        retry: &RetryPolicy,
    ) -> Result<Option<RawPage>, CursorError> {
        if self.done {
            return Ok(None);
        }
        if self.pages_fetched >= self.max_pages {
            tracing::debug!(
                source = self.source_id,
                max_pages = self.max_pages,
                "Page safety cap reached"
            );
            self.done = true;
            return Ok(None);
        }

        let request = PageRequest {
            page: self.current_page(),
            page_size: self.page_size,
            token: self.current_token(),
            window_start: self.window_start,
        };

        let page = with_retry(retry, self.source_id, || adapter.fetch_page(&request, filters))
            .await
            .map_err(|source| CursorError {
                position: self.position(),
                source,
            })?;

        self.pages_fetched += 1;
        self.advance(&page);
        Ok(Some(page))
    }

    fn current_page(&self) -> u32 {
        match &self.state {
            CursorState::Offset { page }
            | CursorState::Token { page, .. }
            | CursorState::TimeWindow { page } => *page,
        }
    }

    fn current_token(&self) -> Option<String> {
        match &self.state {
            CursorState::Token { token, .. } => token.clone(),
            _ => None,
        }
    }

    #[cfg(test)]
    fn is_done(&self) -> bool {
        self.done
    }

    fn advance(&mut self, page: &RawPage) {
        let short_page = (page.items.len() as u32) < self.page_size;
        match &mut self.state {
            CursorState::Offset { page: n } => {
                if short_page {
                    self.done = true;
                } else {
                    *n += 1;
                }
            }
            CursorState::Token { page: n, token } => {
                *token = page.next_token.clone();
                if token.is_none() || page.items.is_empty() {
                    self.done = true;
                } else {
                    *n += 1;
                }
            }
            CursorState::TimeWindow { page: n } => {
                // Oldest item behind the window means every later page is too.
                let behind_window = page
                    .oldest_published
                    .map(|t| t < self.window_start)
                    .unwrap_or(false);
                if behind_window || short_page {
                    self.done = true;
                } else {
                    *n += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    use chrono::Utc;
    use serde_json::json;

    use devradar_common::{RecordKind, SourceType};

    use crate::testing::ScriptedAdapter;

    fn descriptor(pagination: PaginationStyle, page_size: u32, max_pages: u32) -> SourceDescriptor {
        SourceDescriptor {
            id: "test-source",
            provider: "test",
            kind: RecordKind::Post,
            source_type: SourceType::Api,
            pagination,
            page_size,
            max_pages,
            batch_size: 10,
            request_timeout: StdDuration::from_secs(5),
            seen_ttl: StdDuration::from_secs(3600),
            default_filters: &[],
        }
    }

    fn tiny_retry() -> RetryPolicy {
        RetryPolicy {
            initial_interval: StdDuration::from_millis(1),
            multiplier: 1.2,
            max_interval: StdDuration::from_millis(5),
            max_attempts: 2,
        }
    }

    fn items(n: usize) -> Vec<RawItem> {
        (0..n).map(|i| json!({ "i": i })).collect()
    }

    #[tokio::test]
    async fn offset_cursor_stops_on_a_short_page() {
        let desc = descriptor(PaginationStyle::Offset, 5, 10);
        let adapter = ScriptedAdapter::new()
            .page(RawPage::new(items(5)))
            .page(RawPage::new(items(3)));
        let mut cursor = PagingCursor::new(&desc, Utc::now(), None);
        let filters = SourceFilters::new();
        let retry = tiny_retry();

        assert_eq!(
            cursor
                .next_page(&adapter, &filters, &retry)
                .await
                .unwrap()
                .unwrap()
                .items
                .len(),
            5
        );
        assert!(!cursor.is_done());
        cursor.next_page(&adapter, &filters, &retry).await.unwrap();
        assert!(cursor.is_done());
        assert!(cursor
            .next_page(&adapter, &filters, &retry)
            .await
            .unwrap()
            .is_none());
        assert_eq!(adapter.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn safety_cap_bounds_an_unending_token_feed() {
        let desc = descriptor(PaginationStyle::Token, 2, 3);
        // Every page claims there is more.
        let endless = || {
            let mut page = RawPage::new(items(2));
            page.next_token = Some("more".to_string());
            page
        };
        let adapter = ScriptedAdapter::new()
            .page(endless())
            .page(endless())
            .page(endless())
            .page(endless());
        let mut cursor = PagingCursor::new(&desc, Utc::now(), None);
        let filters = SourceFilters::new();
        let retry = tiny_retry();

        let mut pages = 0;
        while cursor
            .next_page(&adapter, &filters, &retry)
            .await
            .unwrap()
            .is_some()
        {
            pages += 1;
        }
        assert_eq!(pages, 3);
        assert_eq!(adapter.fetch_calls(), 3);
    }

    #[tokio::test]
    async fn failed_fetch_is_an_error_never_an_empty_page() {
        let desc = descriptor(PaginationStyle::Offset, 5, 10);
        let adapter = ScriptedAdapter::new().fatal_failure("status 400: bad request");
        let mut cursor = PagingCursor::new(&desc, Utc::now(), None);

        let err = cursor
            .next_page(&adapter, &SourceFilters::new(), &tiny_retry())
            .await
            .unwrap_err();
        assert_eq!(err.position, "page 1");
    }

    #[tokio::test]
    async fn page_size_override_takes_effect() {
        let desc = descriptor(PaginationStyle::Offset, 50, 10);
        let adapter = ScriptedAdapter::new().page(RawPage::new(items(10)));
        // Overridden to 10, a 10-item page is full and the cursor keeps going.
        let mut cursor = PagingCursor::new(&desc, Utc::now(), Some(10));
        cursor
            .next_page(&adapter, &SourceFilters::new(), &tiny_retry())
            .await
            .unwrap();
        assert!(!cursor.is_done());
    }
}
