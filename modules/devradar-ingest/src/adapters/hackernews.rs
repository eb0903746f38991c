//! Hacker News adapter — time-windowed Algolia `search_by_date`.
//!
//! The `numericFilters` bound keeps the server from paging past the window;
//! the cursor still stops on `oldest_published` as a belt against feeds that
//! ignore the filter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use devradar_common::SourceFilters;

use crate::adapters::{ApiClient, FetchError, SourceAdapter};
use crate::cursor::{PageRequest, RawPage};

const BASE_URL: &str = "https://hn.algolia.com/api/v1";

pub struct HackerNewsAdapter {
    http: ApiClient,
}

impl HackerNewsAdapter {
    pub fn new(http: ApiClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SourceAdapter for HackerNewsAdapter {
    async fn fetch_page(
        &self,
        request: &PageRequest,
        filters: &SourceFilters,
    ) -> Result<RawPage, FetchError> {
        // Algolia pages are 0-based.
        let mut url = format!(
            "{BASE_URL}/search_by_date?tags=story&hitsPerPage={}&page={}&numericFilters=created_at_i>{}",
            request.page_size,
            request.page - 1,
            request.window_start.timestamp()
        );
        if let Some(query) = filters.get("query") {
            url.push_str(&format!("&query={query}"));
        }

        let body = self.http.get_json(&url, &[]).await?;
        let items = body
            .get("hits")
            .and_then(|v| v.as_array())
            .cloned()
            .ok_or_else(|| FetchError::Fatal("response without 'hits' array".to_string()))?;

        let oldest_published = items
            .iter()
            .filter_map(|item| item.get("created_at_i").and_then(|v| v.as_i64()))
            .filter_map(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .min();

        tracing::debug!(page = request.page, items = items.len(), "Fetched story page");
        Ok(RawPage {
            items,
            next_token: None,
            oldest_published,
        })
    }
}
