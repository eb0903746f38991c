//! Reddit posts adapter — token-paged `/r/{subreddit}/new.json`.
//!
//! Reddit's listing envelope carries the continuation token (`data.after`);
//! the envelope is unwrapped here, the post payloads stay opaque.

use async_trait::async_trait;

use devradar_common::SourceFilters;

use crate::adapters::{required_filter, ApiClient, FetchError, SourceAdapter};
use crate::cursor::{PageRequest, RawPage};

const BASE_URL: &str = "https://www.reddit.com";

pub struct RedditPostsAdapter {
    http: ApiClient,
}

impl RedditPostsAdapter {
    pub fn new(http: ApiClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SourceAdapter for RedditPostsAdapter {
    async fn fetch_page(
        &self,
        request: &PageRequest,
        filters: &SourceFilters,
    ) -> Result<RawPage, FetchError> {
        let subreddit = required_filter(filters, "subreddit")?;
        let mut url = format!(
            "{BASE_URL}/r/{subreddit}/new.json?limit={}",
            request.page_size
        );
        if let Some(ref token) = request.token {
            url.push_str(&format!("&after={token}"));
        }

        let body = self.http.get_json(&url, &[]).await?;
        let data = body
            .get("data")
            .ok_or_else(|| FetchError::Fatal("listing without 'data' envelope".to_string()))?;
        let items = data
            .get("children")
            .and_then(|v| v.as_array())
            .cloned()
            .ok_or_else(|| FetchError::Fatal("listing without 'children' array".to_string()))?;
        let next_token = data
            .get("after")
            .and_then(|v| v.as_str())
            .map(String::from);

        tracing::debug!(
            subreddit,
            page = request.page,
            items = items.len(),
            has_more = next_token.is_some(),
            "Fetched subreddit page"
        );
        Ok(RawPage {
            items,
            next_token,
            oldest_published: None,
        })
    }
}
