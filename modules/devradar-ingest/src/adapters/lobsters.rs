//! Lobsters posts adapter — offset-paged `/newest.json`.
//!
//! The API pins the page size at 25; the descriptor mirrors that so short
//! pages still mean "last page".

use async_trait::async_trait;

use devradar_common::SourceFilters;

use crate::adapters::{ApiClient, FetchError, SourceAdapter};
use crate::cursor::{PageRequest, RawPage};

const BASE_URL: &str = "https://lobste.rs";

pub struct LobstersPostsAdapter {
    http: ApiClient,
}

impl LobstersPostsAdapter {
    pub fn new(http: ApiClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SourceAdapter for LobstersPostsAdapter {
    async fn fetch_page(
        &self,
        request: &PageRequest,
        _filters: &SourceFilters,
    ) -> Result<RawPage, FetchError> {
        let url = format!("{BASE_URL}/newest.json?page={}", request.page);

        let body = self.http.get_json(&url, &[]).await?;
        let items = body
            .as_array()
            .cloned()
            .ok_or_else(|| FetchError::Fatal("expected a JSON array of stories".to_string()))?;

        tracing::debug!(page = request.page, items = items.len(), "Fetched stories page");
        Ok(RawPage::new(items))
    }
}
