//! Dev.to articles adapter — offset-paged `/api/articles`.

use async_trait::async_trait;

use devradar_common::SourceFilters;

use crate::adapters::{ApiClient, FetchError, SourceAdapter};
use crate::cursor::{PageRequest, RawPage};

const BASE_URL: &str = "https://dev.to/api";

pub struct DevtoArticlesAdapter {
    http: ApiClient,
}

impl DevtoArticlesAdapter {
    pub fn new(http: ApiClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SourceAdapter for DevtoArticlesAdapter {
    async fn fetch_page(
        &self,
        request: &PageRequest,
        filters: &SourceFilters,
    ) -> Result<RawPage, FetchError> {
        let mut url = format!(
            "{BASE_URL}/articles?per_page={}&page={}",
            request.page_size, request.page
        );
        if let Some(tag) = filters.get("tag") {
            url.push_str(&format!("&tag={tag}"));
        }

        let body = self.http.get_json(&url, &[]).await?;
        let items = body
            .as_array()
            .cloned()
            .ok_or_else(|| FetchError::Fatal("expected a JSON array of articles".to_string()))?;

        tracing::debug!(page = request.page, items = items.len(), "Fetched articles page");
        Ok(RawPage::new(items))
    }
}
