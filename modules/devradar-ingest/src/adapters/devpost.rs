//! Devpost hackathons adapter — offset-paged `/api/hackathons`.

use async_trait::async_trait;

use devradar_common::SourceFilters;

use crate::adapters::{ApiClient, FetchError, SourceAdapter};
use crate::cursor::{PageRequest, RawPage};

const BASE_URL: &str = "https://devpost.com/api";

pub struct DevpostHackathonsAdapter {
    http: ApiClient,
}

impl DevpostHackathonsAdapter {
    pub fn new(http: ApiClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SourceAdapter for DevpostHackathonsAdapter {
    async fn fetch_page(
        &self,
        request: &PageRequest,
        filters: &SourceFilters,
    ) -> Result<RawPage, FetchError> {
        let mut url = format!("{BASE_URL}/hackathons?page={}", request.page);
        if let Some(query) = filters.get("query") {
            url.push_str(&format!("&search={query}"));
        }

        let body = self.http.get_json(&url, &[]).await?;
        let items = body
            .get("hackathons")
            .and_then(|v| v.as_array())
            .cloned()
            .ok_or_else(|| {
                FetchError::Fatal("response without 'hackathons' array".to_string())
            })?;

        tracing::debug!(page = request.page, items = items.len(), "Fetched hackathons page");
        Ok(RawPage::new(items))
    }
}
