//! Kaggle competitions adapter — offset-paged `/api/v1/competitions/list`.

use async_trait::async_trait;

use devradar_common::SourceFilters;

use crate::adapters::{ApiClient, FetchError, SourceAdapter};
use crate::cursor::{PageRequest, RawPage};

const BASE_URL: &str = "https://www.kaggle.com/api/v1";

pub struct KaggleCompetitionsAdapter {
    http: ApiClient,
    username: Option<String>,
    key: Option<String>,
}

impl KaggleCompetitionsAdapter {
    pub fn new(http: ApiClient, username: Option<String>, key: Option<String>) -> Self {
        Self { http, username, key }
    }
}

#[async_trait]
impl SourceAdapter for KaggleCompetitionsAdapter {
    async fn fetch_page(
        &self,
        request: &PageRequest,
        filters: &SourceFilters,
    ) -> Result<RawPage, FetchError> {
        let mut url = format!("{BASE_URL}/competitions/list?page={}", request.page);
        if let Some(query) = filters.get("query") {
            url.push_str(&format!("&search={query}"));
        }

        let body = match (&self.username, &self.key) {
            (Some(user), Some(key)) => self.http.get_json_basic_auth(&url, user, key).await?,
            _ => self.http.get_json(&url, &[]).await?,
        };
        let items = body
            .as_array()
            .cloned()
            .ok_or_else(|| {
                FetchError::Fatal("expected a JSON array of competitions".to_string())
            })?;

        tracing::debug!(page = request.page, items = items.len(), "Fetched competitions page");
        Ok(RawPage::new(items))
    }
}
