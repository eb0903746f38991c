//! GitHub releases adapter — offset-paged `/repos/{repo}/releases`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use devradar_common::SourceFilters;

use crate::adapters::{required_filter, ApiClient, FetchError, SourceAdapter};
use crate::cursor::{PageRequest, RawPage};

const BASE_URL: &str = "https://api.github.com";

pub struct GithubReleasesAdapter {
    http: ApiClient,
    base_url: String,
    token: Option<String>,
}

impl GithubReleasesAdapter {
    pub fn new(http: ApiClient, token: Option<String>) -> Self {
        Self::with_base_url(http, token, BASE_URL)
    }

    pub fn with_base_url(http: ApiClient, token: Option<String>, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }
}

#[async_trait]
impl SourceAdapter for GithubReleasesAdapter {
    async fn fetch_page(
        &self,
        request: &PageRequest,
        filters: &SourceFilters,
    ) -> Result<RawPage, FetchError> {
        let repo = required_filter(filters, "repo")?;
        let url = format!(
            "{}/repos/{repo}/releases?per_page={}&page={}",
            self.base_url, request.page_size, request.page
        );

        let auth;
        let mut headers: Vec<(&str, &str)> =
            vec![("Accept", "application/vnd.github+json")];
        if let Some(ref token) = self.token {
            auth = format!("Bearer {token}");
            headers.push(("Authorization", &auth));
        }

        let body = self.http.get_json(&url, &headers).await?;
        let items = body
            .as_array()
            .cloned()
            .ok_or_else(|| FetchError::Fatal("expected a JSON array of releases".to_string()))?;

        let oldest_published = items
            .iter()
            .filter_map(|item| item.get("published_at").and_then(|v| v.as_str()))
            .filter_map(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
            .min();

        tracing::debug!(repo, page = request.page, items = items.len(), "Fetched releases page");
        Ok(RawPage {
            items,
            next_token: None,
            oldest_published,
        })
    }
}
