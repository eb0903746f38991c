//! Source adapters — one per external API/feed, all behind one capability
//! trait so the paging cursor and pipeline never know which source they're
//! driving.
//!
//! Adapters own the page envelope (arrays, `data.children`, continuation
//! tokens) and emit raw items untouched; the paired normalizer is the only
//! code that reads item internals.

pub mod devpost;
pub mod devto;
pub mod feed;
pub mod github;
pub mod hackernews;
pub mod kaggle;
pub mod lobsters;
pub mod reddit;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use devradar_common::{Config, DevRadarError, SourceDescriptor, SourceFilters, SourceType};

use crate::cursor::{PageRequest, RawPage};
use crate::retry::Retryable;

// ---------------------------------------------------------------------------
// FetchError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FetchError {
    /// Worth retrying: network trouble, 5xx, explicit rate-limit signal.
    #[error("transient source failure: {0}")]
    Transient(String),

    /// Not worth retrying: 4xx, broken configuration, contract violations.
    #[error("fatal source failure: {0}")]
    Fatal(String),
}

impl FetchError {
    pub fn from_status(status: u16, message: String) -> Self {
        if status == 429 || status >= 500 {
            FetchError::Transient(format!("status {status}: {message}"))
        } else {
            FetchError::Fatal(format!("status {status}: {message}"))
        }
    }
}

impl Retryable for FetchError {
    fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        // Anything that died on the wire may succeed next time.
        FetchError::Transient(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// SourceAdapter
// ---------------------------------------------------------------------------

/// One external source's fetch capability.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Fetch one page of raw items.
    async fn fetch_page(
        &self,
        request: &PageRequest,
        filters: &SourceFilters,
    ) -> Result<RawPage, FetchError>;
}

// ---------------------------------------------------------------------------
// Shared HTTP plumbing
// ---------------------------------------------------------------------------

/// Thin JSON-over-HTTP helper shared by the API adapters.
pub struct ApiClient {
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.to_string())
            .build()
            .expect("Failed to build HTTP client");
        Self { client }
    }

    /// GET a JSON document. Maps transport failures and 429/5xx to
    /// `Transient`, other non-success statuses to `Fatal`.
    pub async fn get_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<serde_json::Value, FetchError> {
        let mut req = self.client.get(url);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(FetchError::from_status(status.as_u16(), message));
        }

        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| FetchError::Fatal(format!("unexpected response shape: {e}")))
    }

    /// GET a JSON document with HTTP basic auth (Kaggle's API style).
    pub async fn get_json_basic_auth(
        &self,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<serde_json::Value, FetchError> {
        let resp = self
            .client
            .get(url)
            .basic_auth(username, Some(password))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(FetchError::from_status(status.as_u16(), message));
        }

        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| FetchError::Fatal(format!("unexpected response shape: {e}")))
    }

    /// GET a raw text body (feeds).
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(FetchError::from_status(status.as_u16(), message));
        }

        Ok(resp.text().await?)
    }
}

/// A required filter that is missing is a configuration problem, not a
/// source hiccup — fatal, no retry.
pub fn required_filter<'a>(filters: &'a SourceFilters, key: &str) -> Result<&'a str, FetchError> {
    filters
        .get(key)
        .ok_or_else(|| FetchError::Fatal(format!("missing required filter '{key}'")))
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Build the adapter for a descriptor. Feed sources all share one adapter;
/// API sources each get their own.
pub fn build_adapter(
    descriptor: &SourceDescriptor,
    config: &Config,
) -> anyhow::Result<Box<dyn SourceAdapter>> {
    let http = ApiClient::new(descriptor.request_timeout, &config.user_agent);

    if descriptor.source_type == SourceType::Feed {
        return Ok(Box::new(feed::FeedAdapter::new(http)));
    }

    let adapter: Box<dyn SourceAdapter> = match descriptor.id {
        "github-releases" => Box::new(github::GithubReleasesAdapter::new(
            http,
            config.github_token.clone(),
        )),
        "devto-articles" => Box::new(devto::DevtoArticlesAdapter::new(http)),
        "lobsters-posts" => Box::new(lobsters::LobstersPostsAdapter::new(http)),
        "reddit-posts" => Box::new(reddit::RedditPostsAdapter::new(http)),
        "hackernews-posts" => Box::new(hackernews::HackerNewsAdapter::new(http)),
        "kaggle-competitions" => Box::new(kaggle::KaggleCompetitionsAdapter::new(
            http,
            config.kaggle_username.clone(),
            config.kaggle_key.clone(),
        )),
        "devpost-hackathons" => Box::new(devpost::DevpostHackathonsAdapter::new(http)),
        other => {
            return Err(
                DevRadarError::Config(format!("no adapter registered for source '{other}'")).into(),
            )
        }
    };
    Ok(adapter)
}
