pub mod error;
pub mod types;

pub use error::{Result, StoreError};
pub use types::{
    BatchCounts, CheckAndMarkRequest, CheckAndMarkResponse, ItemOutcome, ItemStatus,
    SubmitBatchRequest, SubmitBatchResponse,
};

use std::time::Duration;

use devradar_common::CanonicalRecord;

/// Client for the internal record store's batch ingest endpoint.
///
/// The store applies per-item independent commit semantics and treats
/// already-present records as `duplicate`, not as errors, so this endpoint is
/// safe to call again with records a previous run already submitted.
pub struct StoreClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl StoreClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    /// Submit one batch of canonical records. Returns per-item outcomes plus
    /// aggregate counts; a call-level error means nothing in the batch was
    /// acknowledged.
    pub async fn submit_batch(
        &self,
        run_token: &str,
        records: &[CanonicalRecord],
    ) -> Result<SubmitBatchResponse> {
        let url = format!("{}/v1/records/batch", self.base_url);
        let body = SubmitBatchRequest { run_token, records };

        let mut req = self.client.post(&url).json(&body);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SubmitBatchResponse = resp.json().await?;
        tracing::debug!(
            run_token,
            submitted = records.len(),
            new = parsed.counts.new,
            duplicate = parsed.counts.duplicate,
            failed = parsed.counts.failed,
            "Batch submitted"
        );
        Ok(parsed)
    }
}

/// Client for the shared seen-index: one atomic check-and-mark per key.
pub struct SeenIndexClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl SeenIndexClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    /// Atomically record `key` with the given TTL and report whether it was
    /// already present. The entry expires on its own; a dead run cannot
    /// permanently blacklist a key.
    pub async fn check_and_mark(
        &self,
        key: &str,
        ttl: Duration,
        run_token: &str,
    ) -> Result<bool> {
        let url = format!("{}/v1/seen", self.base_url);
        let body = CheckAndMarkRequest {
            key,
            ttl_seconds: ttl.as_secs(),
            run_token,
        };

        let mut req = self.client.post(&url).json(&body);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: CheckAndMarkResponse = resp.json().await?;
        Ok(parsed.already_seen)
    }
}
