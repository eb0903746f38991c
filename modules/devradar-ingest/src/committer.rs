//! Batch committer — accumulates canonical records and submits them in
//! fixed-size batches to the internal store.
//!
//! The store commits items independently: a validation rejection or
//! store-side duplicate never blocks its batch-mates. Only a call-level
//! transport failure that outlives its retries fails the batch as a whole,
//! and it surfaces separately from per-item rejections.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use devradar_common::CanonicalRecord;
use devradar_store::{ItemStatus, StoreError, SubmitBatchResponse};

use crate::retry::{with_retry, RetryError, RetryPolicy};
use crate::stats::IngestStats;

/// Warn when more than this share of a flush has no publication timestamp.
/// A data-quality signal, not a correctness failure.
const MISSING_PUBLISHED_WARN_RATIO: f64 = 0.5;

// ---------------------------------------------------------------------------
// RecordSink — internal store boundary
// ---------------------------------------------------------------------------

#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Submit one batch. Per-item outcomes are independent; records already
    /// present count as duplicates, not errors.
    async fn submit(
        &self,
        run_token: &str,
        records: &[CanonicalRecord],
    ) -> Result<SubmitBatchResponse, StoreError>;
}

#[async_trait]
impl RecordSink for devradar_store::StoreClient {
    async fn submit(
        &self,
        run_token: &str,
        records: &[CanonicalRecord],
    ) -> Result<SubmitBatchResponse, StoreError> {
        self.submit_batch(run_token, records).await
    }
}

// ---------------------------------------------------------------------------
// BatchCommitter
// ---------------------------------------------------------------------------

/// Transport-level commit failure, after retries. Fatal for the run.
#[derive(Debug, Error)]
#[error("batch submit failed after {attempts} attempt(s): {message}")]
pub struct CommitError {
    pub attempts: u32,
    pub message: String,
}

/// What one flush did, for run-log bookkeeping.
#[derive(Debug, Clone, Copy)]
pub struct FlushSummary {
    pub submitted: usize,
    pub new: u32,
    pub duplicate: u32,
    pub failed: u32,
}

pub struct BatchCommitter<'a> {
    sink: &'a dyn RecordSink,
    retry: &'a RetryPolicy,
    run_token: &'a str,
    batch_size: usize,
    pending: Vec<CanonicalRecord>,
}

impl<'a> BatchCommitter<'a> {
    pub fn new(
        sink: &'a dyn RecordSink,
        retry: &'a RetryPolicy,
        run_token: &'a str,
        batch_size: usize,
    ) -> Self {
        Self {
            sink,
            retry,
            run_token,
            batch_size: batch_size.max(1),
            pending: Vec::new(),
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Accumulate one record; flushes automatically when the batch fills.
    pub async fn push(
        &mut self,
        record: CanonicalRecord,
        stats: &mut IngestStats,
    ) -> Result<Option<FlushSummary>, CommitError> {
        self.pending.push(record);
        if self.pending.len() >= self.batch_size {
            self.flush(stats).await
        } else {
            Ok(None)
        }
    }

    /// Submit whatever is pending. An empty batch never triggers a call.
    pub async fn flush(
        &mut self,
        stats: &mut IngestStats,
    ) -> Result<Option<FlushSummary>, CommitError> {
        if self.pending.is_empty() {
            return Ok(None);
        }

        let submitted = self.pending.len();
        let missing_published = self
            .pending
            .iter()
            .filter(|r| r.published_at.is_none())
            .count();
        stats.missing_published += missing_published as u32;
        let missing_ratio = missing_published as f64 / submitted as f64;
        if missing_ratio > MISSING_PUBLISHED_WARN_RATIO {
            warn!(
                run_token = self.run_token,
                missing_published,
                submitted,
                "Unusual share of records without a publication timestamp"
            );
        }

        let result = with_retry(self.retry, "batch-submit", || {
            self.sink.submit(self.run_token, &self.pending)
        })
        .await;

        match result {
            Ok(resp) => {
                stats.batches += 1;
                for outcome in &resp.outcomes {
                    match outcome.status {
                        ItemStatus::New => stats.new += 1,
                        ItemStatus::Duplicate => stats.duplicate += 1,
                        ItemStatus::Failed => {
                            stats.failed += 1;
                            let reason = outcome.reason.as_deref().unwrap_or("store rejection");
                            stats
                                .failure_messages
                                .push(format!("{}: {reason}", outcome.key));
                        }
                    }
                }
                info!(
                    run_token = self.run_token,
                    submitted,
                    new = resp.counts.new,
                    duplicate = resp.counts.duplicate,
                    failed = resp.counts.failed,
                    "Batch committed"
                );
                self.pending.clear();
                Ok(Some(FlushSummary {
                    submitted,
                    new: resp.counts.new,
                    duplicate: resp.counts.duplicate,
                    failed: resp.counts.failed,
                }))
            }
            Err(err) => {
                let (attempts, message) = match err {
                    RetryError::Fatal(e) => (1, e.to_string()),
                    RetryError::Exhausted { attempts, last } => (attempts, last.to_string()),
                };
                // The whole pending batch is lost to the transport, distinct
                // from any store-side per-item rejection.
                stats.failed += submitted as u32;
                stats
                    .failure_messages
                    .push(format!("transport: {message} ({submitted} records in batch)"));
                self.pending.clear();
                Err(CommitError { attempts, message })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    use devradar_common::{RecordKind, SourceType};

    use crate::testing::MemorySink;

    fn record(id: u32) -> CanonicalRecord {
        CanonicalRecord {
            provider: "test".to_string(),
            kind: RecordKind::Post,
            title: format!("item {id}"),
            summary: None,
            url: format!("https://example.com/{id}"),
            published_at: Some(chrono::Utc::now()),
            external_id: Some(id.to_string()),
            source_type: SourceType::Api,
            status: "active".to_string(),
            tags: vec![],
            author: None,
            extra: BTreeMap::new(),
        }
    }

    fn tiny_retry() -> RetryPolicy {
        RetryPolicy {
            initial_interval: Duration::from_millis(1),
            multiplier: 1.2,
            max_interval: Duration::from_millis(5),
            max_attempts: 2,
        }
    }

    #[tokio::test]
    async fn empty_flush_never_calls_the_store() {
        let sink = MemorySink::new();
        let retry = tiny_retry();
        let mut committer = BatchCommitter::new(&sink, &retry, "tok", 10);
        let mut stats = IngestStats::default();

        assert!(committer.flush(&mut stats).await.unwrap().is_none());
        assert_eq!(sink.submit_calls(), 0);
        assert_eq!(stats.batches, 0);
    }

    #[tokio::test]
    async fn a_full_batch_flushes_itself() {
        let sink = MemorySink::new();
        let retry = tiny_retry();
        let mut committer = BatchCommitter::new(&sink, &retry, "tok", 2);
        let mut stats = IngestStats::default();

        assert!(committer.push(record(1), &mut stats).await.unwrap().is_none());
        let flush = committer.push(record(2), &mut stats).await.unwrap().unwrap();
        assert_eq!(flush.submitted, 2);
        assert_eq!(committer.pending(), 0);

        committer.push(record(3), &mut stats).await.unwrap();
        assert_eq!(committer.pending(), 1);
        committer.flush(&mut stats).await.unwrap();
        assert_eq!(stats.new, 3);
        assert_eq!(stats.batches, 2);
    }
}
