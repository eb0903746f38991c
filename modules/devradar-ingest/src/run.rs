//! Run coordinator — one sequential pipeline per source run.
//!
//! `STARTING → PAGING → COMMITTING → COMPLETED | FAILED`. A run either
//! completes having processed everything it could (drops and per-item
//! rejections are detail inside the stats) or aborts fatally because
//! upstream or store connectivity broke. There is no partial-success
//! terminal state.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use devradar_common::{RunState, SourceDescriptor, SourceFilters};

use crate::adapters::SourceAdapter;
use crate::committer::{BatchCommitter, FlushSummary, RecordSink};
use crate::cursor::PagingCursor;
use crate::dedup::{DedupGate, SeenIndex};
use crate::normalize::{normalize, NormalizeContext, NormalizeOutcome};
use crate::retry::RetryPolicy;
use crate::run_log::{EventKind, RunLog};
use crate::stats::{IngestReport, IngestStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Starting,
    Paging,
    Committing,
    Completed,
    Failed,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Starting => "starting",
            RunPhase::Paging => "paging",
            RunPhase::Committing => "committing",
            RunPhase::Completed => "completed",
            RunPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One source's ingest pipeline: cursor-driven fetch, normalize, dedup gate,
/// batch commit, stats rollup.
pub struct Pipeline<'a> {
    pub descriptor: &'a SourceDescriptor,
    pub adapter: &'a dyn SourceAdapter,
    pub sink: &'a dyn RecordSink,
    pub seen_index: Option<&'a dyn SeenIndex>,
    pub retry: RetryPolicy,
}

impl<'a> Pipeline<'a> {
    /// Execute one run. Never panics and never returns early without a
    /// report; the report's phase says how it ended.
    pub async fn run(
        &self,
        window_start: DateTime<Utc>,
        overrides: &SourceFilters,
    ) -> IngestReport {
        // STARTING: build the run identity before touching the network.
        let filters = self.descriptor.effective_filters(overrides);
        let run = RunState::new(self.descriptor.id, window_start, filters.clone());
        info!(
            source = self.descriptor.id,
            run_token = %run.run_token,
            window_start = %window_start,
            filters = %filters,
            "Ingest run starting"
        );

        let run_token = run.run_token.clone();
        let mut log = RunLog::new(run_token.clone(), self.descriptor.id.to_string());
        let mut stats = IngestStats::default();
        let gate = DedupGate::new(self.seen_index, self.descriptor, &run_token);
        let mut committer =
            BatchCommitter::new(self.sink, &self.retry, &run_token, self.descriptor.batch_size);
        let mut cursor = PagingCursor::new(self.descriptor, window_start, filters.page_size());
        let ctx = NormalizeContext {
            descriptor: self.descriptor,
            filters: &filters,
            window_start,
            now: Utc::now(),
        };

        loop {
            // PAGING
            let position = cursor.position();
            let page = match cursor.next_page(self.adapter, &filters, &self.retry).await {
                Ok(Some(page)) => page,
                Ok(None) => break,
                Err(e) => {
                    let position = e.position.clone();
                    return self.fail(
                        run,
                        stats,
                        log,
                        RunPhase::Paging,
                        e.to_string(),
                        Some(position),
                    );
                }
            };

            stats.pages += 1;
            stats.fetched += page.items.len() as u32;
            log.log(EventKind::PageFetched {
                position,
                items: page.items.len() as u32,
            });

            for item in &page.items {
                match normalize(item, &ctx) {
                    NormalizeOutcome::Dropped(reason) => {
                        stats.record_drop(reason);
                        debug!(source = self.descriptor.id, %reason, "Item dropped");
                        log.log(EventKind::ItemDropped {
                            reason: reason.as_str().to_string(),
                        });
                    }
                    NormalizeOutcome::Record(record) => {
                        stats.normalized += 1;
                        let key = record.dedup_key();
                        if gate.already_seen(&key).await {
                            stats.seen_hits += 1;
                            log.log(EventKind::SeenIndexHit {
                                key: key.to_string(),
                            });
                            continue;
                        }

                        // COMMITTING, when the push fills a batch
                        match committer.push(*record, &mut stats).await {
                            Ok(Some(flush)) => log_flush(&mut log, flush),
                            Ok(None) => {}
                            Err(e) => {
                                return self.fail(
                                    run,
                                    stats,
                                    log,
                                    RunPhase::Committing,
                                    e.to_string(),
                                    Some(cursor.position()),
                                );
                            }
                        }
                    }
                }
            }
        }

        // COMMITTING: the last, possibly short, batch.
        match committer.flush(&mut stats).await {
            Ok(Some(flush)) => log_flush(&mut log, flush),
            Ok(None) => {}
            Err(e) => {
                return self.fail(run, stats, log, RunPhase::Committing, e.to_string(), None)
            }
        }

        info!(source = self.descriptor.id, run_token = %run.run_token, "{stats}");
        if let Err(e) = log.save(&stats) {
            error!(error = %e, "Failed to save run log");
        }

        IngestReport {
            run,
            phase: RunPhase::Completed,
            stats,
            fatal: None,
            last_cursor: None,
            finished_at: Utc::now(),
        }
    }

    /// Fatal abort: connectivity is broken, the scheduler must see it.
    fn fail(
        &self,
        run: RunState,
        stats: IngestStats,
        mut log: RunLog,
        during: RunPhase,
        cause: String,
        last_cursor: Option<String>,
    ) -> IngestReport {
        error!(
            source = self.descriptor.id,
            run_token = %run.run_token,
            during = during.as_str(),
            cause = %cause,
            last_cursor = last_cursor.as_deref().unwrap_or("-"),
            "Ingest run failed"
        );
        log.log(EventKind::RunFailed {
            cause: cause.clone(),
            last_cursor: last_cursor.clone(),
        });
        if let Err(e) = log.save(&stats) {
            error!(error = %e, "Failed to save run log");
        }

        IngestReport {
            run,
            phase: RunPhase::Failed,
            stats,
            fatal: Some(cause),
            last_cursor,
            finished_at: Utc::now(),
        }
    }
}

fn log_flush(log: &mut RunLog, flush: FlushSummary) {
    log.log(EventKind::BatchCommitted {
        submitted: flush.submitted as u32,
        new: flush.new,
        duplicate: flush.duplicate,
        failed: flush.failed,
    });
}
