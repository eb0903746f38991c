//! Per-run statistics and the final report.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

use devradar_common::RunState;

use crate::normalize::DropReason;
use crate::run::RunPhase;

/// Counters rolled up across one source run.
#[derive(Debug, Default, Clone)]
pub struct IngestStats {
    pub pages: u32,
    pub fetched: u32,
    pub normalized: u32,
    /// Items the normalizer rejected. Never retried, never fatal.
    pub invalid: u32,
    /// Per-reason breakdown of `invalid`.
    pub drops: BTreeMap<&'static str, u32>,
    /// Records skipped by the local seen-index before any store round-trip.
    pub seen_hits: u32,
    pub batches: u32,
    pub new: u32,
    pub duplicate: u32,
    pub failed: u32,
    /// Normalized records with no publication timestamp (data-quality signal).
    pub missing_published: u32,
    pub failure_messages: Vec<String>,
}

impl IngestStats {
    pub fn record_drop(&mut self, reason: DropReason) {
        self.invalid += 1;
        *self.drops.entry(reason.as_str()).or_insert(0) += 1;
    }
}

impl fmt::Display for IngestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n=== Ingest Run Complete ===")?;
        writeln!(f, "Pages fetched:      {}", self.pages)?;
        writeln!(f, "Items fetched:      {}", self.fetched)?;
        writeln!(f, "Normalized:         {}", self.normalized)?;
        writeln!(f, "Invalid (dropped):  {}", self.invalid)?;
        writeln!(f, "Seen-index hits:    {}", self.seen_hits)?;
        writeln!(f, "Batches committed:  {}", self.batches)?;
        writeln!(f, "New:                {}", self.new)?;
        writeln!(f, "Duplicate at store: {}", self.duplicate)?;
        writeln!(f, "Failed:             {}", self.failed)?;
        if !self.drops.is_empty() {
            writeln!(f, "\nDrops by reason:")?;
            for (reason, count) in &self.drops {
                writeln!(f, "  {reason}: {count}")?;
            }
        }
        if !self.failure_messages.is_empty() {
            writeln!(f, "\nFailures:")?;
            for message in &self.failure_messages {
                writeln!(f, "  {message}")?;
            }
        }
        Ok(())
    }
}

/// The run's terminal outcome — the one output the scheduler and operators see.
#[derive(Debug)]
pub struct IngestReport {
    pub run: RunState,
    pub phase: RunPhase,
    pub stats: IngestStats,
    /// Set when the run aborted: upstream or store connectivity broke.
    pub fatal: Option<String>,
    /// Last good cursor position, bounding the cost of a manual re-run.
    pub last_cursor: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl IngestReport {
    pub fn is_failed(&self) -> bool {
        self.phase == RunPhase::Failed
    }
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] run {} finished {}",
            self.run.source_id, self.run.run_token, self.phase
        )?;
        if let Some(ref cause) = self.fatal {
            write!(f, "\nFatal: {cause}")?;
            if let Some(ref cursor) = self.last_cursor {
                write!(f, " (last good position: {cursor})")?;
            }
        }
        write!(f, "{}", self.stats)
    }
}
