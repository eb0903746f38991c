//! Ingest run log — persisted JSON timeline of every action taken during a run.
//!
//! Each run produces a single `{DATA_DIR}/ingest-runs/{source}/{token}-{ts}.json`
//! file containing an ordered list of events with timestamps. Repeated runs
//! with identical parameters share a token but not a file.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::stats::IngestStats;

// ---------------------------------------------------------------------------
// data_dir helper
// ---------------------------------------------------------------------------

/// Root data directory, controlled by `DATA_DIR` env var (default: `"data"`).
pub fn data_dir() -> PathBuf {
    PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()))
}

// ---------------------------------------------------------------------------
// RunLog
// ---------------------------------------------------------------------------

pub struct RunLog {
    pub run_token: String,
    pub source_id: String,
    pub started_at: DateTime<Utc>,
    events: Vec<RunEvent>,
    seq: u32,
}

#[derive(Serialize)]
struct RunEvent {
    seq: u32,
    ts: DateTime<Utc>,
    #[serde(flatten)]
    kind: EventKind,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    PageFetched {
        position: String,
        items: u32,
    },
    ItemDropped {
        reason: String,
    },
    SeenIndexHit {
        key: String,
    },
    BatchCommitted {
        submitted: u32,
        new: u32,
        duplicate: u32,
        failed: u32,
    },
    RunFailed {
        cause: String,
        last_cursor: Option<String>,
    },
}

impl RunLog {
    pub fn new(run_token: String, source_id: String) -> Self {
        Self {
            run_token,
            source_id,
            started_at: Utc::now(),
            events: Vec::new(),
            seq: 0,
        }
    }

    pub fn log(&mut self, kind: EventKind) {
        self.events.push(RunEvent {
            seq: self.seq,
            ts: Utc::now(),
            kind,
        });
        self.seq += 1;
    }

    /// Serialize the run log to JSON and write to disk.
    /// Returns the file path on success.
    pub fn save(&self, stats: &IngestStats) -> Result<PathBuf> {
        let dir = data_dir().join("ingest-runs").join(&self.source_id);
        std::fs::create_dir_all(&dir)?;

        let path = dir.join(format!(
            "{}-{}.json",
            self.run_token,
            self.started_at.timestamp()
        ));

        let output = SerializedRunLog {
            run_token: &self.run_token,
            source_id: &self.source_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            stats: SerializedStats::from(stats),
            events: &self.events,
        };

        std::fs::write(&path, serde_json::to_string_pretty(&output)?)?;
        info!(path = %path.display(), events = self.events.len(), "Ingest run log saved");

        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Serialization wrappers
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SerializedRunLog<'a> {
    run_token: &'a str,
    source_id: &'a str,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    stats: SerializedStats,
    events: &'a [RunEvent],
}

#[derive(Serialize)]
struct SerializedStats {
    pages: u32,
    fetched: u32,
    normalized: u32,
    invalid: u32,
    seen_hits: u32,
    batches: u32,
    new: u32,
    duplicate: u32,
    failed: u32,
    missing_published: u32,
}

impl From<&IngestStats> for SerializedStats {
    fn from(s: &IngestStats) -> Self {
        Self {
            pages: s.pages,
            fetched: s.fetched,
            normalized: s.normalized,
            invalid: s.invalid,
            seen_hits: s.seen_hits,
            batches: s.batches,
            new: s.new,
            duplicate: s.duplicate,
            failed: s.failed,
            missing_published: s.missing_published,
        }
    }
}
