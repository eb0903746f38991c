// Test mocks for the ingest pipeline.
//
// Three mocks matching the three trait boundaries:
// - ScriptedAdapter (SourceAdapter) — queued pages and injected failures
// - MemorySink (RecordSink) — stateful in-memory store with idempotent insert
// - MemorySeenIndex (SeenIndex) — in-process check-and-mark with TTL
//
// These enable deterministic pipeline tests: no network, no store, no clock
// games beyond millisecond retry policies.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use devradar_common::{CanonicalRecord, SourceFilters};
use devradar_store::{BatchCounts, ItemOutcome, ItemStatus, StoreError, SubmitBatchResponse};

use crate::adapters::{FetchError, SourceAdapter};
use crate::committer::RecordSink;
use crate::cursor::{PageRequest, RawPage};

pub use crate::dedup::memory::MemorySeenIndex;

// ---------------------------------------------------------------------------
// ScriptedAdapter
// ---------------------------------------------------------------------------

enum Step {
    Page(RawPage),
    Transient(String),
    Fatal(String),
}

/// Queue-scripted source adapter. Each fetch pops the next step; an empty
/// queue serves empty pages, which every cursor style reads as exhaustion.
/// Builder pattern: `.page()`, `.transient_failure()`, `.fatal_failure()`.
#[derive(Default)]
pub struct ScriptedAdapter {
    script: Mutex<VecDeque<Step>>,
    fetch_calls: AtomicU32,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, page: RawPage) -> Self {
        self.script.lock().unwrap().push_back(Step::Page(page));
        self
    }

    pub fn transient_failure(self, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Step::Transient(message.to_string()));
        self
    }

    pub fn fatal_failure(self, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Step::Fatal(message.to_string()));
        self
    }

    pub fn fetch_calls(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for ScriptedAdapter {
    async fn fetch_page(
        &self,
        _request: &PageRequest,
        _filters: &SourceFilters,
    ) -> Result<RawPage, FetchError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(Step::Page(page)) => Ok(page),
            Some(Step::Transient(message)) => Err(FetchError::Transient(message)),
            Some(Step::Fatal(message)) => Err(FetchError::Fatal(message)),
            None => Ok(RawPage::default()),
        }
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// In-memory record store with the boundary's contract: idempotent insert by
/// dedup key, per-item independent commit, injectable transport and
/// validation failures.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<HashMap<String, CanonicalRecord>>,
    fail_keys: Mutex<HashSet<String>>,
    transport_failures: AtomicU32,
    submit_calls: AtomicU32,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records with this dedup key fail store-side validation.
    pub fn fail_key(&self, key: &str) {
        self.fail_keys.lock().unwrap().insert(key.to_string());
    }

    /// The next `n` submit calls fail at the transport level.
    pub fn fail_transport_times(&self, n: u32) {
        self.transport_failures.store(n, Ordering::SeqCst);
    }

    pub fn stored(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn submit(
        &self,
        _run_token: &str,
        records: &[CanonicalRecord],
    ) -> Result<SubmitBatchResponse, StoreError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);

        if self.transport_failures.load(Ordering::SeqCst) > 0 {
            self.transport_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(StoreError::Api {
                status: 503,
                message: "injected transport failure".to_string(),
            });
        }

        let fail_keys = self.fail_keys.lock().unwrap().clone();
        let mut stored = self.records.lock().unwrap();
        let mut outcomes = Vec::with_capacity(records.len());
        let mut counts = BatchCounts::default();

        for record in records {
            let key = record.dedup_key().to_string();
            if fail_keys.contains(&key) {
                counts.failed += 1;
                outcomes.push(ItemOutcome {
                    key,
                    status: ItemStatus::Failed,
                    id: None,
                    reason: Some("validation failed".to_string()),
                });
            } else if stored.contains_key(&key) {
                counts.duplicate += 1;
                outcomes.push(ItemOutcome {
                    key,
                    status: ItemStatus::Duplicate,
                    id: None,
                    reason: None,
                });
            } else {
                stored.insert(key.clone(), record.clone());
                counts.new += 1;
                outcomes.push(ItemOutcome {
                    key,
                    status: ItemStatus::New,
                    id: Some(uuid::Uuid::new_v4()),
                    reason: None,
                });
            }
        }

        Ok(SubmitBatchResponse { outcomes, counts })
    }
}
