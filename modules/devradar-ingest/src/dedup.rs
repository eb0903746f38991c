//! Dedup gate — best-effort pre-check against the shared seen-index.
//!
//! A hit saves a store round-trip; a miss optimistically marks the key before
//! the store confirms the write. The gate is an optimization only: marking is
//! optimistic and the index can be down, so the store's own idempotent insert
//! stays the single source of dedup truth.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use devradar_common::{DedupKey, SourceDescriptor};

// ---------------------------------------------------------------------------
// SeenIndex — shared key-value boundary
// ---------------------------------------------------------------------------

/// Atomic check-and-mark against a shared, externally-synchronized key-value
/// store. Entries expire on their own TTL, so a dead run cannot permanently
/// blacklist a key.
#[async_trait]
pub trait SeenIndex: Send + Sync {
    async fn check_and_mark(
        &self,
        key: &str,
        ttl: Duration,
        run_token: &str,
    ) -> anyhow::Result<bool>;
}

#[async_trait]
impl SeenIndex for devradar_store::SeenIndexClient {
    async fn check_and_mark(
        &self,
        key: &str,
        ttl: Duration,
        run_token: &str,
    ) -> anyhow::Result<bool> {
        Ok(devradar_store::SeenIndexClient::check_and_mark(self, key, ttl, run_token).await?)
    }
}

// ---------------------------------------------------------------------------
// DedupGate
// ---------------------------------------------------------------------------

pub struct DedupGate<'a> {
    index: Option<&'a dyn SeenIndex>,
    ttl: Duration,
    run_token: &'a str,
}

impl<'a> DedupGate<'a> {
    pub fn new(
        index: Option<&'a dyn SeenIndex>,
        descriptor: &SourceDescriptor,
        run_token: &'a str,
    ) -> Self {
        Self {
            index,
            ttl: descriptor.seen_ttl,
            run_token,
        }
    }

    /// Whether a record with this key was already ingested recently.
    ///
    /// An unavailable index means "not seen": the record flows through and
    /// the store dedups it authoritatively. Only the saved round-trip is lost.
    pub async fn already_seen(&self, key: &DedupKey) -> bool {
        let Some(index) = self.index else {
            return false;
        };
        let key = key.to_string();
        match index.check_and_mark(&key, self.ttl, self.run_token).await {
            Ok(seen) => {
                if seen {
                    debug!(key, "Seen-index hit, skipping store submit");
                }
                seen
            }
            Err(e) => {
                warn!(key, error = %e, "Seen-index unavailable, passing record through");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MemorySeenIndex — tests and degraded single-process mode
// ---------------------------------------------------------------------------

pub mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use async_trait::async_trait;

    use super::SeenIndex;

    /// In-process check-and-mark with real TTL expiry. Mirrors the external
    /// index's atomicity with a mutex; good enough for tests and one-process
    /// runs, useless across processes.
    #[derive(Default)]
    pub struct MemorySeenIndex {
        entries: Mutex<HashMap<String, Instant>>,
        unavailable: Mutex<bool>,
    }

    impl MemorySeenIndex {
        pub fn new() -> Self {
            Self::default()
        }

        /// Simulate an index outage; subsequent calls error.
        pub fn set_unavailable(&self, unavailable: bool) {
            *self.unavailable.lock().unwrap() = unavailable;
        }

        pub fn len(&self) -> usize {
            self.entries.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    #[async_trait]
    impl SeenIndex for MemorySeenIndex {
        async fn check_and_mark(
            &self,
            key: &str,
            ttl: Duration,
            _run_token: &str,
        ) -> anyhow::Result<bool> {
            if *self.unavailable.lock().unwrap() {
                anyhow::bail!("seen-index unavailable");
            }
            let mut entries = self.entries.lock().unwrap();
            let now = Instant::now();
            let live = entries.get(key).map(|expiry| *expiry > now).unwrap_or(false);
            if !live {
                entries.insert(key.to_string(), now + ttl);
            }
            Ok(live)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemorySeenIndex;
    use super::*;

    fn key(id: &str) -> DedupKey {
        DedupKey::External {
            provider: "github".to_string(),
            id: id.to_string(),
        }
    }

    fn descriptor() -> SourceDescriptor {
        crate::sources::source_descriptor("github-releases").unwrap()
    }

    #[tokio::test]
    async fn first_sight_marks_second_sight_hits() {
        let index = MemorySeenIndex::new();
        let desc = descriptor();
        let gate = DedupGate::new(Some(&index), &desc, "tok");

        assert!(!gate.already_seen(&key("1")).await);
        assert!(gate.already_seen(&key("1")).await);
        assert!(!gate.already_seen(&key("2")).await);
    }

    #[tokio::test]
    async fn expired_entries_read_as_unseen() {
        let index = MemorySeenIndex::new();
        // Zero TTL expires immediately.
        assert!(!index
            .check_and_mark("k", Duration::ZERO, "tok")
            .await
            .unwrap());
        assert!(!index
            .check_and_mark("k", Duration::ZERO, "tok")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn unavailable_index_passes_records_through() {
        let index = MemorySeenIndex::new();
        index.set_unavailable(true);
        let desc = descriptor();
        let gate = DedupGate::new(Some(&index), &desc, "tok");

        assert!(!gate.already_seen(&key("1")).await);
        assert!(!gate.already_seen(&key("1")).await);
    }

    #[tokio::test]
    async fn disabled_gate_never_reports_seen() {
        let desc = descriptor();
        let gate = DedupGate::new(None, &desc, "tok");
        assert!(!gate.already_seen(&key("1")).await);
    }
}
