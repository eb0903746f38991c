use serde::{Deserialize, Serialize};
use uuid::Uuid;

use devradar_common::CanonicalRecord;

/// Store-side verdict for one record in a submitted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    New,
    Duplicate,
    Failed,
}

/// One record's outcome. The store commits items independently: a failed
/// item never rolls back its batch-mates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemOutcome {
    /// Dedup key echoed back by the store.
    pub key: String,
    pub status: ItemStatus,
    /// Store-assigned id for `new` items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// Rejection reason for `failed` items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BatchCounts {
    pub new: u32,
    pub duplicate: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitBatchResponse {
    pub outcomes: Vec<ItemOutcome>,
    pub counts: BatchCounts,
}

#[derive(Serialize)]
pub struct SubmitBatchRequest<'a> {
    pub run_token: &'a str,
    pub records: &'a [CanonicalRecord],
}

#[derive(Serialize)]
pub struct CheckAndMarkRequest<'a> {
    pub key: &'a str,
    pub ttl_seconds: u64,
    pub run_token: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckAndMarkResponse {
    pub already_seen: bool,
}
