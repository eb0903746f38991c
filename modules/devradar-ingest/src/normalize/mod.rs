//! Normalizers — raw item + source identity in, canonical record (or a
//! counted drop) out.
//!
//! One normalizer per source, paired with that source's adapter; nothing else
//! reads raw item internals. All of them are pure functions: no I/O, and
//! malformed input is data to drop with a reason, never a fault to raise.
//!
//! Checks run in a fixed order and short-circuit on the first failure:
//! required fields, source-specific filter predicates, field mapping, URL
//! resolution.

pub mod timestamp;

mod devpost;
mod devto;
mod feed;
mod github;
mod hackernews;
mod kaggle;
mod lobsters;
mod reddit;

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;

use devradar_common::{CanonicalRecord, RawItem, SourceDescriptor, SourceFilters, SourceType};

use timestamp::{epoch_seconds, parse_timestamp};

/// Longest summary the store cares about; the rest is noise for a feed view.
const SUMMARY_MAX: usize = 2000;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum NormalizeOutcome {
    Record(Box<CanonicalRecord>),
    Dropped(DropReason),
}

/// Why an item produced no record. Drops are counted as invalid, not as
/// failures, and every one is logged with its reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingTitle,
    MissingIdentity,
    NoUrl,
    /// A timestamp field was present but matched none of the known formats.
    /// Dropping beats defaulting to "now": a wrong recency poisons
    /// downstream queries, a missing item just waits for the next run.
    UnparsableTimestamp,
    Draft,
    Prerelease,
    /// Competition whose end date is already past.
    Ended,
    /// Published before this run's window start.
    OutsideWindow,
    /// No normalizer is registered for the source. Configuration smell,
    /// never a crash.
    UnsupportedSource,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::MissingTitle => "missing_title",
            DropReason::MissingIdentity => "missing_identity",
            DropReason::NoUrl => "no_url",
            DropReason::UnparsableTimestamp => "unparsable_timestamp",
            DropReason::Draft => "draft",
            DropReason::Prerelease => "prerelease",
            DropReason::Ended => "ended",
            DropReason::OutsideWindow => "outside_window",
            DropReason::UnsupportedSource => "unsupported_source",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Context + dispatch
// ---------------------------------------------------------------------------

/// Everything a normalizer may look at besides the raw item.
pub struct NormalizeContext<'a> {
    pub descriptor: &'a SourceDescriptor,
    pub filters: &'a SourceFilters,
    pub window_start: DateTime<Utc>,
    /// "Now" at processing time, for past-end checks.
    pub now: DateTime<Utc>,
}

pub fn normalize(raw: &RawItem, ctx: &NormalizeContext) -> NormalizeOutcome {
    if ctx.descriptor.source_type == SourceType::Feed {
        return feed::normalize(raw, ctx);
    }
    match ctx.descriptor.id {
        "github-releases" => github::normalize(raw, ctx),
        "devto-articles" => devto::normalize(raw, ctx),
        "lobsters-posts" => lobsters::normalize(raw, ctx),
        "reddit-posts" => reddit::normalize(raw, ctx),
        "hackernews-posts" => hackernews::normalize(raw, ctx),
        "kaggle-competitions" => kaggle::normalize(raw, ctx),
        "devpost-hackathons" => devpost::normalize(raw, ctx),
        other => {
            tracing::warn!(source = other, "No normalizer registered");
            NormalizeOutcome::Dropped(DropReason::UnsupportedSource)
        }
    }
}

// ---------------------------------------------------------------------------
// Field helpers shared by the per-source normalizers
// ---------------------------------------------------------------------------

/// A trimmed, non-empty string field.
fn non_blank(raw: &RawItem, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// A trimmed, non-empty string at a nested path.
fn nested_str(raw: &RawItem, path: &[&str]) -> Option<String> {
    let mut current = raw;
    for key in path {
        current = current.get(key)?;
    }
    current
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// String or number identity field, as a string.
fn id_string(raw: &RawItem, key: &str) -> Option<String> {
    match raw.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// String list that tolerates the shapes sources actually send: an array of
/// strings, an array of objects with a name-ish key, or one comma-separated
/// string. Absent or unknown shapes become an empty list, never null.
fn str_list(raw: &RawItem, key: &str) -> Vec<String> {
    match raw.get(key) {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Object(_) => v
                    .get("name")
                    .or_else(|| v.get("label"))
                    .or_else(|| v.get("ref"))
                    .and_then(|n| n.as_str())
                    .map(|s| s.trim().to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

/// An optional timestamp field. Absent/null is fine (`None`); present but
/// unparsable is a drop.
fn published_field(raw: &RawItem, key: &str) -> Result<Option<DateTime<Utc>>, DropReason> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => parse_timestamp(s)
            .map(Some)
            .ok_or(DropReason::UnparsableTimestamp),
        Some(Value::Number(n)) => n
            .as_f64()
            .and_then(|f| epoch_seconds(f as i64))
            .map(Some)
            .ok_or(DropReason::UnparsableTimestamp),
        Some(_) => Err(DropReason::UnparsableTimestamp),
    }
}

/// Truncate on a char boundary; long bodies don't belong in a summary field.
fn summary_of(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.len() <= SUMMARY_MAX {
        return Some(trimmed.to_string());
    }
    let mut end = SUMMARY_MAX;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    Some(trimmed[..end].to_string())
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn str_list_handles_array_object_and_csv_shapes() {
        let raw = json!({
            "plain": ["rust", "async"],
            "objects": [{ "name": "nlp" }, { "ref": "vision" }],
            "csv": "rust, webdev ,  ",
            "absent_is_empty": null,
        });
        assert_eq!(str_list(&raw, "plain"), vec!["rust", "async"]);
        assert_eq!(str_list(&raw, "objects"), vec!["nlp", "vision"]);
        assert_eq!(str_list(&raw, "csv"), vec!["rust", "webdev"]);
        assert!(str_list(&raw, "absent_is_empty").is_empty());
        assert!(str_list(&raw, "missing").is_empty());
    }

    #[test]
    fn published_field_absent_is_none_unparsable_is_drop() {
        let raw = json!({
            "ok": "2026-03-01T12:00:00Z",
            "bad": "three days ago",
            "epoch": 1767225600,
        });
        assert!(published_field(&raw, "missing").unwrap().is_none());
        assert!(published_field(&raw, "ok").unwrap().is_some());
        assert!(published_field(&raw, "epoch").unwrap().is_some());
        assert_eq!(
            published_field(&raw, "bad").unwrap_err(),
            DropReason::UnparsableTimestamp
        );
    }

    #[test]
    fn summary_respects_char_boundaries() {
        let long = "é".repeat(SUMMARY_MAX);
        let truncated = summary_of(&long).unwrap();
        assert!(truncated.len() <= SUMMARY_MAX);
        assert!(truncated.chars().all(|c| c == 'é'));
    }
}
