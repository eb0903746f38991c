use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque source-specific payload. Only the paired normalizer for a source
/// understands its shape; nothing else inspects it.
pub type RawItem = serde_json::Value;

// --- Record kinds ---

/// What kind of item a source produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Release,
    Article,
    Post,
    Competition,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Release => "release",
            RecordKind::Article => "article",
            RecordKind::Post => "post",
            RecordKind::Competition => "competition",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the upstream API is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Api,
    Feed,
}

/// Pagination strategy for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationStyle {
    /// Page-number paging; exhausted when a page comes back short.
    Offset,
    /// Server-issued continuation token; exhausted when the token is absent.
    Token,
    /// Descending time order; exhausted when a page falls behind the window start.
    TimeWindow,
}

// --- Source descriptor ---

/// Configuration-time identity of one external source. Immutable.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    /// Stable id used in CLI args, run tokens, and logs (e.g. "github-releases").
    pub id: &'static str,
    /// Provider name stamped on every canonical record.
    pub provider: &'static str,
    pub kind: RecordKind,
    pub source_type: SourceType,
    pub pagination: PaginationStyle,
    /// Items requested per page. Sources tolerate 10-500 depending on rate limits.
    pub page_size: u32,
    /// Safety cap on pages per run, bounds backfill traversal of append-only feeds.
    pub max_pages: u32,
    /// Records accumulated before a store submit.
    pub batch_size: usize,
    pub request_timeout: Duration,
    /// Seen-index entry lifetime, sized to the source's realistic re-poll interval.
    pub seen_ttl: Duration,
    /// Baseline filters (feed_url, subreddit, ...) the trigger may override.
    pub default_filters: &'static [(&'static str, &'static str)],
}

impl SourceDescriptor {
    /// Merge the descriptor's baseline filters with per-run overrides.
    /// Trigger-supplied values win.
    pub fn effective_filters(&self, overrides: &SourceFilters) -> SourceFilters {
        let mut merged = SourceFilters::from_pairs(self.default_filters.iter().copied());
        merged.merge(overrides);
        merged
    }
}

// --- Canonical record ---

/// Unified, store-ready representation of one ingested item.
///
/// Built by exactly one normalizer, consumed by the batch committer.
/// `title` and `url` are non-blank by construction (the normalizer's
/// required-field check rejects items before this type exists).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub provider: String,
    pub kind: RecordKind,
    pub title: String,
    pub summary: Option<String>,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub external_id: Option<String>,
    pub source_type: SourceType,
    /// Source-specific lifecycle status ("published", "open", ...).
    pub status: String,
    pub tags: Vec<String>,
    pub author: Option<String>,
    /// Provider-specific leftovers worth keeping (counts, version strings, ...).
    pub extra: BTreeMap<String, String>,
}

impl CanonicalRecord {
    /// Identity used to recognize the same logical item across runs.
    pub fn dedup_key(&self) -> DedupKey {
        match &self.external_id {
            Some(id) => DedupKey::External {
                provider: self.provider.clone(),
                id: id.clone(),
            },
            None => DedupKey::Url {
                provider: self.provider.clone(),
                url: sanitize_url(&self.url),
            },
        }
    }
}

// --- Dedup key ---

/// `external_id` when the source hands one out, else `(provider, url)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    External { provider: String, id: String },
    Url { provider: String, url: String },
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupKey::External { provider, id } => write!(f, "{provider}:ext:{id}"),
            DedupKey::Url { provider, url } => write!(f, "{provider}:url:{url}"),
        }
    }
}

// --- Source filters ---

/// Free-form per-run source parameters (subreddit, tag, feed_url, page_size...).
///
/// Backed by a BTreeMap so the canonical rendering — and therefore the run
/// token — is deterministic regardless of argument order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFilters(BTreeMap<String, String>);

impl SourceFilters {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Overlay every entry of `other` onto self.
    pub fn merge(&mut self, other: &SourceFilters) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// Per-run page size override, when the trigger asks for one.
    pub fn page_size(&self) -> Option<u32> {
        self.get("page_size").and_then(|v| v.parse().ok())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical `k=v,k=v` rendering used for run-token derivation and logs.
    pub fn canonical(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for SourceFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

// --- Run state ---

/// Per-invocation identity: one scheduled execution of the pipeline for one
/// source. Read-only after construction, discarded at run end.
#[derive(Debug, Clone)]
pub struct RunState {
    pub source_id: String,
    pub window_start: DateTime<Utc>,
    pub filters: SourceFilters,
    pub started_at: DateTime<Utc>,
    /// Deterministic over (source, window, filters): two invocations with
    /// identical parameters are the same logical run for observability.
    /// Not a lock — concurrent identical runs are tolerated.
    pub run_token: String,
}

impl RunState {
    pub fn new(source_id: &str, window_start: DateTime<Utc>, filters: SourceFilters) -> Self {
        let run_token = run_token(source_id, window_start, &filters);
        Self {
            source_id: source_id.to_string(),
            window_start,
            filters,
            started_at: Utc::now(),
            run_token,
        }
    }
}

/// Fast hash for run identity. Not cryptographic.
pub fn run_token(source_id: &str, window_start: DateTime<Utc>, filters: &SourceFilters) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    source_id.hash(&mut hasher);
    window_start.timestamp().hash(&mut hasher);
    filters.canonical().hash(&mut hasher);
    format!("{source_id}-{:016x}", hasher.finish())
}

// --- URL sanitization ---

/// Strip tracking parameters that would split one logical item into several
/// dedup identities.
pub fn sanitize_url(url: &str) -> String {
    const TRACKING_PARAMS: &[&str] = &[
        "fbclid",
        "gclid",
        "utm_source",
        "utm_medium",
        "utm_campaign",
        "utm_term",
        "utm_content",
        "ref",
        "mc_cid",
        "mc_eid",
    ];

    let Ok(mut parsed) = url::Url::parse(url) else {
        return url.to_string();
    };

    if parsed.query().is_none() {
        return url.to_string();
    }

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        let query: String = kept
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        parsed.set_query(Some(&query));
    }

    parsed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(external_id: Option<&str>, url: &str) -> CanonicalRecord {
        CanonicalRecord {
            provider: "github".to_string(),
            kind: RecordKind::Release,
            title: "v1.0".to_string(),
            summary: None,
            url: url.to_string(),
            published_at: None,
            external_id: external_id.map(String::from),
            source_type: SourceType::Api,
            status: "published".to_string(),
            tags: vec![],
            author: None,
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn dedup_key_prefers_external_id() {
        let r = record(Some("123"), "https://github.com/a/b/releases/1");
        assert_eq!(r.dedup_key().to_string(), "github:ext:123");
    }

    #[test]
    fn dedup_key_falls_back_to_url() {
        let r = record(None, "https://github.com/a/b/releases/1?utm_source=feed");
        assert_eq!(
            r.dedup_key().to_string(),
            "github:url:https://github.com/a/b/releases/1"
        );
    }

    #[test]
    fn equal_keys_across_runs_regardless_of_other_fields() {
        let mut a = record(Some("42"), "https://example.com/x");
        let mut b = record(Some("42"), "https://example.com/y");
        a.title = "first run".to_string();
        b.title = "second run".to_string();
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn run_token_deterministic_for_identical_parameters() {
        let window = Utc::now();
        let filters = SourceFilters::from_pairs([("subreddit", "rust"), ("page_size", "50")]);
        let a = run_token("reddit-posts", window, &filters);
        let b = run_token("reddit-posts", window, &filters);
        assert_eq!(a, b);
        assert!(a.starts_with("reddit-posts-"));
    }

    #[test]
    fn run_token_changes_with_filters() {
        let window = Utc::now();
        let a = run_token("reddit-posts", window, &SourceFilters::from_pairs([("subreddit", "rust")]));
        let b = run_token("reddit-posts", window, &SourceFilters::from_pairs([("subreddit", "golang")]));
        assert_ne!(a, b);
    }

    #[test]
    fn filters_canonical_is_order_independent() {
        let a = SourceFilters::from_pairs([("tag", "rust"), ("page_size", "30")]);
        let b = SourceFilters::from_pairs([("page_size", "30"), ("tag", "rust")]);
        assert_eq!(a.canonical(), b.canonical());
        assert_eq!(a.canonical(), "page_size=30,tag=rust");
    }

    #[test]
    fn sanitize_url_strips_tracking_params() {
        assert_eq!(
            sanitize_url("https://dev.to/article?utm_source=rss&utm_medium=feed"),
            "https://dev.to/article"
        );
        assert_eq!(
            sanitize_url("https://dev.to/article?page=2&utm_source=rss"),
            "https://dev.to/article?page=2"
        );
    }

    #[test]
    fn sanitize_url_leaves_unparsable_input_alone() {
        assert_eq!(sanitize_url("not a url"), "not a url");
    }
}
