//! Generic RSS/Atom adapter — one fetch per run, shared by every feed source.
//!
//! Feeds aren't paginated; descriptors cap them at one page and the
//! time-window cursor stops after it. Entries are flattened to a stable JSON
//! shape here so the feed normalizer doesn't depend on feed-rs types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use devradar_common::SourceFilters;

use crate::adapters::{required_filter, ApiClient, FetchError, SourceAdapter};
use crate::cursor::{PageRequest, RawPage};

pub struct FeedAdapter {
    http: ApiClient,
}

impl FeedAdapter {
    pub fn new(http: ApiClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SourceAdapter for FeedAdapter {
    async fn fetch_page(
        &self,
        _request: &PageRequest,
        filters: &SourceFilters,
    ) -> Result<RawPage, FetchError> {
        let feed_url = required_filter(filters, "feed_url")?;

        let body = self.http.get_text(feed_url).await?;
        let feed = feed_rs::parser::parse(body.as_bytes())
            .map_err(|e| FetchError::Fatal(format!("unparsable feed: {e}")))?;

        let mut oldest_published: Option<DateTime<Utc>> = None;
        let items = feed
            .entries
            .into_iter()
            .map(|entry| {
                let published = entry.published.or(entry.updated);
                if let Some(t) = published {
                    oldest_published = Some(oldest_published.map_or(t, |o| o.min(t)));
                }
                json!({
                    "id": entry.id,
                    "title": entry.title.map(|t| t.content),
                    "url": entry.links.first().map(|l| l.href.clone()),
                    "summary": entry.summary.map(|t| t.content),
                    "published": published.map(|t| t.to_rfc3339()),
                    "author": entry.authors.first().map(|p| p.name.clone()),
                    "categories": entry
                        .categories
                        .iter()
                        .map(|c| c.label.clone().unwrap_or_else(|| c.term.clone()))
                        .collect::<Vec<_>>(),
                })
            })
            .collect::<Vec<_>>();

        tracing::debug!(feed_url, items = items.len(), "Fetched feed");
        Ok(RawPage {
            items,
            next_token: None,
            oldest_published,
        })
    }
}
