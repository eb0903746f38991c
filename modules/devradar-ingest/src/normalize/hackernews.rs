//! Hacker News Algolia hit → canonical record.

use std::collections::BTreeMap;

use devradar_common::{CanonicalRecord, RawItem};

use super::{non_blank, published_field, DropReason, NormalizeContext, NormalizeOutcome};

pub(super) fn normalize(raw: &RawItem, ctx: &NormalizeContext) -> NormalizeOutcome {
    let Some(title) = non_blank(raw, "title") else {
        return NormalizeOutcome::Dropped(DropReason::MissingTitle);
    };

    let Some(object_id) = non_blank(raw, "objectID") else {
        return NormalizeOutcome::Dropped(DropReason::MissingIdentity);
    };

    let published_at = match published_field(raw, "created_at") {
        Ok(Some(t)) => Some(t),
        Ok(None) => match published_field(raw, "created_at_i") {
            Ok(t) => t,
            Err(reason) => return NormalizeOutcome::Dropped(reason),
        },
        Err(reason) => return NormalizeOutcome::Dropped(reason),
    };

    if let Some(t) = published_at {
        if t < ctx.window_start {
            return NormalizeOutcome::Dropped(DropReason::OutsideWindow);
        }
    }

    // Ask/Show posts carry no external URL; the item page is the item.
    let url = non_blank(raw, "url")
        .unwrap_or_else(|| format!("https://news.ycombinator.com/item?id={object_id}"));

    let mut extra = BTreeMap::new();
    if let Some(points) = raw.get("points").and_then(|v| v.as_i64()) {
        extra.insert("points".to_string(), points.to_string());
    }
    if let Some(comments) = raw.get("num_comments").and_then(|v| v.as_i64()) {
        extra.insert("comments".to_string(), comments.to_string());
    }

    NormalizeOutcome::Record(Box::new(CanonicalRecord {
        provider: ctx.descriptor.provider.to_string(),
        kind: ctx.descriptor.kind,
        title,
        summary: None,
        url,
        published_at,
        external_id: Some(object_id),
        source_type: ctx.descriptor.source_type,
        status: "active".to_string(),
        tags: Vec::new(),
        author: non_blank(raw, "author"),
        extra,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::testctx::ctx;
    use chrono::{Duration, Utc};
    use serde_json::json;

    #[test]
    fn ask_hn_without_url_gets_the_item_page() {
        let binding = ctx("hackernews-posts");
        let raw = json!({
            "objectID": "39200001",
            "title": "Ask HN: Favorite profiler?",
            "created_at_i": (Utc::now() - Duration::hours(1)).timestamp(),
            "author": "pg",
            "points": 99
        });
        let NormalizeOutcome::Record(record) = normalize(&raw, &binding.context()) else {
            panic!("expected a record");
        };
        assert_eq!(record.url, "https://news.ycombinator.com/item?id=39200001");
        assert_eq!(record.external_id.as_deref(), Some("39200001"));
    }

    #[test]
    fn missing_object_id_is_missing_identity() {
        let binding = ctx("hackernews-posts");
        let raw = json!({ "title": "No id", "url": "https://example.com" });
        assert!(matches!(
            normalize(&raw, &binding.context()),
            NormalizeOutcome::Dropped(DropReason::MissingIdentity)
        ));
    }

    #[test]
    fn stale_hits_are_window_filtered() {
        let binding = ctx("hackernews-posts");
        let raw = json!({
            "objectID": "100",
            "title": "Old news",
            "created_at_i": (Utc::now() - Duration::days(60)).timestamp()
        });
        assert!(matches!(
            normalize(&raw, &binding.context()),
            NormalizeOutcome::Dropped(DropReason::OutsideWindow)
        ));
    }
}
