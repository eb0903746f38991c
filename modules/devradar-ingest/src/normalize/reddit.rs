//! Reddit listing child → canonical record.
//!
//! Items arrive as the listing children (`{kind, data}`); everything useful
//! lives under `data`.

use std::collections::BTreeMap;

use devradar_common::{CanonicalRecord, RawItem};

use super::{
    non_blank, published_field, summary_of, DropReason, NormalizeContext, NormalizeOutcome,
};

pub(super) fn normalize(raw: &RawItem, ctx: &NormalizeContext) -> NormalizeOutcome {
    let Some(data) = raw.get("data") else {
        return NormalizeOutcome::Dropped(DropReason::MissingTitle);
    };

    let Some(title) = non_blank(data, "title") else {
        return NormalizeOutcome::Dropped(DropReason::MissingTitle);
    };

    let external_id = non_blank(data, "name");
    let permalink = non_blank(data, "permalink");
    if external_id.is_none() && permalink.is_none() && non_blank(data, "url").is_none() {
        return NormalizeOutcome::Dropped(DropReason::MissingIdentity);
    }

    let published_at = match published_field(data, "created_utc") {
        Ok(t) => t,
        Err(reason) => return NormalizeOutcome::Dropped(reason),
    };

    // Token paging has no window stop; old posts are filtered here instead.
    if let Some(t) = published_at {
        if t < ctx.window_start {
            return NormalizeOutcome::Dropped(DropReason::OutsideWindow);
        }
    }

    let url = match permalink {
        Some(p) => format!("https://www.reddit.com{p}"),
        None => match non_blank(data, "url") {
            Some(u) => u,
            None => return NormalizeOutcome::Dropped(DropReason::NoUrl),
        },
    };

    let mut tags = Vec::new();
    if let Some(subreddit) = non_blank(data, "subreddit") {
        tags.push(subreddit);
    }
    if let Some(flair) = non_blank(data, "link_flair_text") {
        tags.push(flair);
    }

    let mut extra = BTreeMap::new();
    if let Some(score) = data.get("score").and_then(|v| v.as_i64()) {
        extra.insert("score".to_string(), score.to_string());
    }
    if let Some(comments) = data.get("num_comments").and_then(|v| v.as_i64()) {
        extra.insert("comments".to_string(), comments.to_string());
    }

    NormalizeOutcome::Record(Box::new(CanonicalRecord {
        provider: ctx.descriptor.provider.to_string(),
        kind: ctx.descriptor.kind,
        title,
        summary: data
            .get("selftext")
            .and_then(|v| v.as_str())
            .and_then(summary_of),
        url,
        published_at,
        external_id,
        source_type: ctx.descriptor.source_type,
        status: "active".to_string(),
        tags,
        author: non_blank(data, "author"),
        extra,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::testctx::ctx;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn post(created: chrono::DateTime<Utc>) -> serde_json::Value {
        json!({
            "kind": "t3",
            "data": {
                "name": "t3_xyz",
                "title": "Show: a tiny allocator",
                "permalink": "/r/rust/comments/xyz/show_a_tiny_allocator/",
                "url": "https://example.com/alloc",
                "created_utc": created.timestamp(),
                "subreddit": "rust",
                "link_flair_text": "project",
                "author": "lowbit",
                "selftext": "",
                "score": 128,
                "num_comments": 14
            }
        })
    }

    #[test]
    fn permalink_builds_the_canonical_url() {
        let binding = ctx("reddit-posts");
        let raw = post(Utc::now() - Duration::hours(2));
        let NormalizeOutcome::Record(record) = normalize(&raw, &binding.context()) else {
            panic!("expected a record");
        };
        assert_eq!(
            record.url,
            "https://www.reddit.com/r/rust/comments/xyz/show_a_tiny_allocator/"
        );
        assert_eq!(record.external_id.as_deref(), Some("t3_xyz"));
        assert_eq!(record.tags, vec!["rust", "project"]);
        assert!(record.summary.is_none());
    }

    #[test]
    fn posts_behind_the_window_are_dropped() {
        let binding = ctx("reddit-posts");
        let raw = post(Utc::now() - Duration::days(30));
        assert!(matches!(
            normalize(&raw, &binding.context()),
            NormalizeOutcome::Dropped(DropReason::OutsideWindow)
        ));
    }

    #[test]
    fn child_without_data_is_dropped() {
        let binding = ctx("reddit-posts");
        let raw = json!({ "kind": "t3" });
        assert!(matches!(
            normalize(&raw, &binding.context()),
            NormalizeOutcome::Dropped(DropReason::MissingTitle)
        ));
    }
}
