//! Lobsters story → canonical record.

use std::collections::BTreeMap;

use serde_json::Value;

use devradar_common::{CanonicalRecord, RawItem};

use super::{
    non_blank, published_field, str_list, summary_of, DropReason, NormalizeContext,
    NormalizeOutcome,
};

pub(super) fn normalize(raw: &RawItem, ctx: &NormalizeContext) -> NormalizeOutcome {
    let Some(title) = non_blank(raw, "title") else {
        return NormalizeOutcome::Dropped(DropReason::MissingTitle);
    };

    let external_id = non_blank(raw, "short_id");
    // Text posts have a blank "url"; the comments page is still the item.
    let url = non_blank(raw, "url")
        .or_else(|| non_blank(raw, "comments_url"))
        .or_else(|| non_blank(raw, "short_id_url"));
    if external_id.is_none() && url.is_none() {
        return NormalizeOutcome::Dropped(DropReason::MissingIdentity);
    }

    let published_at = match published_field(raw, "created_at") {
        Ok(t) => t,
        Err(reason) => return NormalizeOutcome::Dropped(reason),
    };

    let Some(url) = url else {
        return NormalizeOutcome::Dropped(DropReason::NoUrl);
    };

    // Submitter is a plain username in current payloads, an object in older ones.
    let author = match raw.get("submitter_user") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Object(map)) => map
            .get("username")
            .and_then(|v| v.as_str())
            .map(String::from),
        _ => None,
    };

    let mut extra = BTreeMap::new();
    if let Some(score) = raw.get("score").and_then(|v| v.as_i64()) {
        extra.insert("score".to_string(), score.to_string());
    }
    if let Some(comments) = raw.get("comment_count").and_then(|v| v.as_i64()) {
        extra.insert("comments".to_string(), comments.to_string());
    }

    NormalizeOutcome::Record(Box::new(CanonicalRecord {
        provider: ctx.descriptor.provider.to_string(),
        kind: ctx.descriptor.kind,
        title,
        summary: raw
            .get("description")
            .and_then(|v| v.as_str())
            .and_then(summary_of),
        url,
        published_at,
        external_id,
        source_type: ctx.descriptor.source_type,
        status: "active".to_string(),
        tags: str_list(raw, "tags"),
        author,
        extra,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::testctx::ctx;
    use serde_json::json;

    #[test]
    fn text_post_falls_back_to_comments_url() {
        let binding = ctx("lobsters-posts");
        let raw = json!({
            "short_id": "abc123",
            "title": "What are you working on?",
            "url": "",
            "comments_url": "https://lobste.rs/s/abc123/what_are_you_working_on",
            "created_at": "2026-02-03T12:00:00-05:00",
            "tags": ["ask"],
            "submitter_user": "erin",
            "score": 40,
            "comment_count": 60
        });
        let NormalizeOutcome::Record(record) = normalize(&raw, &binding.context()) else {
            panic!("expected a record");
        };
        assert_eq!(record.url, "https://lobste.rs/s/abc123/what_are_you_working_on");
        assert_eq!(record.author.as_deref(), Some("erin"));
        assert_eq!(record.tags, vec!["ask"]);
    }

    #[test]
    fn object_shaped_submitter_still_maps() {
        let binding = ctx("lobsters-posts");
        let raw = json!({
            "short_id": "def456",
            "title": "A story",
            "url": "https://example.com/story",
            "created_at": "2026-02-03T12:00:00-05:00",
            "submitter_user": { "username": "frank" }
        });
        let NormalizeOutcome::Record(record) = normalize(&raw, &binding.context()) else {
            panic!("expected a record");
        };
        assert_eq!(record.author.as_deref(), Some("frank"));
    }
}
