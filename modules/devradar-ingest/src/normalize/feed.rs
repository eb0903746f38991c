//! Feed entry → canonical record. Shared by every RSS/Atom source; the kind
//! comes from the descriptor (release feeds and article feeds flow through
//! the same shape).

use std::collections::BTreeMap;

use devradar_common::{CanonicalRecord, RawItem};

use super::{
    non_blank, published_field, str_list, summary_of, DropReason, NormalizeContext,
    NormalizeOutcome,
};

pub(super) fn normalize(raw: &RawItem, ctx: &NormalizeContext) -> NormalizeOutcome {
    let Some(title) = non_blank(raw, "title") else {
        return NormalizeOutcome::Dropped(DropReason::MissingTitle);
    };

    let external_id = non_blank(raw, "id");
    let url = non_blank(raw, "url");
    if external_id.is_none() && url.is_none() {
        return NormalizeOutcome::Dropped(DropReason::MissingIdentity);
    }

    let published_at = match published_field(raw, "published") {
        Ok(t) => t,
        Err(reason) => return NormalizeOutcome::Dropped(reason),
    };

    // Whole-feed fetches see the same entries every run; stay inside the window.
    if let Some(t) = published_at {
        if t < ctx.window_start {
            return NormalizeOutcome::Dropped(DropReason::OutsideWindow);
        }
    }

    let Some(url) = url else {
        return NormalizeOutcome::Dropped(DropReason::NoUrl);
    };

    NormalizeOutcome::Record(Box::new(CanonicalRecord {
        provider: ctx.descriptor.provider.to_string(),
        kind: ctx.descriptor.kind,
        title,
        summary: raw
            .get("summary")
            .and_then(|v| v.as_str())
            .and_then(summary_of),
        url,
        published_at,
        external_id,
        source_type: ctx.descriptor.source_type,
        status: "published".to_string(),
        tags: str_list(raw, "categories"),
        author: non_blank(raw, "author"),
        extra: BTreeMap::new(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::testctx::ctx;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn entry(published: chrono::DateTime<Utc>) -> serde_json::Value {
        json!({
            "id": "tag:blog.example.org,2026:post-91",
            "title": "Announcing the 2026 roadmap",
            "url": "https://blog.example.org/roadmap-2026",
            "summary": "Plans for the year.",
            "published": published.to_rfc3339(),
            "author": "The Team",
            "categories": ["announcements"]
        })
    }

    #[test]
    fn recent_entry_maps() {
        let binding = ctx("rust-blog-articles");
        let raw = entry(Utc::now() - Duration::hours(6));
        let NormalizeOutcome::Record(record) = normalize(&raw, &binding.context()) else {
            panic!("expected a record");
        };
        assert_eq!(record.title, "Announcing the 2026 roadmap");
        assert_eq!(record.external_id.as_deref(), Some("tag:blog.example.org,2026:post-91"));
        assert_eq!(record.tags, vec!["announcements"]);
    }

    #[test]
    fn entry_behind_window_is_dropped() {
        let binding = ctx("rust-blog-articles");
        let raw = entry(Utc::now() - Duration::days(45));
        assert!(matches!(
            normalize(&raw, &binding.context()),
            NormalizeOutcome::Dropped(DropReason::OutsideWindow)
        ));
    }

    #[test]
    fn missing_both_identity_fields_is_dropped() {
        let binding = ctx("rust-blog-articles");
        let raw = json!({ "title": "No identity", "published": "2026-02-01T00:00:00Z" });
        assert!(matches!(
            normalize(&raw, &binding.context()),
            NormalizeOutcome::Dropped(DropReason::MissingIdentity)
        ));
    }
}
