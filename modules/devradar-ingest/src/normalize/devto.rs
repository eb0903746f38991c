//! Dev.to article → canonical record.

use std::collections::BTreeMap;

use devradar_common::{CanonicalRecord, RawItem};

use super::{
    id_string, nested_str, non_blank, published_field, str_list, summary_of, DropReason,
    NormalizeContext, NormalizeOutcome,
};

pub(super) fn normalize(raw: &RawItem, ctx: &NormalizeContext) -> NormalizeOutcome {
    let Some(title) = non_blank(raw, "title") else {
        return NormalizeOutcome::Dropped(DropReason::MissingTitle);
    };

    let external_id = id_string(raw, "id");
    let url = non_blank(raw, "url").or_else(|| non_blank(raw, "canonical_url"));
    if external_id.is_none() && url.is_none() {
        return NormalizeOutcome::Dropped(DropReason::MissingIdentity);
    }

    // The public endpoint only lists published articles, but the flag shows
    // up on some responses; honor it when it does.
    if raw.get("published").and_then(|v| v.as_bool()) == Some(false) {
        return NormalizeOutcome::Dropped(DropReason::Draft);
    }

    let published_at = match published_field(raw, "published_at") {
        Ok(t) => t,
        Err(reason) => return NormalizeOutcome::Dropped(reason),
    };

    let Some(url) = url else {
        return NormalizeOutcome::Dropped(DropReason::NoUrl);
    };

    // Author may be a user or an organization; either nests the name.
    let author = nested_str(raw, &["user", "name"])
        .or_else(|| nested_str(raw, &["organization", "name"]));

    let mut tags = str_list(raw, "tag_list");
    if tags.is_empty() {
        tags = str_list(raw, "tags");
    }

    let mut extra = BTreeMap::new();
    if let Some(reactions) = raw.get("positive_reactions_count").and_then(|v| v.as_i64()) {
        extra.insert("reactions".to_string(), reactions.to_string());
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
        status: "published".to_string(),
        tags,
        author,
        extra,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::testctx::ctx;
    use serde_json::json;

    fn article() -> serde_json::Value {
        json!({
            "id": 55,
            "title": "Borrow checker field notes",
            "description": "What the compiler taught me.",
            "url": "https://dev.to/a/borrow-checker-field-notes",
            "published_at": "2026-01-20T09:00:00Z",
            "tag_list": ["rust", "beginners"],
            "user": { "name": "Ada" },
            "positive_reactions_count": 12
        })
    }

    #[test]
    fn maps_an_article() {
        let binding = ctx("devto-articles");
        let NormalizeOutcome::Record(record) = normalize(&article(), &binding.context()) else {
            panic!("expected a record");
        };
        assert_eq!(record.title, "Borrow checker field notes");
        assert_eq!(record.tags, vec!["rust", "beginners"]);
        assert_eq!(record.author.as_deref(), Some("Ada"));
        assert_eq!(record.extra.get("reactions").map(String::as_str), Some("12"));
    }

    #[test]
    fn organization_name_backfills_missing_user() {
        let binding = ctx("devto-articles");
        let mut raw = article();
        raw["user"] = json!(null);
        raw["organization"] = json!({ "name": "Acme Eng" });
        let NormalizeOutcome::Record(record) = normalize(&raw, &binding.context()) else {
            panic!("expected a record");
        };
        assert_eq!(record.author.as_deref(), Some("Acme Eng"));
    }

    #[test]
    fn comma_separated_tag_list_is_split() {
        let binding = ctx("devto-articles");
        let mut raw = article();
        raw["tag_list"] = json!("rust, tooling");
        let NormalizeOutcome::Record(record) = normalize(&raw, &binding.context()) else {
            panic!("expected a record");
        };
        assert_eq!(record.tags, vec!["rust", "tooling"]);
    }

    #[test]
    fn unpublished_flag_drops() {
        let binding = ctx("devto-articles");
        let mut raw = article();
        raw["published"] = json!(false);
        assert!(matches!(
            normalize(&raw, &binding.context()),
            NormalizeOutcome::Dropped(DropReason::Draft)
        ));
    }
}
