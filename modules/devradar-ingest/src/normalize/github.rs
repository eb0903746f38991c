//! GitHub release → canonical record.

use std::collections::BTreeMap;

use devradar_common::{CanonicalRecord, RawItem};

use super::{
    id_string, non_blank, nested_str, published_field, summary_of, DropReason, NormalizeContext,
    NormalizeOutcome,
};

pub(super) fn normalize(raw: &RawItem, ctx: &NormalizeContext) -> NormalizeOutcome {
    let tag = non_blank(raw, "tag_name");
    let Some(title) = non_blank(raw, "name").or_else(|| tag.clone()) else {
        return NormalizeOutcome::Dropped(DropReason::MissingTitle);
    };

    let external_id = id_string(raw, "id");
    if external_id.is_none() && non_blank(raw, "html_url").is_none() {
        return NormalizeOutcome::Dropped(DropReason::MissingIdentity);
    }

    // Drafts and prereleases never reach the store.
    if raw.get("draft").and_then(|v| v.as_bool()).unwrap_or(false) {
        return NormalizeOutcome::Dropped(DropReason::Draft);
    }
    if raw.get("prerelease").and_then(|v| v.as_bool()).unwrap_or(false) {
        return NormalizeOutcome::Dropped(DropReason::Prerelease);
    }

    let published_at = match published_field(raw, "published_at") {
        Ok(t) => t,
        Err(reason) => return NormalizeOutcome::Dropped(reason),
    };

    let url = match non_blank(raw, "html_url") {
        Some(u) => u,
        None => match (ctx.filters.get("repo"), &tag) {
            (Some(repo), Some(tag)) => format!("https://github.com/{repo}/releases/tag/{tag}"),
            _ => return NormalizeOutcome::Dropped(DropReason::NoUrl),
        },
    };

    let mut extra = BTreeMap::new();
    if let Some(tag) = tag {
        extra.insert("tag".to_string(), tag);
    }

    NormalizeOutcome::Record(Box::new(CanonicalRecord {
        provider: ctx.descriptor.provider.to_string(),
        kind: ctx.descriptor.kind,
        title,
        summary: raw.get("body").and_then(|v| v.as_str()).and_then(summary_of),
        url,
        published_at,
        external_id,
        source_type: ctx.descriptor.source_type,
        status: "published".to_string(),
        tags: Vec::new(),
        author: nested_str(raw, &["author", "login"]),
        extra,
    }))
}
