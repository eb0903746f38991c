//! Kaggle competition → canonical record.

use std::collections::BTreeMap;

use serde_json::Value;

use devradar_common::{CanonicalRecord, RawItem};

use super::{
    id_string, non_blank, published_field, str_list, summary_of, DropReason, NormalizeContext,
    NormalizeOutcome,
};

pub(super) fn normalize(raw: &RawItem, ctx: &NormalizeContext) -> NormalizeOutcome {
    let Some(title) = non_blank(raw, "title") else {
        return NormalizeOutcome::Dropped(DropReason::MissingTitle);
    };

    let external_id = id_string(raw, "id").or_else(|| non_blank(raw, "ref"));
    if external_id.is_none() && non_blank(raw, "url").is_none() {
        return NormalizeOutcome::Dropped(DropReason::MissingIdentity);
    }

    // A competition past its deadline is history, not news.
    match published_field(raw, "deadline") {
        Ok(Some(deadline)) if deadline < ctx.now => {
            return NormalizeOutcome::Dropped(DropReason::Ended);
        }
        Ok(_) => {}
        Err(reason) => return NormalizeOutcome::Dropped(reason),
    }

    let published_at = match published_field(raw, "enabledDate") {
        Ok(t) => t,
        Err(reason) => return NormalizeOutcome::Dropped(reason),
    };

    let url = match non_blank(raw, "url") {
        Some(u) if u.starts_with("http") => u,
        _ => match non_blank(raw, "ref") {
            Some(r) if r.starts_with("http") => r,
            Some(r) => format!("https://www.kaggle.com/competitions/{r}"),
            None => return NormalizeOutcome::Dropped(DropReason::NoUrl),
        },
    };

    let mut extra = BTreeMap::new();
    if let Some(reward) = non_blank(raw, "reward") {
        extra.insert("reward".to_string(), reward);
    }
    if let Some(Value::String(deadline)) = raw.get("deadline") {
        extra.insert("deadline".to_string(), deadline.clone());
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
        status: "open".to_string(),
        tags: str_list(raw, "tags"),
        author: non_blank(raw, "organizationName"),
        extra,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::testctx::ctx;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn competition(deadline: chrono::DateTime<Utc>) -> serde_json::Value {
        json!({
            "id": 7700,
            "ref": "protein-folding-2026",
            "title": "Protein Folding 2026",
            "description": "Predict structures.",
            "deadline": deadline.to_rfc3339(),
            "enabledDate": "2026-01-05T00:00:00Z",
            "reward": "$50,000",
            "organizationName": "BioLab",
            "tags": [{ "name": "biology" }, { "name": "tabular" }]
        })
    }

    #[test]
    fn open_competition_maps_with_constructed_url() {
        let binding = ctx("kaggle-competitions");
        let raw = competition(Utc::now() + Duration::days(30));
        let NormalizeOutcome::Record(record) = normalize(&raw, &binding.context()) else {
            panic!("expected a record");
        };
        assert_eq!(record.url, "https://www.kaggle.com/competitions/protein-folding-2026");
        assert_eq!(record.tags, vec!["biology", "tabular"]);
        assert_eq!(record.author.as_deref(), Some("BioLab"));
        assert_eq!(record.extra.get("reward").map(String::as_str), Some("$50,000"));
    }

    #[test]
    fn past_deadline_is_dropped_as_ended() {
        let binding = ctx("kaggle-competitions");
        let raw = competition(Utc::now() - Duration::days(1));
        assert!(matches!(
            normalize(&raw, &binding.context()),
            NormalizeOutcome::Dropped(DropReason::Ended)
        ));
    }

    #[test]
    fn unparsable_deadline_is_dropped() {
        let binding = ctx("kaggle-competitions");
        let mut raw = competition(Utc::now() + Duration::days(30));
        raw["deadline"] = json!("when it's done");
        assert!(matches!(
            normalize(&raw, &binding.context()),
            NormalizeOutcome::Dropped(DropReason::UnparsableTimestamp)
        ));
    }
}
