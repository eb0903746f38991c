//! Devpost hackathon → canonical record.

use std::collections::BTreeMap;

use devradar_common::{CanonicalRecord, RawItem};

use super::{
    id_string, non_blank, str_list, DropReason, NormalizeContext, NormalizeOutcome,
};

pub(super) fn normalize(raw: &RawItem, ctx: &NormalizeContext) -> NormalizeOutcome {
    let Some(title) = non_blank(raw, "title") else {
        return NormalizeOutcome::Dropped(DropReason::MissingTitle);
    };

    let external_id = id_string(raw, "id");
    let url = non_blank(raw, "url");
    if external_id.is_none() && url.is_none() {
        return NormalizeOutcome::Dropped(DropReason::MissingIdentity);
    }

    // Devpost reports lifecycle as a state string rather than a deadline.
    let open_state = non_blank(raw, "open_state").unwrap_or_else(|| "open".to_string());
    if open_state == "ended" {
        return NormalizeOutcome::Dropped(DropReason::Ended);
    }

    let Some(url) = url else {
        return NormalizeOutcome::Dropped(DropReason::NoUrl);
    };

    let mut extra = BTreeMap::new();
    if let Some(dates) = non_blank(raw, "submission_period_dates") {
        extra.insert("submission_period".to_string(), dates);
    }
    if let Some(prize) = non_blank(raw, "prize_amount") {
        extra.insert("prize".to_string(), prize);
    }

    NormalizeOutcome::Record(Box::new(CanonicalRecord {
        provider: ctx.descriptor.provider.to_string(),
        kind: ctx.descriptor.kind,
        title,
        summary: None,
        url,
        published_at: None,
        external_id,
        source_type: ctx.descriptor.source_type,
        status: open_state,
        tags: str_list(raw, "themes"),
        author: non_blank(raw, "organization_name"),
        extra,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::testctx::ctx;
    use serde_json::json;

    fn hackathon(state: &str) -> serde_json::Value {
        json!({
            "id": 21000,
            "title": "Climate Hack 2026",
            "url": "https://climate-hack-2026.devpost.com/",
            "open_state": state,
            "submission_period_dates": "Mar 01 - Apr 15, 2026",
            "prize_amount": "$10,000",
            "themes": [{ "name": "Sustainability" }, { "name": "IoT" }],
            "organization_name": "Devpost"
        })
    }

    #[test]
    fn open_hackathon_maps() {
        let binding = ctx("devpost-hackathons");
        let NormalizeOutcome::Record(record) = normalize(&hackathon("open"), &binding.context())
        else {
            panic!("expected a record");
        };
        assert_eq!(record.status, "open");
        assert_eq!(record.tags, vec!["Sustainability", "IoT"]);
        assert_eq!(
            record.extra.get("submission_period").map(String::as_str),
            Some("Mar 01 - Apr 15, 2026")
        );
        assert!(record.published_at.is_none());
    }

    #[test]
    fn ended_hackathon_is_dropped() {
        let binding = ctx("devpost-hackathons");
        assert!(matches!(
            normalize(&hackathon("ended"), &binding.context()),
            NormalizeOutcome::Dropped(DropReason::Ended)
        ));
    }
}
