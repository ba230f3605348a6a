//! Stage-level breakdowns of the deal pipeline.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::DeskResult;
use crate::query::QueryMap;
use crate::stats::{at_least_days_before, group_fold};
use crate::store::{collapse_deals, Activity, DeskStore};
use crate::types::DealStage;

/// Fixed display order for the canonical stages.
const STAGE_DISPLAY_ORDER: [&str; 4] = ["Closed Won", "Closed Lost", "Negotiation", "Prospecting"];

/// Activity kinds the follow-up breakdown tracks.
pub const TRACKED_ACTIVITY_KINDS: [&str; 3] = ["call", "email", "demo"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageCount {
    pub stage: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageCounts {
    pub chart_data: Vec<StageCount>,
    pub total_unique_deals: usize,
    pub total: usize,
}

/// Deal count per current stage. Collapsing runs again here so the
/// result is correct even for a deal list that still carries stage
/// snapshots; on the canonical store it is a no-op. Stages outside
/// the display order are appended alphabetically, which keeps
/// `total == total_unique_deals` unconditionally.
pub fn deals_by_stage(store: &DeskStore) -> StageCounts {
    let collapsed = collapse_deals(&store.deals);
    let counts: BTreeMap<String, usize> = group_fold(
        collapsed.iter(),
        |d| Some(d.stage.label().to_string()),
        |n: &mut usize, _| *n += 1,
    );

    let mut chart_data: Vec<StageCount> = STAGE_DISPLAY_ORDER
        .iter()
        .map(|&stage| StageCount {
            stage: stage.to_string(),
            count: counts.get(stage).copied().unwrap_or(0),
        })
        .collect();
    for (stage, &count) in &counts {
        if !STAGE_DISPLAY_ORDER.contains(&stage.as_str()) {
            chart_data.push(StageCount {
                stage: stage.clone(),
                count,
            });
        }
    }

    let total = chart_data.iter().map(|r| r.count).sum();
    StageCounts {
        chart_data,
        total_unique_deals: collapsed.len(),
        total,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StaleOpenDeals {
    pub days: i64,
    pub rows: Vec<StageCount>,
}

/// Open Prospecting and Negotiation deals created at least `days`
/// before the anchor date. Open deals in unrecognized stages are not
/// reported here; the two tracked stages always appear, zero or not.
pub fn stale_open_deals(store: &DeskStore, query: &QueryMap) -> DeskResult<StaleOpenDeals> {
    let days = query.int_clamped("days", 30, 1, 365);
    let now = store.anchor_quarter()?.end_date();

    let mut prospecting = 0usize;
    let mut negotiation = 0usize;
    for d in store.open_deals() {
        let Some(created) = d.created_at else { continue };
        if !at_least_days_before(created, now, days) {
            continue;
        }
        match d.stage {
            DealStage::Prospecting => prospecting += 1,
            DealStage::Negotiation => negotiation += 1,
            _ => {}
        }
    }

    Ok(StaleOpenDeals {
        days,
        rows: vec![
            StageCount {
                stage: "Prospecting".to_string(),
                count: prospecting,
            },
            StageCount {
                stage: "Negotiation".to_string(),
                count: negotiation,
            },
        ],
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatestActivityRow {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatestActivityBreakdown {
    pub rows: Vec<LatestActivityRow>,
}

/// What kind of touch each open deal saw last. Only dated activities
/// count; on equal timestamps the earlier record stays. Deals whose
/// latest touch is an untracked kind contribute nothing.
pub fn open_deals_latest_activity(store: &DeskStore) -> LatestActivityBreakdown {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for deal in store.open_deals() {
        let mut latest: Option<&Activity> = None;
        for activity in store.activities_for(&deal.deal_id) {
            let Some(ts) = activity.timestamp else { continue };
            if latest.and_then(|a| a.timestamp).map_or(true, |best| ts > best) {
                latest = Some(activity);
            }
        }
        if let Some(activity) = latest {
            if TRACKED_ACTIVITY_KINDS.contains(&activity.kind.as_str()) {
                *counts.entry(activity.kind.as_str()).or_insert(0) += 1;
            }
        }
    }

    let mut rows: Vec<LatestActivityRow> = counts
        .into_iter()
        .map(|(kind, count)| LatestActivityRow {
            kind: kind.to_string(),
            count,
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    LatestActivityBreakdown { rows }
}
