//! Prioritized action items derived from the risk signals.
//!
//! Four signals are checked in priority order: stale Enterprise
//! pipeline, the weakest in-quarter closer, the quietest segment that
//! still holds open pipeline, and stalled Negotiation deals. Generic
//! fallbacks from a fixed pool top the list up to the configured
//! minimum, so a caller always gets something actionable.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::{json, Value};

use crate::config::DeskConfig;
use crate::error::DeskResult;
use crate::query::QueryMap;
use crate::risk::{rep_quarter_stats, ActivityIndex, RepRisk, ThresholdParams};
use crate::stats::{at_least_days_before, round2};
use crate::store::DeskStore;
use crate::summary::Period;
use crate::types::DealStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
    Low,
}

/// Machine-readable number backing a recommendation, so a client can
/// render the headline metric without parsing prose.
#[derive(Debug, Clone, Serialize)]
pub struct MetricHint {
    pub key: &'static str,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: &'static str,
    pub title: String,
    pub message: String,
    pub why: &'static str,
    pub impact: Impact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_hint: Option<MetricHint>,
    /// Drill-down parameters a client can replay against the charts.
    pub filters: BTreeMap<&'static str, Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    pub current_quarter: String,
    pub period: Period,
    pub parameters: ThresholdParams,
    pub items: Vec<Recommendation>,
}

pub fn recommendations(
    store: &DeskStore,
    config: &DeskConfig,
    query: &QueryMap,
) -> DeskResult<Recommendations> {
    let quarter = store.anchor_quarter()?;
    let thresholds = ThresholdParams::from_query(query, &config.risk, quarter.end_date());
    let index = ActivityIndex::build(store, &thresholds);

    let mut items: Vec<Recommendation> = Vec::new();

    // Stale Enterprise pipeline: open, old enough, and quiet.
    let mut enterprise_stale_count = 0usize;
    let mut enterprise_stale_amount = 0.0f64;
    for d in store.open_deals() {
        let Some(account) = store.account(&d.account_id) else {
            continue;
        };
        if !account.segment.to_lowercase().contains("enterprise") {
            continue;
        }
        let Some(created) = d.created_at else { continue };
        if !at_least_days_before(created, thresholds.analysis_now, thresholds.stale_min_age_days) {
            continue;
        }
        if !index.deal_is_stale(&d.deal_id, &thresholds) {
            continue;
        }
        enterprise_stale_count += 1;
        enterprise_stale_amount += d.amount_or_zero();
    }
    if enterprise_stale_count > 0 {
        items.push(Recommendation {
            id: "rec_enterprise_stale",
            title: format!(
                "Focus on Enterprise deals older than {} days",
                thresholds.stale_min_age_days
            ),
            message: format!(
                "You have {} Enterprise open deals with no activity in the last {} days.",
                enterprise_stale_count, thresholds.stale_no_activity_days
            ),
            why: "Enterprise deals usually carry the highest contract value; unsticking a few can move the quarter.",
            impact: Impact::High,
            metric_hint: Some(MetricHint {
                key: "enterpriseStalePipeline",
                value: json!(round2(enterprise_stale_amount)),
            }),
            filters: BTreeMap::from([
                ("segment", json!("Enterprise")),
                ("minAgeDays", json!(thresholds.stale_min_age_days)),
                ("noActivityDays", json!(thresholds.stale_no_activity_days)),
            ]),
        });
    }

    // Weakest closer with a big enough in-quarter sample.
    let rep_rows = rep_quarter_stats(store, quarter);
    let mut worst: Option<&RepRisk> = None;
    for row in &rep_rows {
        if row.closed_in_quarter() < config.risk.min_closed_for_win_rate {
            continue;
        }
        let Some(rate) = row.win_rate_pct else { continue };
        if worst
            .and_then(|w| w.win_rate_pct)
            .map_or(true, |best| rate < best)
        {
            worst = Some(row);
        }
    }
    if let Some(rep) = worst {
        let rate = rep.win_rate_pct.unwrap_or(0.0);
        items.push(Recommendation {
            id: "rec_coach_rep",
            title: format!("Coach {} on win rate", rep.rep_name),
            message: format!(
                "{} has the lowest win rate in the current quarter ({}%) across reps with at least {} closed deals ({} closed).",
                rep.rep_name,
                rate,
                config.risk.min_closed_for_win_rate,
                rep.closed_in_quarter()
            ),
            why: "Small improvements in qualification and objection handling raise conversion quickly.",
            impact: Impact::High,
            metric_hint: Some(MetricHint {
                key: "repWinRatePct",
                value: json!(rate),
            }),
            filters: BTreeMap::from([
                ("repId", json!(rep.rep_id)),
                ("quarter", json!(quarter.label())),
            ]),
        });
    }

    // Quietest segment that still holds open pipeline.
    let mut open_amount_by_account: HashMap<&str, f64> = HashMap::new();
    for d in store.open_deals() {
        *open_amount_by_account
            .entry(d.account_id.as_str())
            .or_insert(0.0) += d.amount_or_zero();
    }
    let mut segment_tallies: BTreeMap<&str, SegmentTally> = BTreeMap::new();
    for account in &store.accounts {
        let tally = segment_tallies.entry(account.segment.as_str()).or_default();
        tally.accounts += 1;
        tally.activities += index
            .in_window_by_account
            .get(account.account_id.as_str())
            .copied()
            .unwrap_or(0);
        tally.open_amount += open_amount_by_account
            .get(account.account_id.as_str())
            .copied()
            .unwrap_or(0.0);
    }
    let mut worst_segment: Option<(&str, f64, f64)> = None;
    for (segment, tally) in &segment_tallies {
        if tally.open_amount <= 0.0 {
            continue;
        }
        let per_account = tally.activities as f64 / tally.accounts as f64;
        if worst_segment.map_or(true, |(_, best, _)| per_account < best) {
            worst_segment = Some((segment, per_account, tally.open_amount));
        }
    }
    if let Some((segment, per_account, open_amount)) = worst_segment {
        items.push(Recommendation {
            id: "rec_increase_activity_segment",
            title: format!("Increase activity for segment \"{segment}\""),
            message: format!(
                "This segment has the lowest activity rate (~{} activities/account in the last {} days) while still holding open pipeline.",
                round2(per_account),
                thresholds.low_activity_window_days
            ),
            why: "More touches usually improve progression and reduce slippage.",
            impact: Impact::Medium,
            metric_hint: Some(MetricHint {
                key: "segmentOpenPipeline",
                value: json!(round2(open_amount)),
            }),
            filters: BTreeMap::from([
                ("segment", json!(segment)),
                ("windowDays", json!(thresholds.low_activity_window_days)),
            ]),
        });
    }

    // Stalled Negotiation deals, regardless of age.
    let mut negotiation_stale_count = 0usize;
    let mut negotiation_stale_amount = 0.0f64;
    for d in &store.deals {
        if d.stage != DealStage::Negotiation {
            continue;
        }
        if !index.deal_is_stale(&d.deal_id, &thresholds) {
            continue;
        }
        negotiation_stale_count += 1;
        negotiation_stale_amount += d.amount_or_zero();
    }
    if negotiation_stale_count > 0 {
        items.push(Recommendation {
            id: "rec_negotiation_stale",
            title: "Push stalled Negotiation deals".to_string(),
            message: format!(
                "{} deals in Negotiation have no activity in the last {} days.",
                negotiation_stale_count, thresholds.stale_no_activity_days
            ),
            why: "Negotiation is late-stage; quick follow-ups can unblock procurement or legal and pull revenue forward.",
            impact: Impact::Medium,
            metric_hint: Some(MetricHint {
                key: "negotiationStaleAmount",
                value: json!(round2(negotiation_stale_amount)),
            }),
            filters: BTreeMap::from([
                ("stage", json!("Negotiation")),
                ("noActivityDays", json!(thresholds.stale_no_activity_days)),
            ]),
        });
    }

    for fallback in fallback_pool(&thresholds) {
        if items.len() >= config.recommendations.min_items {
            break;
        }
        items.push(fallback);
    }
    items.truncate(config.recommendations.max_items);

    Ok(Recommendations {
        current_quarter: quarter.label(),
        period: Period::of_quarter(quarter),
        parameters: thresholds,
        items,
    })
}

#[derive(Default)]
struct SegmentTally {
    accounts: usize,
    activities: usize,
    open_amount: f64,
}

/// Always-true generic advice, appended in order when too few signals
/// fired. The pool is as deep as the default minimum item count, so
/// the floor holds even on a dataset that triggers nothing.
fn fallback_pool(thresholds: &ThresholdParams) -> Vec<Recommendation> {
    vec![
        Recommendation {
            id: "rec_general_activity",
            title: "Increase touches on open pipeline this week".to_string(),
            message: format!(
                "Prioritize accounts with open deals but at most {} activities in the last {} days.",
                thresholds.low_activity_max_count, thresholds.low_activity_window_days
            ),
            why: "Consistent weekly activity is the simplest leading indicator of pipeline movement.",
            impact: Impact::Low,
            metric_hint: None,
            filters: BTreeMap::from([
                ("lowActivityMaxCount", json!(thresholds.low_activity_max_count)),
                ("windowDays", json!(thresholds.low_activity_window_days)),
            ]),
        },
        Recommendation {
            id: "rec_review_stage_hygiene",
            title: "Review open pipeline for stage accuracy".to_string(),
            message: "Walk the open pipeline and confirm each deal still sits in the stage it claims.".to_string(),
            why: "Accurate stages keep the forecast honest and surface stuck deals earlier.",
            impact: Impact::Low,
            metric_hint: None,
            filters: BTreeMap::new(),
        },
        Recommendation {
            id: "rec_quarter_pacing",
            title: "Check pacing against the quarter target".to_string(),
            message: "Compare closed-won revenue to the quarter target and plan the remaining weeks around the gap.".to_string(),
            why: "A pacing gap caught mid-quarter still leaves time to course-correct.",
            impact: Impact::Low,
            metric_hint: None,
            filters: BTreeMap::new(),
        },
    ]
}
