//! Quarterly performance summary.
//!
//! The "current quarter" comes from the latest target month, never
//! from wall-clock time: the dataset is a fixed historical snapshot
//! and every anchored computation must agree on when "now" is.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::DeskResult;
use crate::stats::{pct_change, pct_ratio, round2};
use crate::store::DeskStore;
use crate::types::QuarterWindow;

/// Inclusive date range. Serializes as a pair of ISO dates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn of_quarter(quarter: QuarterWindow) -> Period {
        Period {
            start: quarter.start_date(),
            end: quarter.end_date(),
        }
    }
}

/// Quarter-over-quarter movement of the headline revenue number.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QoqChange {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub prev_quarter_revenue: f64,
    pub change_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarterSummary {
    pub current_quarter: String,
    pub period: Period,
    pub revenue: f64,
    pub target: f64,
    pub gap: f64,
    pub gap_pct: f64,
    pub change: QoqChange,
}

/// Closed-won revenue attributed to a quarter by close date.
fn revenue_in(store: &DeskStore, window: QuarterWindow) -> f64 {
    store
        .deals
        .iter()
        .filter(|d| d.stage.is_won())
        .filter(|d| d.closed_at.map_or(false, |c| window.contains(c)))
        .map(|d| d.amount_or_zero())
        .sum()
}

/// Headline dashboard numbers for the anchor quarter: revenue against
/// the summed three-month target, the gap both ways, and movement
/// against the immediately preceding quarter.
pub fn quarter_summary(store: &DeskStore) -> DeskResult<QuarterSummary> {
    let quarter = store.anchor_quarter()?;
    let revenue = revenue_in(store, quarter);
    let target: f64 = quarter.months().iter().map(|&m| store.target_for(m)).sum();
    let gap = revenue - target;
    let prev_revenue = revenue_in(store, quarter.prev());

    Ok(QuarterSummary {
        current_quarter: quarter.label(),
        period: Period::of_quarter(quarter),
        revenue: round2(revenue),
        target: round2(target),
        gap: round2(gap),
        gap_pct: pct_ratio(gap, target),
        change: QoqChange {
            kind: "QoQ",
            prev_quarter_revenue: round2(prev_revenue),
            change_pct: pct_change(revenue, prev_revenue),
        },
    })
}
