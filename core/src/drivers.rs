//! Revenue drivers: month-over-month movement of the four leading
//! indicators (pipeline value, win rate, average deal size, sales
//! cycle length).
//!
//! The comparison is between the latest two calendar months that
//! actually appear in deal dates, not the latest two wall-clock
//! months. A dataset with a single active month reports no previous
//! value and a flat trend.

use serde::Serialize;

use crate::error::{DeskError, DeskResult};
use crate::stats::{mean, pct_change, round2};
use crate::store::{Deal, DeskStore};
use crate::types::MonthKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Worsening,
    Flat,
}

/// One driver: its current value, the prior month's value and the
/// movement between them. The delta unit varies per driver (percent
/// change for money, percentage points for win rate, days for cycle
/// length).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverMetric {
    pub current: f64,
    pub previous: Option<f64>,
    pub delta: Option<f64>,
    pub trend: Trend,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueDrivers {
    pub latest_month: MonthKey,
    pub previous_month: Option<MonthKey>,
    pub pipeline_value: DriverMetric,
    pub win_rate: DriverMetric,
    pub avg_deal_size: DriverMetric,
    pub sales_cycle_days: DriverMetric,
}

// ── Per-month metrics ────────────────────────────────────────────────────

/// Open-deal amounts created in the month, the near-term pipeline.
fn pipeline_value_in(store: &DeskStore, month: MonthKey) -> f64 {
    round2(
        store
            .open_deals()
            .filter(|d| d.created_month() == Some(month))
            .map(Deal::amount_or_zero)
            .sum(),
    )
}

/// Won over closed for deals closed in the month, as a 0..1 fraction.
fn win_rate_in(store: &DeskStore, month: MonthKey) -> f64 {
    let mut won = 0u32;
    let mut lost = 0u32;
    for d in store.deals.iter().filter(|d| d.closed_month() == Some(month)) {
        if d.stage.is_won() {
            won += 1;
        } else if d.stage.is_lost() {
            lost += 1;
        }
    }
    if won + lost == 0 {
        0.0
    } else {
        f64::from(won) / f64::from(won + lost)
    }
}

/// Mean positive amount of deals created in the month.
fn avg_deal_size_in(store: &DeskStore, month: MonthKey) -> f64 {
    let amounts: Vec<f64> = store
        .deals
        .iter()
        .filter(|d| d.created_month() == Some(month))
        .filter_map(Deal::positive_amount)
        .collect();
    round2(mean(&amounts))
}

/// Mean created-to-closed span of deals closed in the month.
fn sales_cycle_days_in(store: &DeskStore, month: MonthKey) -> f64 {
    let days: Vec<f64> = store
        .deals
        .iter()
        .filter(|d| d.stage.is_closed())
        .filter(|d| d.closed_month() == Some(month))
        .filter_map(|d| d.cycle_days().map(|n| n as f64))
        .collect();
    round2(mean(&days))
}

// ── Assembly ─────────────────────────────────────────────────────────────

fn metric(
    current: f64,
    previous: Option<f64>,
    delta_of: impl Fn(f64, f64) -> f64,
    lower_is_better: bool,
) -> DriverMetric {
    let delta = previous.map(|p| delta_of(current, p));
    let trend = match delta {
        None => Trend::Flat,
        Some(d) if d == 0.0 => Trend::Flat,
        Some(d) => {
            if (d > 0.0) != lower_is_better {
                Trend::Improving
            } else {
                Trend::Worsening
            }
        }
    };
    DriverMetric {
        current,
        previous,
        delta,
        trend,
    }
}

pub fn revenue_drivers(store: &DeskStore) -> DeskResult<RevenueDrivers> {
    let months = store.deal_months();
    let latest = *months.last().ok_or(DeskError::NoDealMonths)?;
    let previous = months.len().checked_sub(2).map(|i| months[i]);

    Ok(RevenueDrivers {
        latest_month: latest,
        previous_month: previous,
        pipeline_value: metric(
            pipeline_value_in(store, latest),
            previous.map(|m| pipeline_value_in(store, m)),
            pct_change,
            false,
        ),
        win_rate: metric(
            win_rate_in(store, latest),
            previous.map(|m| win_rate_in(store, m)),
            // Percentage-point difference, not relative change.
            |cur, prev| round2((cur - prev) * 100.0),
            false,
        ),
        avg_deal_size: metric(
            avg_deal_size_in(store, latest),
            previous.map(|m| avg_deal_size_in(store, m)),
            pct_change,
            false,
        ),
        sales_cycle_days: metric(
            sales_cycle_days_in(store, latest),
            previous.map(|m| sales_cycle_days_in(store, m)),
            // Day difference; a longer cycle is the bad direction.
            |cur, prev| round2(cur - prev),
            true,
        ),
    })
}
