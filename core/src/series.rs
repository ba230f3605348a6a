//! Chart-ready monthly time series.
//!
//! RULES:
//!   - a series always covers every month of the requested window,
//!     zero-filled where nothing happened, strictly ascending;
//!   - the window ends at `endMonth` when given, otherwise at the
//!     latest target month;
//!   - win rate stays a 0..1 fraction, everything else rounds to 2
//!     decimals.

use serde::Serialize;

use crate::error::{DeskError, DeskResult};
use crate::query::QueryMap;
use crate::stats::{round2, MonthWindow};
use crate::store::DeskStore;
use crate::types::MonthKey;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub month: MonthKey,
    pub value: f64,
}

fn to_points(raw: Vec<(MonthKey, f64)>) -> Vec<SeriesPoint> {
    raw.into_iter()
        .map(|(month, value)| SeriesPoint { month, value })
        .collect()
}

/// Bounded month window from query parameters. The `months` length
/// clamps to 3..=36 around a per-series default.
fn window_from(
    store: &DeskStore,
    query: &QueryMap,
    default_months: i64,
) -> DeskResult<MonthWindow> {
    let months = query.int_clamped("months", default_months, 3, 36) as usize;
    let latest = store
        .latest_target_month()
        .ok_or(DeskError::NoTargetMonths)?;
    let end = query.month_or("endMonth", latest);
    Ok(MonthWindow::ending_at(end, months))
}

/// Open-deal amount by creation month.
pub fn pipeline_by_month(store: &DeskStore, query: &QueryMap) -> DeskResult<Vec<SeriesPoint>> {
    let window = window_from(store, query, 12)?;
    Ok(to_points(window.series(
        store.open_deals(),
        |d| d.created_month(),
        |sum: &mut f64, d| *sum += d.amount_or_zero(),
        |sum| round2(*sum),
    )))
}

#[derive(Default)]
struct WinTally {
    won: u32,
    lost: u32,
}

/// Won over closed by close month, as a 0..1 fraction.
pub fn winrate_by_month(store: &DeskStore, query: &QueryMap) -> DeskResult<Vec<SeriesPoint>> {
    let window = window_from(store, query, 12)?;
    Ok(to_points(window.series(
        store.deals.iter().filter(|d| d.stage.is_closed()),
        |d| d.closed_month(),
        |t: &mut WinTally, d| {
            if d.stage.is_won() {
                t.won += 1;
            } else {
                t.lost += 1;
            }
        },
        |t| {
            let closed = t.won + t.lost;
            if closed == 0 {
                0.0
            } else {
                f64::from(t.won) / f64::from(closed)
            }
        },
    )))
}

#[derive(Default)]
struct CycleTally {
    total_days: f64,
    count: u32,
}

/// Mean created-to-closed days by close month.
pub fn salescycle_by_month(store: &DeskStore, query: &QueryMap) -> DeskResult<Vec<SeriesPoint>> {
    let window = window_from(store, query, 12)?;
    Ok(to_points(window.series(
        store.deals.iter().filter(|d| d.stage.is_closed()),
        |d| d.closed_month(),
        |t: &mut CycleTally, d| {
            if let Some(days) = d.cycle_days() {
                t.total_days += days as f64;
                t.count += 1;
            }
        },
        |t| {
            if t.count == 0 {
                0.0
            } else {
                round2(t.total_days / f64::from(t.count))
            }
        },
    )))
}

#[derive(Default)]
struct SizeTally {
    total: f64,
    count: u32,
}

/// Mean positive deal amount by creation month.
pub fn avgdealsize_by_month(store: &DeskStore, query: &QueryMap) -> DeskResult<Vec<SeriesPoint>> {
    let window = window_from(store, query, 12)?;
    Ok(to_points(window.series(
        store.deals.iter(),
        |d| d.created_month(),
        |t: &mut SizeTally, d| {
            if let Some(amount) = d.positive_amount() {
                t.total += amount;
                t.count += 1;
            }
        },
        |t| {
            if t.count == 0 {
                0.0
            } else {
                round2(t.total / f64::from(t.count))
            }
        },
    )))
}

/// Closed-won revenue by close month. Defaults to a shorter window
/// than the other series.
pub fn revenue_by_month(store: &DeskStore, query: &QueryMap) -> DeskResult<Vec<SeriesPoint>> {
    let window = window_from(store, query, 6)?;
    Ok(to_points(window.series(
        store.deals.iter().filter(|d| d.stage.is_won()),
        |d| d.closed_month(),
        |sum: &mut f64, d| *sum += d.amount_or_zero(),
        |sum| round2(*sum),
    )))
}
