//! Per-rep leaderboards and cross-tabulations.
//!
//! Grouping keys are resolved rep names ("Unknown" when a reference
//! does not resolve, which the canonical store rules out). Name ties
//! between sort keys fall back to the alphabetical group order, so
//! every leaderboard is deterministic.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::query::QueryMap;
use crate::stats::{group_fold, round2};
use crate::store::{Deal, DeskStore};

/// Column order for the stage-by-rep heatmap.
const HEATMAP_STAGE_ORDER: [&str; 4] = ["Prospecting", "Negotiation", "Closed Lost", "Closed Won"];

fn rep_name<'a>(store: &'a DeskStore, rep_id: &str) -> &'a str {
    store
        .rep(rep_id)
        .map(|r| r.name.as_str())
        .unwrap_or("Unknown")
}

// ── Closed-won revenue leaderboard ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepRevenueRow {
    pub rep: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepRevenue {
    pub rows: Vec<RepRevenueRow>,
    pub limit: i64,
}

/// Closed-won revenue per rep, largest first. A won deal without a
/// positive amount still lists its rep, contributing zero.
pub fn closed_won_revenue_by_rep(store: &DeskStore, query: &QueryMap) -> RepRevenue {
    let limit = query.int_clamped("limit", 12, 3, 50);

    let sums: BTreeMap<String, f64> = group_fold(
        store.deals.iter().filter(|d| d.stage.is_won()),
        |d| Some(rep_name(store, &d.rep_id).to_string()),
        |sum: &mut f64, d| *sum += d.positive_amount().unwrap_or(0.0),
    );

    let mut rows: Vec<RepRevenueRow> = sums
        .into_iter()
        .map(|(rep, amount)| RepRevenueRow {
            rep,
            amount: round2(amount),
        })
        .collect();
    rows.sort_by(|a, b| {
        b.amount
            .partial_cmp(&a.amount)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows.truncate(limit as usize);

    RepRevenue { rows, limit }
}

// ── Closed-deal pies ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PieItem {
    pub rep: String,
    pub value: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PieMeta {
    pub top_n: i64,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepPie {
    pub items: Vec<PieItem>,
    pub meta: PieMeta,
}

/// Deal counts per rep for one closing outcome, biggest slice first,
/// with everything past the top N folded into an "Others" slice.
fn rep_pie(store: &DeskStore, query: &QueryMap, keep: impl Fn(&Deal) -> bool) -> RepPie {
    let top_n = query.int_clamped("top", 8, 3, 20);

    let counts: BTreeMap<String, usize> = group_fold(
        store.deals.iter().filter(|d| keep(d)),
        |d| Some(rep_name(store, &d.rep_id).to_string()),
        |n: &mut usize, _| *n += 1,
    );

    let mut items: Vec<PieItem> = counts
        .into_iter()
        .map(|(rep, value)| PieItem { rep, value })
        .collect();
    items.sort_by(|a, b| b.value.cmp(&a.value));

    let total: usize = items.iter().map(|i| i.value).sum();
    let others: usize = items.iter().skip(top_n as usize).map(|i| i.value).sum();
    items.truncate(top_n as usize);
    if others > 0 {
        items.push(PieItem {
            rep: "Others".to_string(),
            value: others,
        });
    }

    RepPie {
        items,
        meta: PieMeta { top_n, total },
    }
}

pub fn closed_won_by_rep(store: &DeskStore, query: &QueryMap) -> RepPie {
    rep_pie(store, query, |d| d.stage.is_won())
}

pub fn closed_lost_by_rep(store: &DeskStore, query: &QueryMap) -> RepPie {
    rep_pie(store, query, |d| d.stage.is_lost())
}

// ── Sales cycle leaderboard ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepCycleRow {
    pub rep: String,
    pub avg_days: f64,
    pub deals: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesCycleByRep {
    pub rows: Vec<RepCycleRow>,
    pub min_deals: i64,
    pub limit: i64,
}

#[derive(Default)]
struct CycleAgg {
    total_days: f64,
    deals: usize,
}

/// Average created-to-closed span per rep over closed deals with
/// measurable cycles, fastest first. Reps with fewer than `minDeals`
/// measurable deals drop out.
pub fn sales_cycle_by_rep(store: &DeskStore, query: &QueryMap) -> SalesCycleByRep {
    let min_deals = query.int_clamped("minDeals", 3, 1, 50);
    let limit = query.int_clamped("limit", 12, 3, 50);

    let measurable = store
        .deals
        .iter()
        .filter(|d| d.stage.is_closed() && d.cycle_days().is_some());
    let agg: BTreeMap<String, CycleAgg> = group_fold(
        measurable,
        |d| Some(rep_name(store, &d.rep_id).to_string()),
        |a: &mut CycleAgg, d| {
            if let Some(days) = d.cycle_days() {
                a.total_days += days as f64;
                a.deals += 1;
            }
        },
    );

    let mut rows: Vec<RepCycleRow> = agg
        .into_iter()
        .map(|(rep, a)| RepCycleRow {
            rep,
            avg_days: round2(a.total_days / a.deals as f64),
            deals: a.deals,
        })
        .filter(|r| r.deals >= min_deals as usize)
        .collect();
    rows.sort_by(|a, b| {
        a.avg_days
            .partial_cmp(&b.avg_days)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows.truncate(limit as usize);

    SalesCycleByRep {
        rows,
        min_deals,
        limit,
    }
}

// ── Stage-by-rep heatmap ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatmapCell {
    pub rep: String,
    pub stage: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageRepHeatmap {
    pub reps: Vec<String>,
    pub stages: Vec<String>,
    pub cells: Vec<HeatmapCell>,
}

/// Deal count per rep and canonical stage, zero-filled across every
/// rep in the store. Reps sharing a display name merge into one row.
pub fn stage_by_rep_heatmap(store: &DeskStore) -> StageRepHeatmap {
    let mut counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for d in &store.deals {
        let key = (rep_name(store, &d.rep_id), d.stage.label());
        *counts.entry(key).or_insert(0) += 1;
    }

    let rep_names: BTreeSet<&str> = store.reps.iter().map(|r| r.name.as_str()).collect();
    let mut cells = Vec::with_capacity(rep_names.len() * HEATMAP_STAGE_ORDER.len());
    for &rep in &rep_names {
        for &stage in &HEATMAP_STAGE_ORDER {
            cells.push(HeatmapCell {
                rep: rep.to_string(),
                stage: stage.to_string(),
                count: counts.get(&(rep, stage)).copied().unwrap_or(0),
            });
        }
    }

    StageRepHeatmap {
        reps: rep_names.iter().map(|r| r.to_string()).collect(),
        stages: HEATMAP_STAGE_ORDER.iter().map(|s| s.to_string()).collect(),
        cells,
    }
}
