//! Risk detection: stale deals, underperforming reps and low-activity
//! accounts.
//!
//! All three views share one "now": the last day of the anchor
//! quarter. Wall-clock time never enters, so a fixed historical
//! dataset produces the same flags forever.
//!
//! RULES:
//!   - thresholds default from `DeskConfig` and clamp per parameter;
//!   - every section reports the full match count and a top slice;
//!   - sort orders break ties deterministically (alphabetical group
//!     order underneath the metric sorts).

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::{DeskConfig, RiskConfig};
use crate::error::DeskResult;
use crate::query::QueryMap;
use crate::stats::{at_least_days_before, round2, within_lookback};
use crate::store::DeskStore;
use crate::summary::Period;
use crate::types::{DealStage, QuarterWindow};

// ── Parameters ───────────────────────────────────────────────────────────

/// Effective thresholds after clamping, echoed back in responses so a
/// consumer sees what the analysis actually used.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdParams {
    pub stale_no_activity_days: i64,
    pub stale_min_age_days: i64,
    pub low_activity_window_days: i64,
    pub low_activity_max_count: i64,
    pub analysis_now: NaiveDate,
}

impl ThresholdParams {
    pub fn from_query(query: &QueryMap, config: &RiskConfig, now: NaiveDate) -> ThresholdParams {
        ThresholdParams {
            stale_no_activity_days: query.int_clamped(
                "staleNoActivityDays",
                config.stale_no_activity_days,
                1,
                180,
            ),
            stale_min_age_days: query.int_clamped(
                "staleMinAgeDays",
                config.stale_min_age_days,
                1,
                365,
            ),
            low_activity_window_days: query.int_clamped(
                "lowActivityWindowDays",
                config.low_activity_window_days,
                7,
                365,
            ),
            low_activity_max_count: query.int_clamped(
                "lowActivityMaxCount",
                i64::from(config.low_activity_max_count),
                0,
                50,
            ),
            analysis_now: now,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RiskParameters {
    #[serde(flatten)]
    pub thresholds: ThresholdParams,
    pub limit: i64,
}

// ── Shared activity index ────────────────────────────────────────────────

/// Activity lookups the risk views and recommendations share: last
/// touch per deal (all time) and per-account touch counts inside the
/// lookback window. Undated activities never count.
pub(crate) struct ActivityIndex<'a> {
    pub(crate) last_by_deal: HashMap<&'a str, NaiveDate>,
    pub(crate) in_window_by_account: HashMap<&'a str, usize>,
    last_in_window_by_account: HashMap<&'a str, NaiveDate>,
}

impl<'a> ActivityIndex<'a> {
    pub(crate) fn build(store: &'a DeskStore, thresholds: &ThresholdParams) -> ActivityIndex<'a> {
        let mut last_by_deal: HashMap<&str, NaiveDate> = HashMap::new();
        let mut in_window_by_account: HashMap<&str, usize> = HashMap::new();
        let mut last_in_window_by_account: HashMap<&str, NaiveDate> = HashMap::new();

        for activity in &store.activities {
            let Some(ts) = activity.timestamp else { continue };

            let slot = last_by_deal.entry(activity.deal_id.as_str()).or_insert(ts);
            if ts > *slot {
                *slot = ts;
            }

            if within_lookback(
                ts,
                thresholds.analysis_now,
                thresholds.low_activity_window_days,
            ) {
                if let Some(deal) = store.deal(&activity.deal_id) {
                    let account_id = deal.account_id.as_str();
                    *in_window_by_account.entry(account_id).or_insert(0) += 1;
                    let slot = last_in_window_by_account.entry(account_id).or_insert(ts);
                    if ts > *slot {
                        *slot = ts;
                    }
                }
            }
        }

        ActivityIndex {
            last_by_deal,
            in_window_by_account,
            last_in_window_by_account,
        }
    }

    /// Whether a deal counts as stale: no activity ever, or the last
    /// one at least the no-activity threshold ago.
    pub(crate) fn deal_is_stale(&self, deal_id: &str, thresholds: &ThresholdParams) -> bool {
        match self.last_by_deal.get(deal_id) {
            None => true,
            Some(&ts) => {
                at_least_days_before(ts, thresholds.analysis_now, thresholds.stale_no_activity_days)
            }
        }
    }
}

// ── Stale deals ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealRisk {
    pub deal_id: String,
    pub account_id: String,
    pub account_name: String,
    pub rep_id: String,
    pub rep_name: String,
    pub stage: DealStage,
    pub amount: Option<f64>,
    pub created_at: NaiveDate,
    pub last_activity_at: Option<NaiveDate>,
    pub days_since_last_activity: Option<i64>,
    pub days_open: i64,
}

/// Open deals past the minimum age with no recent touch. Deals whose
/// creation date did not survive cleaning cannot qualify.
fn stale_deals(store: &DeskStore, index: &ActivityIndex, t: &ThresholdParams) -> Vec<DealRisk> {
    let mut rows = Vec::new();
    for d in store.open_deals() {
        let Some(created) = d.created_at else { continue };
        if !at_least_days_before(created, t.analysis_now, t.stale_min_age_days) {
            continue;
        }
        if !index.deal_is_stale(&d.deal_id, t) {
            continue;
        }

        let last = index.last_by_deal.get(d.deal_id.as_str()).copied();
        rows.push(DealRisk {
            deal_id: d.deal_id.clone(),
            account_id: d.account_id.clone(),
            account_name: store
                .account(&d.account_id)
                .map(|a| a.name.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            rep_id: d.rep_id.clone(),
            rep_name: store
                .rep(&d.rep_id)
                .map(|r| r.name.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            stage: d.stage.clone(),
            amount: d.amount,
            created_at: created,
            last_activity_at: last,
            days_since_last_activity: last.map(|ts| (t.analysis_now - ts).num_days()),
            days_open: (t.analysis_now - created).num_days(),
        });
    }

    // Most stale first: never-touched deals, then the longest silence,
    // then the biggest amount at risk.
    rows.sort_by(|a, b| {
        let a_never = a.days_since_last_activity.is_none();
        let b_never = b.days_since_last_activity.is_none();
        b_never
            .cmp(&a_never)
            .then_with(|| {
                b.days_since_last_activity
                    .unwrap_or(-1)
                    .cmp(&a.days_since_last_activity.unwrap_or(-1))
            })
            .then_with(|| {
                b.amount
                    .unwrap_or(0.0)
                    .partial_cmp(&a.amount.unwrap_or(0.0))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });
    rows
}

// ── Underperforming reps ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepRisk {
    pub rep_id: String,
    pub rep_name: String,
    /// Percent, absent until the rep closed anything in-quarter.
    pub win_rate_pct: Option<f64>,
    pub closed_won_count: u32,
    pub closed_lost_count: u32,
    pub closed_won_revenue: f64,
    pub pipeline_open_amount: f64,
}

impl RepRisk {
    pub fn closed_in_quarter(&self) -> u32 {
        self.closed_won_count + self.closed_lost_count
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct RepTally {
    won: u32,
    lost: u32,
    won_revenue: f64,
    pipeline_open: f64,
}

/// Per-rep quarter stats for every rep in the store, in store order.
/// Win/loss counts and won revenue are scoped to deals closed inside
/// the quarter; open pipeline is counted regardless of age.
pub(crate) fn rep_quarter_stats(store: &DeskStore, quarter: QuarterWindow) -> Vec<RepRisk> {
    let mut tallies: BTreeMap<&str, RepTally> = store
        .reps
        .iter()
        .map(|r| (r.rep_id.as_str(), RepTally::default()))
        .collect();

    for d in &store.deals {
        let Some(tally) = tallies.get_mut(d.rep_id.as_str()) else {
            continue;
        };
        let amount = d.amount_or_zero();

        if d.stage.is_open() {
            tally.pipeline_open += amount;
            continue;
        }
        let Some(closed) = d.closed_at else { continue };
        if !quarter.contains(closed) {
            continue;
        }
        if d.stage.is_won() {
            tally.won += 1;
            tally.won_revenue += amount;
        } else {
            tally.lost += 1;
        }
    }

    store
        .reps
        .iter()
        .map(|rep| {
            let t = tallies
                .get(rep.rep_id.as_str())
                .copied()
                .unwrap_or_default();
            let closed = t.won + t.lost;
            RepRisk {
                rep_id: rep.rep_id.clone(),
                rep_name: rep.name.clone(),
                win_rate_pct: if closed == 0 {
                    None
                } else {
                    Some(round2(f64::from(t.won) / f64::from(closed) * 100.0))
                },
                closed_won_count: t.won,
                closed_lost_count: t.lost,
                closed_won_revenue: round2(t.won_revenue),
                pipeline_open_amount: round2(t.pipeline_open),
            }
        })
        .collect()
}

/// A rep underperforms when the in-quarter sample is big enough and
/// the win rate sits under the threshold, or when nothing was won at
/// all despite open pipeline.
fn underperforming(rows: Vec<RepRisk>, config: &RiskConfig) -> Vec<RepRisk> {
    let mut flagged: Vec<RepRisk> = rows
        .into_iter()
        .filter(|r| {
            let low_win_rate = r.closed_in_quarter() >= config.min_closed_for_win_rate
                && r.win_rate_pct.unwrap_or(100.0) < config.underperformer_win_rate_pct;
            let stuck = r.closed_won_revenue == 0.0 && r.pipeline_open_amount > 0.0;
            low_win_rate || stuck
        })
        .collect();

    // Worst win rate first; reps with no rated quarter sort last
    // among the flagged, then by revenue.
    flagged.sort_by(|a, b| {
        a.win_rate_pct
            .unwrap_or(101.0)
            .partial_cmp(&b.win_rate_pct.unwrap_or(101.0))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                a.closed_won_revenue
                    .partial_cmp(&b.closed_won_revenue)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });
    flagged
}

// ── Low-activity accounts ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRisk {
    pub account_id: String,
    pub account_name: String,
    pub industry: String,
    pub segment: String,
    pub activities_last_n_days: usize,
    /// Last touch inside the lookback window, if any.
    pub last_activity_at: Option<NaiveDate>,
    pub open_deals_count: usize,
    pub open_deals_amount: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct OpenTally {
    count: usize,
    amount: f64,
}

/// Accounts at or below the activity threshold in the lookback
/// window. Accounts without open deals still appear; the sort pushes
/// them to the bottom.
fn account_risks(store: &DeskStore, index: &ActivityIndex, t: &ThresholdParams) -> Vec<AccountRisk> {
    let mut open_by_account: HashMap<&str, OpenTally> = HashMap::new();
    for d in store.open_deals() {
        let tally = open_by_account.entry(d.account_id.as_str()).or_default();
        tally.count += 1;
        tally.amount += d.amount_or_zero();
    }

    let mut rows: Vec<AccountRisk> = Vec::new();
    for account in &store.accounts {
        let id = account.account_id.as_str();
        let activities = index.in_window_by_account.get(id).copied().unwrap_or(0);
        if activities > t.low_activity_max_count as usize {
            continue;
        }
        let open = open_by_account.get(id).copied().unwrap_or_default();
        rows.push(AccountRisk {
            account_id: account.account_id.clone(),
            account_name: account.name.clone(),
            industry: account.industry.clone(),
            segment: account.segment.clone(),
            activities_last_n_days: activities,
            last_activity_at: index.last_in_window_by_account.get(id).copied(),
            open_deals_count: open.count,
            open_deals_amount: round2(open.amount),
        });
    }

    // Open pipeline at risk first, then the quietest, then the most
    // money on the table.
    rows.sort_by(|a, b| {
        b.open_deals_count
            .cmp(&a.open_deals_count)
            .then_with(|| a.activities_last_n_days.cmp(&b.activities_last_n_days))
            .then_with(|| {
                b.open_deals_amount
                    .partial_cmp(&a.open_deals_amount)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });
    rows
}

// ── Assembly ─────────────────────────────────────────────────────────────

/// One risk view: how many matched in total, and the top slice.
#[derive(Debug, Clone, Serialize)]
pub struct RiskSection<T> {
    pub count: usize,
    pub top: Vec<T>,
}

impl<T> RiskSection<T> {
    fn take(mut rows: Vec<T>, limit: i64) -> RiskSection<T> {
        let count = rows.len();
        rows.truncate(limit as usize);
        RiskSection { count, top: rows }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactors {
    pub current_quarter: String,
    pub period: Period,
    pub parameters: RiskParameters,
    pub stale_deals: RiskSection<DealRisk>,
    pub underperforming_reps: RiskSection<RepRisk>,
    pub low_activity_accounts: RiskSection<AccountRisk>,
}

pub fn risk_factors(
    store: &DeskStore,
    config: &DeskConfig,
    query: &QueryMap,
) -> DeskResult<RiskFactors> {
    let quarter = store.anchor_quarter()?;
    let thresholds = ThresholdParams::from_query(query, &config.risk, quarter.end_date());
    let limit = query.int_clamped("limit", 10, 1, 50);

    let index = ActivityIndex::build(store, &thresholds);
    let reps = underperforming(rep_quarter_stats(store, quarter), &config.risk);

    Ok(RiskFactors {
        current_quarter: quarter.label(),
        period: Period::of_quarter(quarter),
        parameters: RiskParameters { thresholds, limit },
        stale_deals: RiskSection::take(stale_deals(store, &index, &thresholds), limit),
        underperforming_reps: RiskSection::take(reps, limit),
        low_activity_accounts: RiskSection::take(account_risks(store, &index, &thresholds), limit),
    })
}
