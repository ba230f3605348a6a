//! Canonical in-memory snapshot of the cleaned dataset.
//!
//! `DeskStore::build` runs the cleaning pipeline in dependency order
//! (accounts and reps before deals, deals before activities), merges
//! deal stage snapshots into one current record per deal id, and
//! freezes the result. Everything downstream borrows this snapshot;
//! nothing mutates it.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::clean::{self, CleanReport};
use crate::error::{DeskError, DeskResult};
use crate::raw::RawDataset;
use crate::types::{DealStage, MonthKey, QuarterWindow};

// ── Canonical entities ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub account_id: String,
    pub name: String,
    /// Trimmed label; "Unknown" when the record carried none.
    pub industry: String,
    /// Trimmed label; "Unknown" when the record carried none.
    pub segment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rep {
    pub rep_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Target {
    pub month: MonthKey,
    pub target: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deal {
    pub deal_id: String,
    pub account_id: String,
    pub rep_id: String,
    pub stage: DealStage,
    /// Validated non-negative; `None` when missing or unusable.
    pub amount: Option<f64>,
    pub created_at: Option<NaiveDate>,
    /// Never earlier than `created_at`; that case is nulled in cleaning.
    pub closed_at: Option<NaiveDate>,
}

impl Deal {
    /// Amount treated as revenue: missing sums as zero.
    pub fn amount_or_zero(&self) -> f64 {
        self.amount.unwrap_or(0.0)
    }

    /// Strictly positive amount, for averages that skip zero/missing.
    pub fn positive_amount(&self) -> Option<f64> {
        self.amount.filter(|a| *a > 0.0)
    }

    /// Whole days from created to closed. Requires both dates; a
    /// negative span cannot survive cleaning but is excluded anyway.
    pub fn cycle_days(&self) -> Option<i64> {
        let (created, closed) = (self.created_at?, self.closed_at?);
        let days = (closed - created).num_days();
        if days < 0 {
            None
        } else {
            Some(days)
        }
    }

    pub fn created_month(&self) -> Option<MonthKey> {
        self.created_at.map(MonthKey::from_date)
    }

    pub fn closed_month(&self) -> Option<MonthKey> {
        self.closed_at.map(MonthKey::from_date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub activity_id: String,
    pub deal_id: String,
    /// Lowercased free text; "unknown" when the record carried none.
    pub kind: String,
    pub timestamp: Option<NaiveDate>,
}

// ── Deal collapsing ──────────────────────────────────────────────────────

/// Merges multiple stage snapshots of the same deal id into one
/// current record: highest stage priority wins; on equal priority a
/// record carrying a close date beats one without; true ties keep the
/// first record seen. Output preserves first-occurrence order, so the
/// reduction is deterministic and idempotent.
pub fn collapse_deals(deals: &[Deal]) -> Vec<Deal> {
    let mut best: HashMap<&str, &Deal> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for deal in deals {
        match best.entry(deal.deal_id.as_str()) {
            Entry::Vacant(slot) => {
                slot.insert(deal);
                order.push(deal.deal_id.as_str());
            }
            Entry::Occupied(mut slot) => {
                if wins_over(deal, slot.get()) {
                    slot.insert(deal);
                }
            }
        }
    }
    order
        .into_iter()
        .filter_map(|id| best.get(id).map(|d| (*d).clone()))
        .collect()
}

fn wins_over(challenger: &Deal, incumbent: &Deal) -> bool {
    let (cp, ip) = (challenger.stage.priority(), incumbent.stage.priority());
    if cp != ip {
        return cp > ip;
    }
    // Equal rank: the record carrying a close date is the fresher snapshot.
    challenger.closed_at.is_some() && incumbent.closed_at.is_none()
}

// ── The snapshot ─────────────────────────────────────────────────────────

/// Immutable canonical store. Built once, then only read.
#[derive(Debug, Clone)]
pub struct DeskStore {
    pub accounts: Vec<Account>,
    pub reps: Vec<Rep>,
    pub targets: Vec<Target>,
    /// One record per deal id (collapsed current state).
    pub deals: Vec<Deal>,
    pub activities: Vec<Activity>,
    pub report: CleanReport,
    accounts_by_id: HashMap<String, usize>,
    reps_by_id: HashMap<String, usize>,
    deals_by_id: HashMap<String, usize>,
    targets_by_month: BTreeMap<MonthKey, f64>,
    activities_by_deal: HashMap<String, Vec<usize>>,
}

impl DeskStore {
    pub fn build(raw: &RawDataset) -> DeskStore {
        let (accounts, accounts_counts) = clean::clean_accounts(&raw.accounts);
        let (reps, reps_counts) = clean::clean_reps(&raw.reps);
        let (targets, targets_counts) = clean::clean_targets(&raw.targets);

        let account_ids: HashSet<&str> = accounts.iter().map(|a| a.account_id.as_str()).collect();
        let rep_ids: HashSet<&str> = reps.iter().map(|r| r.rep_id.as_str()).collect();
        let (snapshots, mut deals_counts) = clean::clean_deals(&raw.deals, &account_ids, &rep_ids);
        let deals = collapse_deals(&snapshots);
        deals_counts.duplicate = snapshots.len() - deals.len();
        deals_counts.kept = deals.len();

        let deal_ids: HashSet<&str> = deals.iter().map(|d| d.deal_id.as_str()).collect();
        let (activities, activities_counts) = clean::clean_activities(&raw.activities, &deal_ids);

        let report = CleanReport {
            accounts: accounts_counts,
            reps: reps_counts,
            targets: targets_counts,
            deals: deals_counts,
            activities: activities_counts,
        };

        let accounts_by_id = accounts
            .iter()
            .enumerate()
            .map(|(i, a)| (a.account_id.clone(), i))
            .collect();
        let reps_by_id = reps
            .iter()
            .enumerate()
            .map(|(i, r)| (r.rep_id.clone(), i))
            .collect();
        let deals_by_id = deals
            .iter()
            .enumerate()
            .map(|(i, d)| (d.deal_id.clone(), i))
            .collect();
        let targets_by_month: BTreeMap<MonthKey, f64> =
            targets.iter().map(|t| (t.month, t.target)).collect();
        let mut activities_by_deal: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, a) in activities.iter().enumerate() {
            activities_by_deal
                .entry(a.deal_id.clone())
                .or_default()
                .push(i);
        }

        log::info!(
            "canonical store: accounts={} reps={} targets={} deals={} activities={} (dropped {})",
            accounts.len(),
            reps.len(),
            targets.len(),
            deals.len(),
            activities.len(),
            report.total_dropped()
        );
        if report.deals.dangling > 0 {
            log::debug!(
                "deals: {} dropped for unresolved account/rep references",
                report.deals.dangling
            );
        }
        if targets_by_month.is_empty() {
            log::warn!("dataset has no valid target months; quarter-anchored queries will fail");
        }

        DeskStore {
            accounts,
            reps,
            targets,
            deals,
            activities,
            report,
            accounts_by_id,
            reps_by_id,
            deals_by_id,
            targets_by_month,
            activities_by_deal,
        }
    }

    // ── Lookups ──────────────────────────────────────────────────────────

    pub fn account(&self, id: &str) -> Option<&Account> {
        self.accounts_by_id
            .get(id)
            .and_then(|&i| self.accounts.get(i))
    }

    pub fn rep(&self, id: &str) -> Option<&Rep> {
        self.reps_by_id.get(id).and_then(|&i| self.reps.get(i))
    }

    pub fn deal(&self, id: &str) -> Option<&Deal> {
        self.deals_by_id.get(id).and_then(|&i| self.deals.get(i))
    }

    /// Monthly target, zero when the month has none.
    pub fn target_for(&self, month: MonthKey) -> f64 {
        self.targets_by_month.get(&month).copied().unwrap_or(0.0)
    }

    pub fn latest_target_month(&self) -> Option<MonthKey> {
        self.targets_by_month.keys().next_back().copied()
    }

    /// Activities of one deal, in input order.
    pub fn activities_for(&self, deal_id: &str) -> impl Iterator<Item = &Activity> + '_ {
        self.activities_by_deal
            .get(deal_id)
            .into_iter()
            .flatten()
            .filter_map(|&i| self.activities.get(i))
    }

    // ── Anchors ──────────────────────────────────────────────────────────

    /// The quarter containing the latest target month: the analysis
    /// anchor for the summary, risk detection and recommendations.
    pub fn anchor_quarter(&self) -> DeskResult<QuarterWindow> {
        self.latest_target_month()
            .map(QuarterWindow::containing)
            .ok_or(DeskError::NoTargetMonths)
    }

    /// Sorted distinct months touched by deal dates (created or
    /// closed). Drives the month-over-month drivers.
    pub fn deal_months(&self) -> Vec<MonthKey> {
        let mut months: BTreeSet<MonthKey> = BTreeSet::new();
        for d in &self.deals {
            if let Some(m) = d.created_month() {
                months.insert(m);
            }
            if let Some(m) = d.closed_month() {
                months.insert(m);
            }
        }
        months.into_iter().collect()
    }

    /// Deals not yet closed either way.
    pub fn open_deals(&self) -> impl Iterator<Item = &Deal> {
        self.deals.iter().filter(|d| d.stage.is_open())
    }
}
