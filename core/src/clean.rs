//! Cleaning pipeline: turns raw records into canonical entities.
//!
//! RULES:
//!   - Identity fields must be non-empty strings after trimming;
//!     records failing that are dropped as invalid.
//!   - Numbers accept JSON numbers or numeric strings, finite only.
//!   - Dates are strict `YYYY-MM-DD`; anything else becomes `None`.
//!   - A closed date earlier than the created date is discarded, the
//!     deal stays with its created date.
//!   - Deals and activities must resolve their foreign keys against
//!     the already-cleaned parent sets or they are dropped as dangling.
//!   - Duplicate ids are first-wins for accounts, reps, targets and
//!     activities. Deal snapshots are merged later by stage priority
//!     (see `store::collapse_deals`).
//!
//! Nothing in this module fails: bad records are counted, logged by
//! the store build, and skipped.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::raw::{RawAccount, RawActivity, RawDeal, RawRep, RawTarget};
use crate::store::{Account, Activity, Deal, Rep, Target};
use crate::types::{DealStage, MonthKey};

// ── Field coercion ───────────────────────────────────────────────────────

/// Trimmed non-empty string, or nothing.
pub fn clean_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        _ => None,
    }
}

/// Trimmed non-empty string, or the fallback category.
pub fn string_or(v: &Value, fallback: &str) -> String {
    clean_string(v).unwrap_or_else(|| fallback.to_string())
}

/// Finite number from a JSON number or a numeric string.
pub fn finite_number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        _ => return None,
    };
    if n.is_finite() {
        Some(n)
    } else {
        None
    }
}

/// Strict `YYYY-MM-DD` date.
pub fn iso_date(v: &Value) -> Option<NaiveDate> {
    match v {
        Value::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
        _ => None,
    }
}

// ── Drop accounting ──────────────────────────────────────────────────────

/// Per-collection cleaning tally. `duplicate` covers first-wins drops
/// and, for deals, snapshots merged by the stage collapse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanCounts {
    pub input: usize,
    pub kept: usize,
    pub invalid: usize,
    pub duplicate: usize,
    pub dangling: usize,
}

impl CleanCounts {
    pub fn dropped(&self) -> usize {
        self.invalid + self.duplicate + self.dangling
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub accounts: CleanCounts,
    pub reps: CleanCounts,
    pub targets: CleanCounts,
    pub deals: CleanCounts,
    pub activities: CleanCounts,
}

impl CleanReport {
    pub fn total_dropped(&self) -> usize {
        self.accounts.dropped()
            + self.reps.dropped()
            + self.targets.dropped()
            + self.deals.dropped()
            + self.activities.dropped()
    }
}

// ── Collection cleaning ──────────────────────────────────────────────────

pub fn clean_accounts(raw: &[RawAccount]) -> (Vec<Account>, CleanCounts) {
    let mut counts = CleanCounts {
        input: raw.len(),
        ..CleanCounts::default()
    };
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for r in raw {
        let (Some(account_id), Some(name)) = (clean_string(&r.account_id), clean_string(&r.name))
        else {
            counts.invalid += 1;
            continue;
        };
        if !seen.insert(account_id.clone()) {
            counts.duplicate += 1;
            continue;
        }
        out.push(Account {
            account_id,
            name,
            industry: string_or(&r.industry, "Unknown"),
            segment: string_or(&r.segment, "Unknown"),
        });
    }
    counts.kept = out.len();
    (out, counts)
}

pub fn clean_reps(raw: &[RawRep]) -> (Vec<Rep>, CleanCounts) {
    let mut counts = CleanCounts {
        input: raw.len(),
        ..CleanCounts::default()
    };
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for r in raw {
        let (Some(rep_id), Some(name)) = (clean_string(&r.rep_id), clean_string(&r.name)) else {
            counts.invalid += 1;
            continue;
        };
        if !seen.insert(rep_id.clone()) {
            counts.duplicate += 1;
            continue;
        }
        out.push(Rep { rep_id, name });
    }
    counts.kept = out.len();
    (out, counts)
}

pub fn clean_targets(raw: &[RawTarget]) -> (Vec<Target>, CleanCounts) {
    let mut counts = CleanCounts {
        input: raw.len(),
        ..CleanCounts::default()
    };
    let mut seen: HashSet<MonthKey> = HashSet::new();
    let mut out = Vec::new();
    for r in raw {
        let month = clean_string(&r.month).and_then(|s| MonthKey::parse(&s));
        let (Some(month), Some(target)) = (month, finite_number(&r.target)) else {
            counts.invalid += 1;
            continue;
        };
        if !seen.insert(month) {
            counts.duplicate += 1;
            continue;
        }
        out.push(Target { month, target });
    }
    counts.kept = out.len();
    (out, counts)
}

/// Validates and normalizes deals. Duplicate deal ids survive here as
/// stage snapshots; the store merges them via `collapse_deals` and
/// accounts for the difference.
pub fn clean_deals(
    raw: &[RawDeal],
    account_ids: &HashSet<&str>,
    rep_ids: &HashSet<&str>,
) -> (Vec<Deal>, CleanCounts) {
    let mut counts = CleanCounts {
        input: raw.len(),
        ..CleanCounts::default()
    };
    let mut out = Vec::new();
    for r in raw {
        let (Some(deal_id), Some(account_id), Some(rep_id)) = (
            clean_string(&r.deal_id),
            clean_string(&r.account_id),
            clean_string(&r.rep_id),
        ) else {
            counts.invalid += 1;
            continue;
        };
        if !account_ids.contains(account_id.as_str()) || !rep_ids.contains(rep_id.as_str()) {
            counts.dangling += 1;
            continue;
        }
        let stage = match &r.stage {
            Value::String(s) => DealStage::normalize(s),
            _ => DealStage::unknown(),
        };
        let amount = finite_number(&r.amount).filter(|a| *a >= 0.0);
        let created_at = iso_date(&r.created_at);
        let mut closed_at = iso_date(&r.closed_at);
        if let (Some(created), Some(closed)) = (created_at, closed_at) {
            if closed < created {
                closed_at = None;
            }
        }
        out.push(Deal {
            deal_id,
            account_id,
            rep_id,
            stage,
            amount,
            created_at,
            closed_at,
        });
    }
    counts.kept = out.len();
    (out, counts)
}

pub fn clean_activities(raw: &[RawActivity], deal_ids: &HashSet<&str>) -> (Vec<Activity>, CleanCounts) {
    let mut counts = CleanCounts {
        input: raw.len(),
        ..CleanCounts::default()
    };
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for r in raw {
        let (Some(activity_id), Some(deal_id)) =
            (clean_string(&r.activity_id), clean_string(&r.deal_id))
        else {
            counts.invalid += 1;
            continue;
        };
        if !deal_ids.contains(deal_id.as_str()) {
            counts.dangling += 1;
            continue;
        }
        if !seen.insert(activity_id.clone()) {
            counts.duplicate += 1;
            continue;
        }
        let kind = match clean_string(&r.kind) {
            Some(k) => k.to_lowercase(),
            None => "unknown".to_string(),
        };
        out.push(Activity {
            activity_id,
            deal_id,
            kind,
            timestamp: iso_date(&r.timestamp),
        });
    }
    counts.kept = out.len();
    (out, counts)
}
