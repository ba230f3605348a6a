//! Deterministic synthetic CRM dataset generation.
//!
//! Builds the five raw collections with a realistic shape AND the
//! junk the cleaning pipeline exists for: duplicate deal snapshots,
//! negative and string-typed amounts, malformed dates, dangling
//! references, blank identity fields. Same options, same dataset,
//! byte for byte.
//!
//! RULES:
//!   - All randomness comes from the family streams in `rng`; record
//!     counts and id spellings are functions of `SynthOptions` alone.
//!   - Junk lands on fixed index cadences so any dataset of
//!     reasonable size exercises every cleaning rule.

use chrono::{Duration, NaiveDate};
use serde_json::{json, Value};

use crate::raw::{RawAccount, RawActivity, RawDataset, RawDeal, RawRep, RawTarget};
use crate::rng::{StreamBank, StreamRng, StreamSlot};
use crate::types::MonthKey;

// ── Curated pools ────────────────────────────────────────────────────────

const INDUSTRIES: [&str; 5] = ["SaaS", "Ecommerce", "FinTech", "EdTech", "Healthcare"];
const SEGMENTS: [&str; 3] = ["SMB", "Mid-Market", "Enterprise"];
const ACTIVITY_KINDS: [&str; 4] = ["call", "email", "demo", "note"];

const COMPANY_HEADS: [&str; 24] = [
    "Northwind", "Acme", "Globex", "Initech", "Umbra", "Vertex", "Halcyon", "Pinnacle",
    "Bluepeak", "Cedarline", "Quartz", "Ironwood", "Silverbirch", "Brightwater", "Stonegate",
    "Copperfield", "Lakeshore", "Redwood", "Summit", "Harborview", "Goldcrest", "Riverbend",
    "Foxglove", "Maplestone",
];
const COMPANY_TAILS: [&str; 12] = [
    "Labs", "Systems", "Digital", "Software", "Analytics", "Holdings", "Commerce", "Solutions",
    "Technologies", "Group", "Partners", "Media",
];

const REP_FIRST_NAMES: [&str; 16] = [
    "Ava", "Noah", "Mia", "Liam", "Zoe", "Ethan", "Ruth", "Marcus", "Priya", "Diego", "Hannah",
    "Felix", "Ingrid", "Tomas", "Amara", "Jonas",
];
const REP_LAST_NAMES: [&str; 16] = [
    "Okafor", "Lindqvist", "Moreau", "Tanaka", "Petrov", "Alvarez", "Schneider", "Haddad",
    "Kowalski", "Eriksen", "Duarte", "Nakamura", "Osei", "Varga", "Lindholm", "Castillo",
];

// Alternate spellings the stage normalizer must fold back together.
const WON_SPELLINGS: [&str; 4] = ["Closed Won", "won", "closed-won", "Closed won"];
const LOST_SPELLINGS: [&str; 4] = ["Closed Lost", "lost", "closed-lost", "closed Lost"];
const PROSPECTING_SPELLINGS: [&str; 3] = ["Prospecting", "prospect", "PROSPECTING"];
const NEGOTIATION_SPELLINGS: [&str; 3] = ["Negotiation", "negotiating", " Negotiation "];
// Stages outside the canonical four, kept verbatim end to end.
const ODD_STAGES: [&str; 2] = ["On Hold", "Qualified"];

// ── Options ──────────────────────────────────────────────────────────────

/// Dataset shape knobs. Defaults give a demo-sized book of business
/// with target months ending in June 2025.
#[derive(Debug, Clone, Copy)]
pub struct SynthOptions {
    pub seed: u64,
    pub accounts: usize,
    pub reps: usize,
    pub deals: usize,
    /// How many consecutive target months to cover.
    pub months: usize,
    /// Latest target month; earlier months walk back from here.
    pub end_month: MonthKey,
}

impl Default for SynthOptions {
    fn default() -> Self {
        SynthOptions {
            seed: 7,
            accounts: 18,
            reps: 6,
            deals: 140,
            months: 12,
            end_month: MonthKey {
                year: 2025,
                month: 6,
            },
        }
    }
}

// ── Generation ───────────────────────────────────────────────────────────

/// One deal decided up front, before serialization. Activities and
/// junk injection both work from this plan.
struct DealPlan {
    id: String,
    account_id: String,
    rep_id: String,
    spelled_stage: String,
    amount: Option<f64>,
    created: NaiveDate,
    closed: Option<NaiveDate>,
}

/// Produce the five raw collections for the given options.
pub fn generate(options: &SynthOptions) -> RawDataset {
    let bank = StreamBank::new(options.seed);
    let months = month_window(options);

    let accounts = gen_accounts(options, &mut bank.stream(StreamSlot::Accounts));
    let reps = gen_reps(options, &mut bank.stream(StreamSlot::Reps));
    let targets = gen_targets(&months, &mut bank.stream(StreamSlot::Targets));
    let plans = gen_deal_plans(options, &months, &mut bank.stream(StreamSlot::Deals));
    let deals = plans.iter().map(deal_record).collect();
    let activities = gen_activities(&plans, &mut bank.stream(StreamSlot::Activities));

    let mut data = RawDataset {
        accounts,
        reps,
        targets,
        deals,
        activities,
    };
    inject_dirt(&mut data, &plans, &mut bank.stream(StreamSlot::Dirt));

    log::info!(
        "synthesized dataset seed={}: accounts={} reps={} targets={} deals={} activities={}",
        options.seed,
        data.accounts.len(),
        data.reps.len(),
        data.targets.len(),
        data.deals.len(),
        data.activities.len()
    );
    data
}

/// The covered months in chronological order.
fn month_window(options: &SynthOptions) -> Vec<MonthKey> {
    let len = options.months.max(1);
    let mut months = Vec::with_capacity(len);
    let mut cursor = options.end_month;
    for _ in 0..len {
        months.push(cursor);
        cursor = cursor.prev();
    }
    months.reverse();
    months
}

fn gen_accounts(options: &SynthOptions, rng: &mut StreamRng) -> Vec<RawAccount> {
    (1..=options.accounts.max(1))
        .map(|i| {
            let name = format!("{} {}", rng.pick(&COMPANY_HEADS), rng.pick(&COMPANY_TAILS));
            // A few accounts come in without an industry; cleaning
            // buckets them under "Unknown".
            let industry = if rng.chance(0.08) {
                Value::Null
            } else {
                json!(rng.pick(&INDUSTRIES))
            };
            RawAccount {
                account_id: json!(format!("acct_{i:02}")),
                name: json!(name),
                industry,
                segment: json!(rng.pick(&SEGMENTS)),
            }
        })
        .collect()
}

fn gen_reps(options: &SynthOptions, rng: &mut StreamRng) -> Vec<RawRep> {
    (1..=options.reps.max(1))
        .map(|i| {
            let name = format!(
                "{} {}",
                rng.pick(&REP_FIRST_NAMES),
                rng.pick(&REP_LAST_NAMES)
            );
            RawRep {
                rep_id: json!(format!("rep_{i:02}")),
                name: json!(name),
            }
        })
        .collect()
}

fn gen_targets(months: &[MonthKey], rng: &mut StreamRng) -> Vec<RawTarget> {
    months
        .iter()
        .enumerate()
        .map(|(i, month)| {
            let base = 90_000.0 + i as f64 * 2_500.0;
            let jitter = rng.below(7) as f64 * 5_000.0;
            RawTarget {
                month: json!(month.to_string()),
                target: json!(base + jitter),
            }
        })
        .collect()
}

fn gen_deal_plans(
    options: &SynthOptions,
    months: &[MonthKey],
    rng: &mut StreamRng,
) -> Vec<DealPlan> {
    let horizon = months
        .last()
        .map(|m| m.end_date())
        .unwrap_or(NaiveDate::MIN);
    let n_accounts = options.accounts.max(1) as i64;
    let n_reps = options.reps.max(1) as i64;
    (1..=options.deals)
        .map(|i| {
            let month = *rng.pick(months);
            let created = month.start_date() + Duration::days(rng.between(0, 27));
            let stage = roll_stage(rng);
            let closed = if stage == "Closed Won" || stage == "Closed Lost" {
                Some((created + Duration::days(rng.between(5, 90))).min(horizon))
            } else {
                None
            };
            let amount = if rng.chance(0.05) {
                None
            } else {
                Some(round_to_hundred(rng.pareto(4_000.0, 1.6).min(250_000.0)))
            };
            DealPlan {
                id: format!("deal_{i:04}"),
                account_id: format!("acct_{:02}", rng.between(1, n_accounts)),
                rep_id: format!("rep_{:02}", rng.between(1, n_reps)),
                spelled_stage: spell_stage(stage, rng),
                amount,
                created,
                closed,
            }
        })
        .collect()
}

fn roll_stage(rng: &mut StreamRng) -> &'static str {
    let r = rng.next_f64();
    if r < 0.26 {
        "Prospecting"
    } else if r < 0.52 {
        "Negotiation"
    } else if r < 0.78 {
        "Closed Won"
    } else if r < 0.96 {
        "Closed Lost"
    } else {
        *rng.pick(&ODD_STAGES)
    }
}

/// Emit the stage label, sometimes in an alternate spelling.
fn spell_stage(stage: &'static str, rng: &mut StreamRng) -> String {
    if !rng.chance(0.25) {
        return stage.to_string();
    }
    let spelled = match stage {
        "Closed Won" => rng.pick(&WON_SPELLINGS),
        "Closed Lost" => rng.pick(&LOST_SPELLINGS),
        "Prospecting" => rng.pick(&PROSPECTING_SPELLINGS),
        "Negotiation" => rng.pick(&NEGOTIATION_SPELLINGS),
        other => return other.to_string(),
    };
    spelled.to_string()
}

fn deal_record(plan: &DealPlan) -> RawDeal {
    RawDeal {
        deal_id: json!(plan.id),
        account_id: json!(plan.account_id),
        rep_id: json!(plan.rep_id),
        stage: json!(plan.spelled_stage),
        amount: plan.amount.map(|a| json!(a)).unwrap_or(Value::Null),
        created_at: json!(plan.created.to_string()),
        closed_at: plan
            .closed
            .map(|d| json!(d.to_string()))
            .unwrap_or(Value::Null),
    }
}

fn gen_activities(plans: &[DealPlan], rng: &mut StreamRng) -> Vec<RawActivity> {
    let mut out = Vec::new();
    let mut next_id = 1usize;
    for plan in plans {
        // A fifth of deals never get touched at all.
        let count = if rng.chance(0.2) { 0 } else { rng.between(1, 5) };
        let span = plan
            .closed
            .map(|c| (c - plan.created).num_days())
            .unwrap_or(45)
            .max(1);
        for _ in 0..count {
            let kind = *rng.pick(&ACTIVITY_KINDS);
            let kind = if rng.chance(0.15) {
                capitalize(kind)
            } else {
                kind.to_string()
            };
            let when = plan.created + Duration::days(rng.between(0, span));
            let timestamp = if rng.chance(0.06) {
                Value::Null
            } else {
                json!(when.to_string())
            };
            out.push(RawActivity {
                activity_id: json!(format!("act_{next_id:05}")),
                deal_id: json!(plan.id),
                kind: json!(kind),
                timestamp,
            });
            next_id += 1;
        }
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn round_to_hundred(x: f64) -> f64 {
    (x / 100.0).round() * 100.0
}

// ── Junk injection ───────────────────────────────────────────────────────

/// Deterministic dirt on top of the clean shape. Every rule in the
/// cleaning pipeline gets at least one customer here.
fn inject_dirt(data: &mut RawDataset, plans: &[DealPlan], rng: &mut StreamRng) {
    // Snapshot duplicates: a second record for an already-emitted deal
    // id, still at an earlier stage. The collapse must prefer the
    // record that progressed further.
    for (i, plan) in plans.iter().enumerate() {
        if i % 17 == 3 {
            data.deals.push(RawDeal {
                deal_id: json!(plan.id),
                account_id: json!(plan.account_id),
                rep_id: json!(plan.rep_id),
                stage: json!("Prospecting"),
                amount: plan.amount.map(|a| json!(a)).unwrap_or(Value::Null),
                created_at: json!(plan.created.to_string()),
                closed_at: Value::Null,
            });
        }
    }

    // In-record junk on fixed cadences: negative amounts, numeric
    // strings, unparseable dates.
    for (i, deal) in data.deals.iter_mut().enumerate().take(plans.len()) {
        if i % 29 == 7 {
            deal.amount = json!(-(rng.between(1_000, 20_000) as f64));
        }
        if i % 31 == 11 {
            deal.created_at = json!("soon");
        }
        if i % 41 == 5 {
            deal.amount = json!(format!("{}", rng.between(5_000, 60_000)));
        }
    }

    // A close date before the created date. Cleaning keeps the deal
    // and discards the close date.
    if let Some(plan) = plans.first() {
        data.deals.push(RawDeal {
            deal_id: json!("deal_backdated"),
            account_id: json!(plan.account_id),
            rep_id: json!(plan.rep_id),
            stage: json!("Closed Won"),
            amount: json!(18_000.0),
            created_at: json!(plan.created.to_string()),
            closed_at: json!((plan.created - Duration::days(30)).to_string()),
        });
    }

    // Dangling references, dropped with their own tally.
    data.deals.push(RawDeal {
        deal_id: json!("deal_ghost_account"),
        account_id: json!("acct_nowhere"),
        rep_id: json!("rep_01"),
        stage: json!("Negotiation"),
        amount: json!(9_500.0),
        created_at: Value::Null,
        closed_at: Value::Null,
    });
    data.activities.push(RawActivity {
        activity_id: json!("act_ghost_deal"),
        deal_id: json!("deal_nowhere"),
        kind: json!("call"),
        timestamp: Value::Null,
    });

    // Identity junk: blank names and ids are invalid, repeated ids
    // lose to the first occurrence.
    data.accounts.push(RawAccount {
        account_id: json!("acct_anon"),
        name: json!("   "),
        industry: json!("SaaS"),
        segment: Value::Null,
    });
    data.reps.push(RawRep {
        rep_id: json!(""),
        name: json!("Nameless Rep"),
    });
    if let Some(first) = data.targets.first().cloned() {
        data.targets.push(RawTarget {
            month: first.month,
            target: json!(1.0),
        });
    }
    data.targets.push(RawTarget {
        month: json!("2025-13"),
        target: json!(50_000.0),
    });
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DeskStore;

    fn as_json<T: serde::Serialize>(records: &[T]) -> String {
        serde_json::to_string(records).unwrap()
    }

    #[test]
    fn same_options_produce_identical_collections() {
        let a = generate(&SynthOptions::default());
        let b = generate(&SynthOptions::default());
        assert_eq!(
            as_json(&a.deals),
            as_json(&b.deals),
            "same seed should produce the same deals"
        );
        assert_eq!(
            as_json(&a.activities),
            as_json(&b.activities),
            "same seed should produce the same activities"
        );
    }

    #[test]
    fn different_seeds_diverge() {
        let a = generate(&SynthOptions::default());
        let b = generate(&SynthOptions {
            seed: 8,
            ..SynthOptions::default()
        });
        assert_ne!(
            as_json(&a.deals),
            as_json(&b.deals),
            "changing the seed should change the deals"
        );
    }

    #[test]
    fn dirt_exercises_the_cleaning_rules() {
        let options = SynthOptions::default();
        let data = generate(&options);
        assert!(
            data.deals.len() > options.deals,
            "snapshot duplicates and junk records should inflate the raw deal count"
        );

        let store = DeskStore::build(&data);
        assert!(
            store.report.total_dropped() > 0,
            "some raw records should be dropped or merged"
        );
        assert!(
            store.report.deals.dangling > 0,
            "the ghost-account deal should be dropped as dangling"
        );
        assert!(
            store.report.targets.duplicate > 0,
            "the repeated target month should lose to the first occurrence"
        );
        assert!(
            store.deals.len() <= options.deals + 2,
            "collapse should fold duplicate snapshots back to one record per deal id"
        );
    }

    #[test]
    fn generated_months_cover_the_requested_window() {
        let options = SynthOptions::default();
        let data = generate(&options);
        let store = DeskStore::build(&data);
        assert_eq!(
            store.latest_target_month(),
            Some(options.end_month),
            "latest target month should be the configured end month"
        );
        assert_eq!(
            store.targets.len(),
            options.months,
            "one target per requested month"
        );
    }
}
