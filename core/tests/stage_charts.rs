use salesdesk_core::query::QueryMap;
use salesdesk_core::raw::{RawAccount, RawActivity, RawDataset, RawDeal, RawRep, RawTarget};
use salesdesk_core::stages::{deals_by_stage, open_deals_latest_activity, stale_open_deals};
use salesdesk_core::store::DeskStore;
use serde_json::{json, Value};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn deal(id: &str, stage: &str, amount: f64, created: &str, closed: Option<&str>) -> RawDeal {
    RawDeal {
        deal_id: json!(id),
        account_id: json!("acct_01"),
        rep_id: json!("rep_01"),
        stage: json!(stage),
        amount: json!(amount),
        created_at: json!(created),
        closed_at: closed.map(|c| json!(c)).unwrap_or(Value::Null),
    }
}

fn activity(id: &str, deal_id: &str, kind: &str, timestamp: &str) -> RawActivity {
    RawActivity {
        activity_id: json!(id),
        deal_id: json!(deal_id),
        kind: json!(kind),
        timestamp: json!(timestamp),
    }
}

fn build(deals: Vec<RawDeal>, activities: Vec<RawActivity>) -> DeskStore {
    DeskStore::build(&RawDataset {
        accounts: vec![RawAccount {
            account_id: json!("acct_01"),
            name: json!("Northwind Labs"),
            industry: json!("SaaS"),
            segment: json!("SMB"),
        }],
        reps: vec![RawRep {
            rep_id: json!("rep_01"),
            name: json!("Ava Okafor"),
        }],
        targets: vec![RawTarget {
            month: json!("2025-06"),
            target: json!(100_000.0),
        }],
        deals,
        activities,
    })
}

fn count_of(result: &salesdesk_core::stages::StageCounts, stage: &str) -> usize {
    result
        .chart_data
        .iter()
        .find(|row| row.stage == stage)
        .map(|row| row.count)
        .unwrap_or_else(|| panic!("stage {stage} missing from chart"))
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Two snapshots of the same deal id count once, under the
/// highest-priority stage.
#[test]
fn duplicate_snapshots_collapse_to_one_count() {
    let store = build(
        vec![
            deal("d1", "prospecting", 100.0, "2025-01-05", None),
            deal("d1", "Closed Won", 100.0, "2025-01-05", Some("2025-02-01")),
        ],
        vec![],
    );

    let result = deals_by_stage(&store);

    assert_eq!(count_of(&result, "Closed Won"), 1);
    assert_eq!(count_of(&result, "Closed Lost"), 0);
    assert_eq!(count_of(&result, "Negotiation"), 0);
    assert_eq!(count_of(&result, "Prospecting"), 0);
    assert_eq!(result.total_unique_deals, 1);
}

/// The four canonical stages always appear, in the fixed display
/// order, even at zero.
#[test]
fn canonical_stages_keep_their_display_order() {
    let store = build(vec![deal("d1", "Negotiation", 100.0, "2025-06-01", None)], vec![]);
    let result = deals_by_stage(&store);

    let order: Vec<&str> = result.chart_data.iter().map(|r| r.stage.as_str()).collect();
    assert_eq!(
        order,
        vec!["Closed Won", "Closed Lost", "Negotiation", "Prospecting"]
    );
}

/// Passthrough stages get their own appended rows, so the stage counts
/// always sum to the unique deal count.
#[test]
fn stage_counts_sum_to_unique_deals() {
    let store = build(
        vec![
            deal("d1", "Closed Won", 100.0, "2025-05-01", Some("2025-06-01")),
            deal("d2", "Prospecting", 100.0, "2025-06-01", None),
            deal("d3", "On Hold", 100.0, "2025-06-01", None),
            deal("d3", "On Hold", 100.0, "2025-06-01", None),
            deal("d4", "Qualified", 100.0, "2025-06-01", None),
        ],
        vec![],
    );

    let result = deals_by_stage(&store);

    assert_eq!(count_of(&result, "On Hold"), 1);
    assert_eq!(count_of(&result, "Qualified"), 1);
    let sum: usize = result.chart_data.iter().map(|r| r.count).sum();
    assert_eq!(sum, result.total_unique_deals, "invariant: counts sum to unique deals");
    assert_eq!(result.total, result.total_unique_deals);
}

/// Stale-open-deals counts open Prospecting and Negotiation deals
/// older than the threshold, anchored on the quarter end (2025-06-30
/// here), never wall-clock time.
#[test]
fn stale_open_counts_are_anchored_on_the_quarter_end() {
    let store = build(
        vec![
            deal("d_old_prospect", "Prospecting", 100.0, "2025-04-01", None),
            deal("d_old_negotiation", "Negotiation", 100.0, "2025-05-01", None),
            deal("d_fresh", "Prospecting", 100.0, "2025-06-20", None),
            deal("d_closed", "Closed Won", 100.0, "2025-01-01", Some("2025-02-01")),
        ],
        vec![],
    );

    let result = stale_open_deals(&store, &QueryMap::from_pairs([("days", "30")])).unwrap();

    assert_eq!(result.days, 30);
    let count = |stage: &str| {
        result
            .rows
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| r.count)
            .unwrap()
    };
    assert_eq!(count("Prospecting"), 1, "the fresh deal is under the cutoff");
    assert_eq!(count("Negotiation"), 1);
}

/// The days threshold clamps like every other parameter.
#[test]
fn stale_days_parameter_clamps() {
    let store = build(vec![deal("d1", "Prospecting", 100.0, "2020-01-01", None)], vec![]);

    let result = stale_open_deals(&store, &QueryMap::from_pairs([("days", "9999")])).unwrap();
    assert_eq!(result.days, 365);

    let result = stale_open_deals(&store, &QueryMap::new()).unwrap();
    assert_eq!(result.days, 30, "absent parameter takes the default");
}

/// Each open deal contributes its most recent dated activity; deals
/// whose latest touch is an untracked kind contribute nothing.
#[test]
fn latest_activity_picks_the_most_recent_touch() {
    let store = build(
        vec![
            deal("d1", "Prospecting", 100.0, "2025-05-01", None),
            deal("d2", "Negotiation", 100.0, "2025-05-01", None),
            deal("d3", "Negotiation", 100.0, "2025-05-01", None),
            deal("d_closed", "Closed Won", 100.0, "2025-05-01", Some("2025-06-01")),
        ],
        vec![
            activity("a1", "d1", "email", "2025-06-01"),
            activity("a2", "d1", "call", "2025-06-10"),
            activity("a3", "d2", "demo", "2025-06-05"),
            // d3's latest touch is a "note", which the breakdown does not track.
            activity("a4", "d3", "call", "2025-06-01"),
            activity("a5", "d3", "note", "2025-06-12"),
            // Closed deals stay out entirely.
            activity("a6", "d_closed", "call", "2025-06-20"),
        ],
    );

    let result = open_deals_latest_activity(&store);

    let count = |kind: &str| {
        result
            .rows
            .iter()
            .find(|r| r.kind == kind)
            .map(|r| r.count)
            .unwrap_or(0)
    };
    assert_eq!(count("call"), 1, "d1's call outdates its email");
    assert_eq!(count("demo"), 1);
    assert_eq!(count("email"), 0);
    assert_eq!(count("note"), 0, "untracked kinds never appear");
}
