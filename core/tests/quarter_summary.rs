use salesdesk_core::error::DeskError;
use salesdesk_core::raw::{RawAccount, RawDataset, RawDeal, RawRep, RawTarget};
use salesdesk_core::store::DeskStore;
use salesdesk_core::summary::quarter_summary;
use serde_json::{json, Value};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn dataset(targets: Vec<(&str, f64)>, deals: Vec<RawDeal>) -> RawDataset {
    RawDataset {
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
        targets: targets
            .into_iter()
            .map(|(month, value)| RawTarget {
                month: json!(month),
                target: json!(value),
            })
            .collect(),
        deals,
        activities: vec![],
    }
}

fn won(id: &str, amount: f64, closed: &str) -> RawDeal {
    RawDeal {
        deal_id: json!(id),
        account_id: json!("acct_01"),
        rep_id: json!("rep_01"),
        stage: json!("Closed Won"),
        amount: json!(amount),
        created_at: json!("2025-01-02"),
        closed_at: json!(closed),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// A single target in 2025-03 anchors the analysis on Q1 2025. One
/// won deal of 60000 closed in-quarter against a 100000 target gives
/// a -40000 gap, i.e. -40%.
#[test]
fn gap_against_a_single_target_month() {
    let data = dataset(
        vec![("2025-03", 100_000.0)],
        vec![won("d1", 60_000.0, "2025-03-10")],
    );
    let store = DeskStore::build(&data);

    let summary = quarter_summary(&store).unwrap();

    assert_eq!(summary.current_quarter, "Q1 2025");
    assert_eq!(summary.period.start.to_string(), "2025-01-01");
    assert_eq!(summary.period.end.to_string(), "2025-03-31");
    assert_eq!(summary.revenue, 60_000.0);
    assert_eq!(summary.target, 100_000.0);
    assert_eq!(summary.gap, -40_000.0);
    assert_eq!(summary.gap_pct, -40.0);
}

/// The quarter target sums every target month inside the anchor
/// quarter, and revenue only counts deals closed inside it.
#[test]
fn quarter_boundaries_are_inclusive_month_edges() {
    let data = dataset(
        vec![
            ("2025-04", 50_000.0),
            ("2025-05", 50_000.0),
            ("2025-06", 50_000.0),
        ],
        vec![
            won("d_first_day", 10_000.0, "2025-04-01"),
            won("d_last_day", 20_000.0, "2025-06-30"),
            won("d_before", 99_000.0, "2025-03-31"),
            won("d_after", 99_000.0, "2025-07-01"),
        ],
    );
    let store = DeskStore::build(&data);

    let summary = quarter_summary(&store).unwrap();

    assert_eq!(summary.current_quarter, "Q2 2025");
    assert_eq!(summary.target, 150_000.0);
    assert_eq!(
        summary.revenue, 30_000.0,
        "only deals closed inside the quarter count"
    );
}

/// Quarter-over-quarter change compares against the immediately
/// preceding three-month window using the shared zero-baseline
/// percentage convention.
#[test]
fn qoq_change_uses_the_preceding_quarter() {
    let data = dataset(
        vec![("2025-06", 100_000.0)],
        vec![
            won("d_q2", 90_000.0, "2025-05-15"),
            won("d_q1", 60_000.0, "2025-02-15"),
        ],
    );
    let store = DeskStore::build(&data);

    let summary = quarter_summary(&store).unwrap();

    assert_eq!(summary.change.prev_quarter_revenue, 60_000.0);
    assert_eq!(summary.change.change_pct, 50.0, "(90000-60000)/60000 = +50%");
}

/// A zero previous quarter with non-zero current revenue reports the
/// conventional +100%; zero against zero reports 0.
#[test]
fn qoq_zero_baseline_convention() {
    let with_revenue = dataset(
        vec![("2025-06", 100_000.0)],
        vec![won("d1", 90_000.0, "2025-05-15")],
    );
    let store = DeskStore::build(&with_revenue);
    assert_eq!(quarter_summary(&store).unwrap().change.change_pct, 100.0);

    let without_revenue = dataset(vec![("2025-06", 100_000.0)], vec![]);
    let store = DeskStore::build(&without_revenue);
    let summary = quarter_summary(&store).unwrap();
    assert_eq!(summary.change.change_pct, 0.0);
    assert_eq!(summary.gap_pct, -100.0, "no revenue against a full target");
}

/// Lost deals and won deals without close dates never count toward
/// revenue.
#[test]
fn revenue_counts_only_dated_won_deals() {
    let mut lost = won("d_lost", 50_000.0, "2025-03-10");
    lost.stage = json!("Closed Lost");
    let mut undated = won("d_undated", 50_000.0, "2025-03-10");
    undated.closed_at = Value::Null;

    let data = dataset(
        vec![("2025-03", 100_000.0)],
        vec![won("d1", 60_000.0, "2025-03-10"), lost, undated],
    );
    let store = DeskStore::build(&data);

    assert_eq!(quarter_summary(&store).unwrap().revenue, 60_000.0);
}

/// With no valid target months there is no "now" to anchor on; the
/// summary reports a typed error instead of fabricating a quarter.
#[test]
fn missing_targets_fail_the_anchor() {
    let data = dataset(vec![], vec![won("d1", 60_000.0, "2025-03-10")]);
    let store = DeskStore::build(&data);

    let err = quarter_summary(&store).unwrap_err();
    assert!(
        matches!(err, DeskError::NoTargetMonths),
        "expected NoTargetMonths, got {err}"
    );
}
