use salesdesk_core::query::QueryMap;
use salesdesk_core::raw::{RawAccount, RawDataset, RawDeal, RawRep, RawTarget};
use salesdesk_core::series::{
    avgdealsize_by_month, pipeline_by_month, revenue_by_month, salescycle_by_month,
    winrate_by_month,
};
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

/// Store with targets through 2025-06 and a sparse spread of deals.
fn store() -> DeskStore {
    let data = RawDataset {
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
        targets: vec![
            RawTarget {
                month: json!("2025-05"),
                target: json!(90_000.0),
            },
            RawTarget {
                month: json!("2025-06"),
                target: json!(100_000.0),
            },
        ],
        deals: vec![
            deal("d_open_feb", "Prospecting", 8_000.0, "2025-02-10", None),
            deal("d_open_jun", "Negotiation", 12_000.0, "2025-06-10", None),
            deal("d_won_mar", "Closed Won", 30_000.0, "2025-02-01", Some("2025-03-11")),
            deal("d_lost_mar", "Closed Lost", 9_000.0, "2025-02-19", Some("2025-03-01")),
            deal("d_won_jun", "Closed Won", 20_000.0, "2025-05-01", Some("2025-06-15")),
        ],
        activities: vec![],
    };
    DeskStore::build(&data)
}

fn query(pairs: &[(&str, &str)]) -> QueryMap {
    QueryMap::from_pairs(pairs.iter().copied())
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// A requested window of N months always produces exactly N points,
/// strictly ascending, with explicit zeros where nothing happened.
#[test]
fn windows_are_complete_and_zero_filled() {
    let store = store();
    let points = revenue_by_month(&store, &query(&[("months", "6")])).unwrap();

    assert_eq!(points.len(), 6);
    let months: Vec<String> = points.iter().map(|p| p.month.to_string()).collect();
    assert_eq!(
        months,
        vec!["2025-01", "2025-02", "2025-03", "2025-04", "2025-05", "2025-06"]
    );
    for pair in months.windows(2) {
        assert!(pair[0] < pair[1], "months must be strictly increasing");
    }

    let by_month = |m: &str| points.iter().find(|p| p.month.to_string() == m).unwrap().value;
    assert_eq!(by_month("2025-03"), 30_000.0);
    assert_eq!(by_month("2025-06"), 20_000.0);
    assert_eq!(by_month("2025-04"), 0.0, "an empty month is an explicit zero");
}

/// The window ends at the latest target month by default and at the
/// caller's endMonth when one is given.
#[test]
fn end_month_defaults_to_latest_target() {
    let store = store();

    let default_end = revenue_by_month(&store, &query(&[("months", "3")])).unwrap();
    assert_eq!(default_end.last().unwrap().month.to_string(), "2025-06");

    let explicit = revenue_by_month(
        &store,
        &query(&[("months", "3"), ("endMonth", "2025-03")]),
    )
    .unwrap();
    assert_eq!(explicit.last().unwrap().month.to_string(), "2025-03");
    assert_eq!(explicit.last().unwrap().value, 30_000.0);
}

/// Out-of-range or junk month counts clamp and default, never error.
#[test]
fn month_counts_clamp_and_default() {
    let store = store();

    let too_many = pipeline_by_month(&store, &query(&[("months", "999")])).unwrap();
    assert_eq!(too_many.len(), 36, "months clamps to the upper bound");

    let too_few = pipeline_by_month(&store, &query(&[("months", "1")])).unwrap();
    assert_eq!(too_few.len(), 3, "months clamps to the lower bound");

    let junk = pipeline_by_month(&store, &query(&[("months", "plenty")])).unwrap();
    assert_eq!(junk.len(), 12, "junk falls back to the default");
}

/// Pipeline buckets open deals by creation month; closed deals stay
/// out regardless of their creation date.
#[test]
fn pipeline_series_covers_only_open_deals() {
    let store = store();
    let points = pipeline_by_month(&store, &query(&[("months", "6")])).unwrap();

    let by_month = |m: &str| points.iter().find(|p| p.month.to_string() == m).unwrap().value;
    assert_eq!(by_month("2025-02"), 8_000.0, "won/lost deals created in Feb are excluded");
    assert_eq!(by_month("2025-06"), 12_000.0);
}

/// Win rate stays a 0..1 fraction per close month, 0 where nothing
/// closed.
#[test]
fn winrate_series_is_a_bounded_fraction() {
    let store = store();
    let points = winrate_by_month(&store, &query(&[("months", "6")])).unwrap();

    let by_month = |m: &str| points.iter().find(|p| p.month.to_string() == m).unwrap().value;
    assert_eq!(by_month("2025-03"), 0.5, "one won, one lost in March");
    assert_eq!(by_month("2025-06"), 1.0);
    assert_eq!(by_month("2025-01"), 0.0, "no closings, no rate");
    for p in &points {
        assert!(
            (0.0..=1.0).contains(&p.value),
            "win rate out of bounds in {}: {}",
            p.month,
            p.value
        );
    }
}

/// Sales cycle averages the created-to-closed spans of deals closed in
/// the month.
#[test]
fn salescycle_series_averages_by_close_month() {
    let store = store();
    let points = salescycle_by_month(&store, &query(&[("months", "6")])).unwrap();

    let by_month = |m: &str| points.iter().find(|p| p.month.to_string() == m).unwrap().value;
    // d_won_mar: Feb 1 → Mar 11 = 38 days; d_lost_mar: Feb 19 → Mar 1 = 10 days.
    assert_eq!(by_month("2025-03"), 24.0);
    // d_won_jun: May 1 → Jun 15 = 45 days.
    assert_eq!(by_month("2025-06"), 45.0);
}

/// Average deal size means positive-amount deals by creation month.
#[test]
fn avgdealsize_series_buckets_by_creation_month() {
    let store = store();
    let points = avgdealsize_by_month(&store, &query(&[("months", "6")])).unwrap();

    let by_month = |m: &str| points.iter().find(|p| p.month.to_string() == m).unwrap().value;
    // Created in Feb: 8000, 30000, 9000.
    assert_eq!(by_month("2025-02"), 15_666.67);
    assert_eq!(by_month("2025-05"), 20_000.0);
    assert_eq!(by_month("2025-04"), 0.0);
}
