use salesdesk_core::drivers::{revenue_drivers, Trend};
use salesdesk_core::error::DeskError;
use salesdesk_core::raw::{RawAccount, RawDataset, RawDeal, RawRep, RawTarget};
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

fn dataset(deals: Vec<RawDeal>) -> RawDataset {
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
        targets: vec![RawTarget {
            month: json!("2025-06"),
            target: json!(100_000.0),
        }],
        deals,
        activities: vec![],
    }
}

/// Two active months: May (1 won / 1 lost, short cycles, 10k open
/// pipeline) and June (2 won, long cycles, 15k open pipeline).
fn two_month_dataset() -> RawDataset {
    dataset(vec![
        deal("d_open_may", "Prospecting", 10_000.0, "2025-05-05", None),
        deal("d_open_jun", "Negotiation", 15_000.0, "2025-06-05", None),
        deal("d_won_may", "Closed Won", 5_000.0, "2025-04-01", Some("2025-05-01")),
        deal("d_lost_may", "Closed Lost", 5_000.0, "2025-04-11", Some("2025-05-01")),
        deal("d_won_jun1", "Closed Won", 5_000.0, "2025-04-01", Some("2025-06-11")),
        deal("d_won_jun2", "Closed Won", 5_000.0, "2025-04-02", Some("2025-06-11")),
    ])
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// The comparison months are the latest two calendar months that
/// appear in deal dates, not wall-clock months.
#[test]
fn months_come_from_the_deal_dates() {
    let store = DeskStore::build(&two_month_dataset());
    let drivers = revenue_drivers(&store).unwrap();

    assert_eq!(drivers.latest_month.to_string(), "2025-06");
    assert_eq!(
        drivers.previous_month.map(|m| m.to_string()),
        Some("2025-05".to_string())
    );
}

/// Pipeline value covers open deals by creation month; the delta is a
/// relative percentage change.
#[test]
fn pipeline_value_delta_is_relative() {
    let store = DeskStore::build(&two_month_dataset());
    let drivers = revenue_drivers(&store).unwrap();

    assert_eq!(drivers.pipeline_value.current, 15_000.0);
    assert_eq!(drivers.pipeline_value.previous, Some(10_000.0));
    assert_eq!(drivers.pipeline_value.delta, Some(50.0));
    assert_eq!(drivers.pipeline_value.trend, Trend::Improving);
}

/// The win-rate delta is an absolute percentage-point difference, not
/// a relative change: 0.5 → 1.0 reads as +50 points.
#[test]
fn win_rate_delta_is_percentage_points() {
    let store = DeskStore::build(&two_month_dataset());
    let drivers = revenue_drivers(&store).unwrap();

    assert_eq!(drivers.win_rate.current, 1.0);
    assert_eq!(drivers.win_rate.previous, Some(0.5));
    assert_eq!(drivers.win_rate.delta, Some(50.0));
    assert_eq!(drivers.win_rate.trend, Trend::Improving);
}

/// The sales-cycle delta is an absolute day difference, and a longer
/// cycle is the bad direction.
#[test]
fn longer_sales_cycle_reads_as_worsening() {
    let store = DeskStore::build(&two_month_dataset());
    let drivers = revenue_drivers(&store).unwrap();

    assert_eq!(drivers.sales_cycle_days.previous, Some(25.0));
    assert_eq!(drivers.sales_cycle_days.current, 70.5);
    assert_eq!(drivers.sales_cycle_days.delta, Some(45.5));
    assert_eq!(drivers.sales_cycle_days.trend, Trend::Worsening);
}

/// Average deal size means only the positive-amount deals created in
/// the month.
#[test]
fn avg_deal_size_ignores_missing_amounts() {
    let mut data = two_month_dataset();
    // A deal created in June with no usable amount must not drag the mean.
    data.deals.push(RawDeal {
        amount: Value::Null,
        ..deal("d_no_amount", "Prospecting", 0.0, "2025-06-20", None)
    });
    let store = DeskStore::build(&data);
    let drivers = revenue_drivers(&store).unwrap();

    assert_eq!(drivers.avg_deal_size.current, 15_000.0);
    assert_eq!(drivers.avg_deal_size.previous, Some(10_000.0));
}

/// A dataset with a single active month has no previous value: deltas
/// are absent and every trend reads flat.
#[test]
fn single_month_reports_flat_trends() {
    let store = DeskStore::build(&dataset(vec![deal(
        "d1",
        "Prospecting",
        10_000.0,
        "2025-06-05",
        None,
    )]));
    let drivers = revenue_drivers(&store).unwrap();

    assert_eq!(drivers.previous_month, None);
    assert_eq!(drivers.pipeline_value.previous, None);
    assert_eq!(drivers.pipeline_value.delta, None);
    assert_eq!(drivers.pipeline_value.trend, Trend::Flat);
    assert_eq!(drivers.win_rate.trend, Trend::Flat);
}

/// With no dated deals at all there is nothing to compare; the
/// operation reports a typed error.
#[test]
fn no_dated_deals_is_a_typed_error() {
    let mut data = dataset(vec![deal("d1", "Prospecting", 10_000.0, "junk", None)]);
    data.deals[0].created_at = Value::Null;
    let store = DeskStore::build(&data);

    let err = revenue_drivers(&store).unwrap_err();
    assert!(
        matches!(err, DeskError::NoDealMonths),
        "expected NoDealMonths, got {err}"
    );
}
