//! desk-runner: headless analytics runner for SalesDesk.
//!
//! Usage:
//!   desk-runner --data-dir ./data
//!   desk-runner --synth --seed 7 --data-dir ./data
//!   desk-runner --data-dir ./data --op risk-factors --param limit=5

use anyhow::Result;
use salesdesk_core::api::{self, Endpoint};
use salesdesk_core::config::DeskConfig;
use salesdesk_core::query::QueryMap;
use salesdesk_core::raw::RawDataset;
use salesdesk_core::store::DeskStore;
use salesdesk_core::synth::{self, SynthOptions};
use salesdesk_core::types::MonthKey;
use salesdesk_core::{drivers, recommend, risk, summary};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let synth_mode = args.iter().any(|a| a == "--synth");
    let data_dir = string_arg(&args, "--data-dir").unwrap_or("./data");
    let op = string_arg(&args, "--op");
    let query = parse_params(&args);

    let dataset = if synth_mode {
        let options = synth_options(&args)?;
        let data = synth::generate(&options);
        data.write(data_dir)?;
        log::info!("wrote synthetic dataset seed={} to {data_dir}", options.seed);
        data
    } else {
        RawDataset::load(data_dir)?
    };

    let store = DeskStore::build(&dataset);
    let config = DeskConfig::load(data_dir)?;

    match op {
        Some(op) => run_op(&store, &config, op, &query),
        None => print_dashboard(&store, &config, &query),
    }
}

/// Resolve one operation and print its JSON body. A bare name is
/// shorthand for the /api/ path, so `--op summary` works.
fn run_op(store: &DeskStore, config: &DeskConfig, op: &str, query: &QueryMap) -> Result<()> {
    let path = if op.starts_with('/') {
        op.to_string()
    } else if op.starts_with("charts/") || !is_top_level(op) {
        format!("/api/charts/{}", op.trim_start_matches("charts/"))
    } else {
        format!("/api/{op}")
    };
    let endpoint = Endpoint::from_path(&path)?;
    let body = api::dispatch(store, config, endpoint, query);
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn is_top_level(op: &str) -> bool {
    matches!(
        op,
        "health" | "summary" | "drivers" | "risk-factors" | "recommendations"
    )
}

fn print_dashboard(store: &DeskStore, config: &DeskConfig, query: &QueryMap) -> Result<()> {
    let report = &store.report;
    println!("SalesDesk desk-runner");
    println!(
        "  accounts:   {} kept / {} raw",
        report.accounts.kept, report.accounts.input
    );
    println!(
        "  reps:       {} kept / {} raw",
        report.reps.kept, report.reps.input
    );
    println!(
        "  targets:    {} kept / {} raw",
        report.targets.kept, report.targets.input
    );
    println!(
        "  deals:      {} kept / {} raw",
        report.deals.kept, report.deals.input
    );
    println!(
        "  activities: {} kept / {} raw",
        report.activities.kept, report.activities.input
    );
    println!("  dropped:    {}", report.total_dropped());
    println!();

    let summary = summary::quarter_summary(store)?;
    println!("=== QUARTER SUMMARY ===");
    println!("  quarter:  {}", summary.current_quarter);
    println!("  period:   {} to {}", summary.period.start, summary.period.end);
    println!("  revenue:  ${:.2}", summary.revenue);
    println!("  target:   ${:.2}", summary.target);
    println!("  gap:      ${:.2} ({:+.1}%)", summary.gap, summary.gap_pct);
    println!(
        "  QoQ:      prev ${:.2}, change {:+.1}%",
        summary.change.prev_quarter_revenue, summary.change.change_pct
    );
    println!();

    let drivers = drivers::revenue_drivers(store)?;
    let previous = drivers
        .previous_month
        .map(|m| m.to_string())
        .unwrap_or_else(|| "n/a".to_string());
    println!(
        "=== REVENUE DRIVERS ({} vs {previous}) ===",
        drivers.latest_month
    );
    println!(
        "  pipeline value:   {:>12.2}  [{:?}]",
        drivers.pipeline_value.current, drivers.pipeline_value.trend
    );
    println!(
        "  win rate:         {:>12.4}  [{:?}]",
        drivers.win_rate.current, drivers.win_rate.trend
    );
    println!(
        "  avg deal size:    {:>12.2}  [{:?}]",
        drivers.avg_deal_size.current, drivers.avg_deal_size.trend
    );
    println!(
        "  sales cycle days: {:>12.2}  [{:?}]",
        drivers.sales_cycle_days.current, drivers.sales_cycle_days.trend
    );
    println!();

    let risk = risk::risk_factors(store, config, query)?;
    println!("=== RISK FACTORS ({}) ===", risk.current_quarter);
    println!(
        "  stale deals:           {} matched, showing {}",
        risk.stale_deals.count,
        risk.stale_deals.top.len()
    );
    println!(
        "  underperforming reps:  {} matched, showing {}",
        risk.underperforming_reps.count,
        risk.underperforming_reps.top.len()
    );
    println!(
        "  low-activity accounts: {} matched, showing {}",
        risk.low_activity_accounts.count,
        risk.low_activity_accounts.top.len()
    );
    println!();

    let recs = recommend::recommendations(store, config, query)?;
    println!("=== RECOMMENDATIONS ===");
    for item in &recs.items {
        println!("  [{:?}] {}", item.impact, item.title);
    }
    println!();

    println!("=== ENDPOINTS ===");
    for (_, path) in Endpoint::routes() {
        println!("  {path}");
    }
    Ok(())
}

// ── Argument helpers ─────────────────────────────────────────────────────

fn synth_options(args: &[String]) -> Result<SynthOptions> {
    let defaults = SynthOptions::default();
    let end_month = match string_arg(args, "--end-month") {
        Some(raw) => MonthKey::parse(raw)
            .ok_or_else(|| anyhow::anyhow!("--end-month must be YYYY-MM, got {raw:?}"))?,
        None => defaults.end_month,
    };
    Ok(SynthOptions {
        seed: parse_arg(args, "--seed", defaults.seed),
        accounts: parse_arg(args, "--accounts", defaults.accounts),
        reps: parse_arg(args, "--reps", defaults.reps),
        deals: parse_arg(args, "--deals", defaults.deals),
        months: parse_arg(args, "--months", defaults.months),
        end_month,
    })
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

/// Every `--param key=value` pair, collected in order.
fn parse_params(args: &[String]) -> QueryMap {
    let mut query = QueryMap::new();
    for w in args.windows(2) {
        if w[0] == "--param" {
            if let Some((key, value)) = w[1].split_once('=') {
                query.set(key, value);
            }
        }
    }
    query
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
