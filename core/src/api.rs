//! Query surface: endpoint addressing plus the response envelope.
//!
//! Every operation answers `{"status": "ok", <domainKey>: payload}`.
//! A computation fault answers an opaque
//! `{"status": "error", "error": "internal error"}`; the real cause
//! goes to the log, never over the wire. Parameter junk is not a
//! fault, it clamps (see `query`).

use serde::Serialize;
use serde_json::{json, Value};

use crate::config::DeskConfig;
use crate::error::{DeskError, DeskResult};
use crate::query::QueryMap;
use crate::store::DeskStore;
use crate::{drivers, recommend, reps, risk, segments, series, stages, summary};

/// Addressable read operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Health,
    Summary,
    Drivers,
    RiskFactors,
    Recommendations,
    PipelineByMonth,
    WinRateByMonth,
    SalesCycleByMonth,
    AvgDealSizeByMonth,
    RevenueByMonth,
    DealsByStage,
    ClosedWonByRep,
    ClosedLostByRep,
    StageByRepHeatmap,
    SalesCycleByRep,
    SegmentStageIndustry,
    StaleOpenDeals,
    OpenDealsLatestActivity,
    ClosedWonRevenueByRep,
}

const ROUTES: [(Endpoint, &str); 19] = [
    (Endpoint::Health, "/api/health"),
    (Endpoint::Summary, "/api/summary"),
    (Endpoint::Drivers, "/api/drivers"),
    (Endpoint::RiskFactors, "/api/risk-factors"),
    (Endpoint::Recommendations, "/api/recommendations"),
    (Endpoint::PipelineByMonth, "/api/charts/pipeline-by-month"),
    (Endpoint::WinRateByMonth, "/api/charts/winrate-by-month"),
    (Endpoint::SalesCycleByMonth, "/api/charts/salescycle-by-month"),
    (Endpoint::AvgDealSizeByMonth, "/api/charts/avgdealsize-by-month"),
    (Endpoint::RevenueByMonth, "/api/charts/revenue-by-month"),
    (Endpoint::DealsByStage, "/api/charts/deals-by-stage"),
    (Endpoint::ClosedWonByRep, "/api/charts/closed-won-by-rep"),
    (Endpoint::ClosedLostByRep, "/api/charts/closed-lost-by-rep"),
    (Endpoint::StageByRepHeatmap, "/api/charts/stage-by-rep-heatmap"),
    (Endpoint::SalesCycleByRep, "/api/charts/sales-cycle-by-rep"),
    (
        Endpoint::SegmentStageIndustry,
        "/api/charts/segment-stage-industry",
    ),
    (Endpoint::StaleOpenDeals, "/api/charts/stale-open-deals"),
    (
        Endpoint::OpenDealsLatestActivity,
        "/api/charts/open-deals-latest-activity",
    ),
    (
        Endpoint::ClosedWonRevenueByRep,
        "/api/charts/closed-won-revenue-by-rep",
    ),
];

impl Endpoint {
    /// Every operation with its route path, in registration order.
    pub fn routes() -> &'static [(Endpoint, &'static str)] {
        &ROUTES
    }

    /// Resolves a route path (trailing slash tolerated).
    pub fn from_path(path: &str) -> DeskResult<Endpoint> {
        let trimmed = path.trim_end_matches('/');
        ROUTES
            .iter()
            .find(|&&(_, p)| p == trimmed)
            .map(|&(e, _)| e)
            .ok_or_else(|| DeskError::UnknownEndpoint {
                path: path.to_string(),
            })
    }

    pub fn path(self) -> &'static str {
        ROUTES
            .iter()
            .find(|&&(e, _)| e == self)
            .map(|&(_, p)| p)
            .unwrap_or("/api/unknown")
    }
}

/// Runs one operation and wraps the outcome in the envelope. This is
/// the only place errors cross from typed to opaque.
pub fn dispatch(
    store: &DeskStore,
    config: &DeskConfig,
    endpoint: Endpoint,
    query: &QueryMap,
) -> Value {
    match respond(store, config, endpoint, query) {
        Ok(body) => body,
        Err(err) => {
            log::error!("{} failed: {err}", endpoint.path());
            json!({ "status": "error", "error": "internal error" })
        }
    }
}

fn respond(
    store: &DeskStore,
    config: &DeskConfig,
    endpoint: Endpoint,
    query: &QueryMap,
) -> DeskResult<Value> {
    match endpoint {
        Endpoint::Health => Ok(json!({ "status": "ok" })),
        Endpoint::Summary => envelope("summary", &summary::quarter_summary(store)?),
        Endpoint::Drivers => envelope("drivers", &drivers::revenue_drivers(store)?),
        Endpoint::RiskFactors => {
            envelope("riskFactors", &risk::risk_factors(store, config, query)?)
        }
        Endpoint::Recommendations => envelope(
            "recommendations",
            &recommend::recommendations(store, config, query)?,
        ),
        Endpoint::PipelineByMonth => envelope("series", &series::pipeline_by_month(store, query)?),
        Endpoint::WinRateByMonth => envelope("series", &series::winrate_by_month(store, query)?),
        Endpoint::SalesCycleByMonth => {
            envelope("series", &series::salescycle_by_month(store, query)?)
        }
        Endpoint::AvgDealSizeByMonth => {
            envelope("series", &series::avgdealsize_by_month(store, query)?)
        }
        Endpoint::RevenueByMonth => envelope("series", &series::revenue_by_month(store, query)?),
        Endpoint::DealsByStage => envelope("stageCounts", &stages::deals_by_stage(store)),
        Endpoint::ClosedWonByRep => envelope("pie", &reps::closed_won_by_rep(store, query)),
        Endpoint::ClosedLostByRep => envelope("pie", &reps::closed_lost_by_rep(store, query)),
        Endpoint::StageByRepHeatmap => envelope("heatmap", &reps::stage_by_rep_heatmap(store)),
        Endpoint::SalesCycleByRep => {
            envelope("salesCycleByRep", &reps::sales_cycle_by_rep(store, query))
        }
        Endpoint::SegmentStageIndustry => envelope(
            "segmentStageIndustry",
            &segments::segment_stage_industry(store, query),
        ),
        Endpoint::StaleOpenDeals => {
            envelope("staleOpenDeals", &stages::stale_open_deals(store, query)?)
        }
        Endpoint::OpenDealsLatestActivity => {
            envelope("latestActivity", &stages::open_deals_latest_activity(store))
        }
        Endpoint::ClosedWonRevenueByRep => {
            envelope("repRevenue", &reps::closed_won_revenue_by_rep(store, query))
        }
    }
}

fn envelope<T: Serialize>(key: &'static str, payload: &T) -> DeskResult<Value> {
    let mut body = serde_json::Map::new();
    body.insert("status".to_string(), json!("ok"));
    body.insert(key.to_string(), serde_json::to_value(payload)?);
    Ok(Value::Object(body))
}
