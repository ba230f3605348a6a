//! Product heuristics that tune risk detection and recommendations.
//!
//! Every value here has a sensible default; a dataset directory may
//! override any subset of them via `analytics_config.json`. The query
//! surface uses these as the defaults that caller-supplied parameters
//! are clamped around.

use std::path::Path;

use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "analytics_config.json";

/// Staleness and rep-performance thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Days without any activity before an open deal counts as stale.
    pub stale_no_activity_days: i64,
    /// Minimum age in days before an open deal can count as stale.
    pub stale_min_age_days: i64,
    /// Lookback window for per-account activity counts.
    pub low_activity_window_days: i64,
    /// Activity count at or below which an account is low-activity.
    pub low_activity_max_count: u32,
    /// Closed deals required before a rep's win rate is judged.
    pub min_closed_for_win_rate: u32,
    /// Win rate (percent) below which a rep is flagged.
    pub underperformer_win_rate_pct: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            stale_no_activity_days: 14,
            stale_min_age_days: 30,
            low_activity_window_days: 30,
            low_activity_max_count: 1,
            min_closed_for_win_rate: 3,
            underperformer_win_rate_pct: 30.0,
        }
    }
}

/// Bounds on the recommendation list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Generic fallbacks are appended until this many items exist.
    pub min_items: usize,
    /// Hard cap on returned items.
    pub max_items: usize,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        RecommendationConfig {
            min_items: 3,
            max_items: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    pub risk: RiskConfig,
    pub recommendations: RecommendationConfig,
}

impl DeskConfig {
    /// Load from the dataset directory, falling back to defaults when
    /// no override file exists. In tests, use `DeskConfig::default()`.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/{CONFIG_FILE}");
        if !Path::new(&path).exists() {
            log::debug!("no {CONFIG_FILE} in {data_dir}, using defaults");
            return Ok(DeskConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: DeskConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        log::info!("loaded analytics config overrides from {path}");
        Ok(config)
    }
}
