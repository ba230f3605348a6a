//! Caller-supplied query parameters.
//!
//! RULE: parameters never produce errors. Junk falls back to the
//! default, out-of-range values clamp to the nearest bound. The
//! defaults for risk thresholds come from `DeskConfig`, so the query
//! surface and the config agree on what "normal" means.

use std::collections::BTreeMap;

use crate::types::MonthKey;

/// String key/value query parameters, as a routing layer or CLI would
/// hand them over.
#[derive(Debug, Clone, Default)]
pub struct QueryMap(BTreeMap<String, String>);

impl QueryMap {
    pub fn new() -> QueryMap {
        QueryMap::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> QueryMap
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        QueryMap(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Integer with a default and inclusive bounds. Accepts anything
    /// that parses as a finite float, truncated toward zero.
    pub fn int_clamped(&self, key: &str, default: i64, min: i64, max: i64) -> i64 {
        let Some(raw) = self.get(key) else {
            return default;
        };
        let Ok(n) = raw.trim().parse::<f64>() else {
            return default;
        };
        if !n.is_finite() {
            return default;
        }
        (n.trunc() as i64).clamp(min, max)
    }

    /// `YYYY-MM` month parameter, or the default when absent or
    /// unparseable.
    pub fn month_or(&self, key: &str, default: MonthKey) -> MonthKey {
        self.get(key).and_then(MonthKey::parse).unwrap_or(default)
    }

    /// Trimmed non-empty text parameter.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|s| !s.is_empty())
    }
}
