//! Shared numeric policy and reduction helpers.
//!
//! Every aggregation rounds and compares the same way:
//!   - currency sums and averages round to 2 decimals;
//!   - percentage deltas follow one convention (`pct_ratio`), so a
//!     zero baseline never divides;
//!   - month bucketing goes through `MonthWindow::series`, which
//!     zero-fills gaps and returns strictly ascending months.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::types::MonthKey;

/// Round to 2 decimals, the wire precision for currency and percents.
pub fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

/// Percentage of `numerator` against `denominator` with the shared
/// zero-baseline convention: a zero denominator yields 0 when the
/// numerator is zero too, otherwise +100.
pub fn pct_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        if numerator == 0.0 {
            0.0
        } else {
            100.0
        }
    } else {
        round2(numerator / denominator * 100.0)
    }
}

/// Percentage change from `previous` to `current` under the shared
/// convention.
pub fn pct_change(current: f64, previous: f64) -> f64 {
    pct_ratio(current - previous, previous)
}

/// Arithmetic mean; empty input averages to zero.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// True when `date` lies at least `days` before `now` (inclusive).
pub fn at_least_days_before(date: NaiveDate, now: NaiveDate, days: i64) -> bool {
    date <= now - Duration::days(days)
}

/// Membership in the lookback window ending at `now`:
/// `now - days < ts <= now`.
pub fn within_lookback(ts: NaiveDate, now: NaiveDate, days: i64) -> bool {
    ts <= now && ts > now - Duration::days(days)
}

/// Groups items by a key and folds each group into an accumulator.
/// Items whose key function yields `None` are skipped. `BTreeMap`
/// keeps group order deterministic.
pub fn group_fold<T, K, A>(
    items: impl IntoIterator<Item = T>,
    key_of: impl Fn(&T) -> Option<K>,
    mut fold: impl FnMut(&mut A, &T),
) -> BTreeMap<K, A>
where
    K: Ord,
    A: Default,
{
    let mut groups: BTreeMap<K, A> = BTreeMap::new();
    for item in items {
        if let Some(key) = key_of(&item) {
            fold(groups.entry(key).or_default(), &item);
        }
    }
    groups
}

/// A fixed run of consecutive months, ascending.
#[derive(Debug, Clone)]
pub struct MonthWindow {
    months: Vec<MonthKey>,
}

impl MonthWindow {
    /// The last `len` months ending at `end`, inclusive.
    pub fn ending_at(end: MonthKey, len: usize) -> MonthWindow {
        let mut months = Vec::with_capacity(len);
        let mut m = end;
        for _ in 0..len {
            months.push(m);
            m = m.prev();
        }
        months.reverse();
        MonthWindow { months }
    }

    pub fn months(&self) -> &[MonthKey] {
        &self.months
    }

    pub fn contains(&self, month: MonthKey) -> bool {
        self.months.binary_search(&month).is_ok()
    }

    /// Buckets items into the window's months and finishes each bucket
    /// into a value. Months nothing touched finish their `Default`
    /// accumulator, which every series defines as zero.
    pub fn series<T, A>(
        &self,
        items: impl IntoIterator<Item = T>,
        month_of: impl Fn(&T) -> Option<MonthKey>,
        mut fold: impl FnMut(&mut A, &T),
        finish: impl Fn(&A) -> f64,
    ) -> Vec<(MonthKey, f64)>
    where
        A: Default,
    {
        let mut buckets: BTreeMap<MonthKey, A> =
            self.months.iter().map(|m| (*m, A::default())).collect();
        for item in items {
            if let Some(month) = month_of(&item) {
                if let Some(bucket) = buckets.get_mut(&month) {
                    fold(bucket, &item);
                }
            }
        }
        self.months
            .iter()
            .map(|m| (*m, buckets.get(m).map(|a| finish(a)).unwrap_or(0.0)))
            .collect()
    }
}
