//! Calendar and domain primitives shared across the engine.
//!
//! Everything here is value-like: small Copy/Clone types with no
//! behavior beyond parsing, formatting and arithmetic. Dates are
//! date-granular (`NaiveDate`); range checks are inclusive of the end
//! date throughout the crate.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Serialize, Serializer};

// ── Month keys ───────────────────────────────────────────────────────────

/// A calendar month, ordered chronologically and rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    /// Builds a key, rejecting out-of-range month numbers.
    pub fn new(year: i32, month: u32) -> Option<MonthKey> {
        if (1..=12).contains(&month) {
            Some(MonthKey { year, month })
        } else {
            None
        }
    }

    /// Parses a strict `YYYY-MM` string. Anything else is `None`.
    pub fn parse(s: &str) -> Option<MonthKey> {
        let s = s.trim();
        let (y, m) = s.split_once('-')?;
        if y.len() != 4 || m.len() != 2 {
            return None;
        }
        let year: i32 = y.parse().ok()?;
        let month: u32 = m.parse().ok()?;
        MonthKey::new(year, month)
    }

    /// The month a date falls in.
    pub fn from_date(d: NaiveDate) -> MonthKey {
        MonthKey {
            year: d.year(),
            month: d.month(),
        }
    }

    /// First day of the month.
    pub fn start_date(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last day of the month, inclusive.
    pub fn end_date(self) -> NaiveDate {
        self.next().start_date() - Duration::days(1)
    }

    pub fn next(self) -> MonthKey {
        if self.month == 12 {
            MonthKey {
                year: self.year + 1,
                month: 1,
            }
        } else {
            MonthKey {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn prev(self) -> MonthKey {
        if self.month == 1 {
            MonthKey {
                year: self.year - 1,
                month: 12,
            }
        } else {
            MonthKey {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// True when `d` falls inside this month.
    pub fn contains(self, d: NaiveDate) -> bool {
        d.year() == self.year && d.month() == self.month
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ── Quarter windows ──────────────────────────────────────────────────────

/// A calendar quarter. `end_date` doubles as the analysis anchor
/// ("now") for staleness and lookback windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuarterWindow {
    pub year: i32,
    pub quarter: u32,
}

impl QuarterWindow {
    /// The quarter a month falls in.
    pub fn containing(month: MonthKey) -> QuarterWindow {
        QuarterWindow {
            year: month.year,
            quarter: (month.month - 1) / 3 + 1,
        }
    }

    /// First month of the quarter.
    pub fn start_month(self) -> MonthKey {
        MonthKey {
            year: self.year,
            month: (self.quarter - 1) * 3 + 1,
        }
    }

    /// The quarter's three months in order.
    pub fn months(self) -> [MonthKey; 3] {
        let first = self.start_month();
        [first, first.next(), first.next().next()]
    }

    pub fn start_date(self) -> NaiveDate {
        self.start_month().start_date()
    }

    /// Last day of the quarter, inclusive.
    pub fn end_date(self) -> NaiveDate {
        self.months()[2].end_date()
    }

    pub fn prev(self) -> QuarterWindow {
        if self.quarter == 1 {
            QuarterWindow {
                year: self.year - 1,
                quarter: 4,
            }
        } else {
            QuarterWindow {
                year: self.year,
                quarter: self.quarter - 1,
            }
        }
    }

    /// Inclusive membership test.
    pub fn contains(self, d: NaiveDate) -> bool {
        d >= self.start_date() && d <= self.end_date()
    }

    /// Display label, e.g. `Q1 2025`.
    pub fn label(self) -> String {
        format!("Q{} {}", self.quarter, self.year)
    }
}

// ── Deal stages ──────────────────────────────────────────────────────────

/// Pipeline stage of a deal. Unrecognized labels survive as
/// `Other(label)` so nothing silently disappears from breakdowns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DealStage {
    Prospecting,
    Negotiation,
    ClosedWon,
    ClosedLost,
    Other(String),
}

impl DealStage {
    /// Canonicalizes a raw stage label. Synonyms are matched
    /// case-insensitively; anything unrecognized passes through with
    /// its original spelling, and an empty label becomes `Unknown`.
    pub fn normalize(raw: &str) -> DealStage {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return DealStage::unknown();
        }
        match trimmed.to_lowercase().as_str() {
            "closed won" | "won" | "closed-won" => DealStage::ClosedWon,
            "closed lost" | "lost" | "closed-lost" => DealStage::ClosedLost,
            "prospecting" | "prospect" => DealStage::Prospecting,
            "negotiation" | "negotiating" => DealStage::Negotiation,
            _ => DealStage::Other(trimmed.to_string()),
        }
    }

    /// Stage used when a record carries no usable stage at all.
    pub fn unknown() -> DealStage {
        DealStage::Other("Unknown".to_string())
    }

    /// Ranking used to collapse multi-record deal histories into one
    /// current state. Higher wins.
    pub fn priority(&self) -> u8 {
        match self {
            DealStage::ClosedWon => 4,
            DealStage::ClosedLost => 3,
            DealStage::Negotiation => 2,
            DealStage::Prospecting => 1,
            DealStage::Other(_) => 0,
        }
    }

    /// Open means not closed either way. Unrecognized stages count as
    /// open; only the two terminal stages close a deal.
    pub fn is_open(&self) -> bool {
        !self.is_closed()
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, DealStage::ClosedWon | DealStage::ClosedLost)
    }

    pub fn is_won(&self) -> bool {
        matches!(self, DealStage::ClosedWon)
    }

    pub fn is_lost(&self) -> bool {
        matches!(self, DealStage::ClosedLost)
    }

    /// Display label, canonical spelling for the known stages.
    pub fn label(&self) -> &str {
        match self {
            DealStage::Prospecting => "Prospecting",
            DealStage::Negotiation => "Negotiation",
            DealStage::ClosedWon => "Closed Won",
            DealStage::ClosedLost => "Closed Lost",
            DealStage::Other(s) => s,
        }
    }
}

impl fmt::Display for DealStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for DealStage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}
