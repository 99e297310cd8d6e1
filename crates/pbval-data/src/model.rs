//! Typed market data records.
//!
//! Provider payloads are adapted into these records at the provider boundary so
//! the cache, the join engine and the aggregator never see raw provider rows.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// One daily OHLCV bar for an instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Six-digit instrument code
    pub code: String,
    /// Trading day
    pub date: NaiveDate,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Traded volume in shares
    pub volume: f64,
    /// Traded value
    pub amount: f64,
}

/// Book value (net assets) disclosed for one reporting period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetAssetReport {
    /// Six-digit instrument code
    pub code: String,
    /// Reporting period end date (a quarter end)
    pub period_end: NaiveDate,
    /// Equity figure exactly as disclosed, e.g. `"123.45亿"`
    pub raw_equity_text: String,
    /// Decoded net assets in currency units, `None` when the text is unusable
    pub net_assets: Option<f64>,
}

impl NetAssetReport {
    /// Build a report from disclosed text, decoding the value.
    pub fn from_text(code: impl Into<String>, period_end: NaiveDate, raw: impl Into<String>) -> Self {
        let raw_equity_text = raw.into();
        let net_assets = crate::normalize::normalize(&raw_equity_text);
        Self {
            code: code.into(),
            period_end,
            raw_equity_text,
            net_assets,
        }
    }
}

/// A change in an instrument's share capital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareCountChange {
    /// Six-digit instrument code
    pub code: String,
    /// Date the new share count took effect
    pub effective_date: NaiveDate,
    /// Total shares outstanding after the change
    pub total_shares: f64,
    /// Restricted (non-tradable) shares
    pub restricted_shares: Option<f64>,
    /// Circulating shares
    pub circulating_shares: Option<f64>,
    /// Reason given for the change
    pub reason: Option<String>,
}

/// Daily price-to-book valuation record.
///
/// Valuation fields are `None` when no net-asset report applies to the day, and
/// `pb` is also `None` when the applicable net assets are zero or undecodable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PbRecord {
    /// Six-digit instrument code
    pub code: String,
    /// Trading day
    pub date: NaiveDate,
    /// Closing price on the day
    pub close_price: f64,
    /// Total shares in effect on the day
    pub total_shares: f64,
    /// Close times total shares
    pub market_cap: Option<f64>,
    /// Net assets of the applicable report
    pub net_assets: Option<f64>,
    /// Period end of the applicable report
    pub report_period: Option<NaiveDate>,
    /// Price-to-book ratio
    pub pb: Option<f64>,
}

/// One constituent line of an ETF holdings disclosure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingEntry {
    /// Six-digit ETF code
    pub etf_code: String,
    /// Disclosure quarter
    pub quarter: Quarter,
    /// Six-digit constituent code
    pub constituent_code: String,
    /// Constituent display name
    pub constituent_name: String,
    /// Fraction of fund net value, in `(0, 1]`
    pub weight: f64,
    /// Shares held, in units of ten thousand
    pub shares: Option<f64>,
    /// Market value held, in units of ten thousand
    pub market_value: Option<f64>,
}

/// A calendar quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quarter {
    year: i32,
    quarter: u32,
}

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})\s*(?:年\s*([1-4])\s*季度|[-_ ]?[Qq]([1-4]))")
        .expect("quarter label pattern is valid")
});

impl Quarter {
    /// Create a quarter. Returns `None` for a quarter outside `1..=4` or a
    /// year outside `1..=9999`.
    pub const fn new(year: i32, quarter: u32) -> Option<Self> {
        if quarter >= 1 && quarter <= 4 && year >= 1 && year <= 9999 {
            Some(Self { year, quarter })
        } else {
            None
        }
    }

    /// The quarter containing `date` (months 1-3 are Q1, 10-12 are Q4).
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            quarter: date.month0() / 3 + 1,
        }
    }

    /// Calendar year.
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Quarter number, 1 through 4.
    pub const fn quarter(&self) -> u32 {
        self.quarter
    }

    /// First calendar day of the quarter.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, (self.quarter - 1) * 3 + 1, 1)
            .expect("quarter bounds are validated on construction")
    }

    /// Last calendar day of the quarter.
    pub fn last_day(&self) -> NaiveDate {
        let day = match self.quarter {
            1 | 4 => 31,
            _ => 30,
        };
        NaiveDate::from_ymd_opt(self.year, self.quarter * 3, day)
            .expect("quarter bounds are validated on construction")
    }

    /// Whether `date` falls inside the quarter.
    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::containing(date) == *self
    }

    /// The following quarter.
    pub const fn next(&self) -> Self {
        if self.quarter == 4 {
            Self {
                year: self.year + 1,
                quarter: 1,
            }
        } else {
            Self {
                year: self.year,
                quarter: self.quarter + 1,
            }
        }
    }

    /// Parse a disclosure label such as `2024年1季度股票投资明细`, `2024Q1` or `2024-Q1`.
    pub fn parse_label(label: &str) -> Option<Self> {
        let caps = LABEL_RE.captures(label)?;
        let year = caps.get(1)?.as_str().parse().ok()?;
        let quarter = caps
            .get(2)
            .or_else(|| caps.get(3))?
            .as_str()
            .parse()
            .ok()?;
        Self::new(year, quarter)
    }

    /// Label in the form used by fund holdings disclosures.
    pub fn disclosure_label(&self) -> String {
        format!("{}年{}季度股票投资明细", self.year, self.quarter)
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Q{}", self.year, self.quarter)
    }
}
