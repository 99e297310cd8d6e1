//! ETF composite PB aggregation.
//!
//! An ETF's PB is the weight-averaged PB of its disclosed constituents. Only
//! constituents with a defined PB on a given day contribute, and the average
//! is normalised by their combined weight rather than by the full holdings
//! weight.
//!
//! Two strategies are provided. [`TimeSeriesStrategy`] builds a daily history
//! using the holdings disclosed for each calendar quarter, and
//! [`LatestSnapshotStrategy`] values the latest disclosed holdings at each
//! constituent's most recent PB. [`FallbackPolicy`] chains them.

mod policy;
mod schedule;
mod snapshot;
mod time_series;

pub use policy::{Aggregation, FallbackPolicy};
pub use schedule::{HoldingsSchedule, WeightedConstituent};
pub use snapshot::LatestSnapshotStrategy;
pub use time_series::TimeSeriesStrategy;

use crate::error::AggregationError;
use chrono::NaiveDate;
use pbval_data::{HoldingEntry, PbRecord, Quarter};
use serde::Serialize;
use std::collections::HashMap;

/// Inputs to a composite computation.
#[derive(Debug, Clone, Copy)]
pub struct CompositeInput<'a> {
    /// Six-digit ETF code
    pub etf_code: &'a str,
    /// Holdings across every disclosed quarter
    pub holdings: &'a [HoldingEntry],
    /// PB series per constituent code, ascending by date
    pub series: &'a HashMap<String, Vec<PbRecord>>,
}

/// One day of a composite PB history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositePoint {
    /// Trading day
    pub date: NaiveDate,
    /// Holdings quarter whose weights produced the value
    pub quarter: Quarter,
    /// Weighted average PB
    pub pb: f64,
    /// Constituents with a defined PB
    pub contributing: usize,
    /// Combined weight of the contributing constituents
    pub total_weight: f64,
    /// Whether the value was carried forward from an earlier day
    pub carried_forward: bool,
}

/// Composite PB at a single point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeSnapshot {
    /// Date of the most recent constituent PB used
    pub as_of: NaiveDate,
    /// Holdings quarter whose weights were used
    pub quarter: Quarter,
    /// Weighted average PB
    pub pb: f64,
    /// Constituents with a defined PB
    pub contributing: usize,
    /// Combined weight of the contributing constituents
    pub total_weight: f64,
}

/// Result of a composite strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Composite {
    /// Daily history
    Series {
        /// Points in ascending date order
        points: Vec<CompositePoint>,
    },
    /// Single current value
    Snapshot(CompositeSnapshot),
}

impl Composite {
    /// Most recent composite PB.
    pub fn latest_pb(&self) -> Option<f64> {
        match self {
            Self::Series { points } => points.last().map(|p| p.pb),
            Self::Snapshot(snapshot) => Some(snapshot.pb),
        }
    }

    /// Every composite PB value, oldest first.
    pub fn pb_values(&self) -> Vec<f64> {
        match self {
            Self::Series { points } => points.iter().map(|p| p.pb).collect(),
            Self::Snapshot(snapshot) => vec![snapshot.pb],
        }
    }
}

/// A way of turning holdings and constituent PB series into a composite.
pub trait CompositeStrategy {
    /// Short name for logs and reports.
    fn name(&self) -> &'static str;

    /// Compute the composite.
    fn aggregate(&self, input: &CompositeInput<'_>) -> Result<Composite, AggregationError>;
}

/// Running weighted sum over constituents.
#[derive(Debug, Clone, Copy, Default)]
struct WeightedSum {
    weighted_pb: f64,
    weight: f64,
    count: usize,
}

impl WeightedSum {
    fn add(&mut self, weight: f64, pb: f64) {
        self.weighted_pb += weight * pb;
        self.weight += weight;
        self.count += 1;
    }

    fn average(&self) -> Option<f64> {
        (self.count > 0 && self.weight > 0.0).then(|| self.weighted_pb / self.weight)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub(crate) fn quarter(y: i32, q: u32) -> Quarter {
        Quarter::new(y, q).unwrap()
    }

    pub(crate) fn holding(q: Quarter, code: &str, weight: f64) -> HoldingEntry {
        HoldingEntry {
            etf_code: "510300".to_string(),
            quarter: q,
            constituent_code: code.to_string(),
            constituent_name: code.to_string(),
            weight,
            shares: None,
            market_value: None,
        }
    }

    pub(crate) fn pb(code: &str, d: NaiveDate, value: Option<f64>) -> PbRecord {
        PbRecord {
            code: code.to_string(),
            date: d,
            close_price: 10.0,
            total_shares: 1000.0,
            market_cap: Some(10_000.0),
            net_assets: value.map(|v| 10_000.0 / v),
            report_period: Some(date(2023, 12, 31)),
            pb: value,
        }
    }

    pub(crate) fn series(records: Vec<PbRecord>) -> HashMap<String, Vec<PbRecord>> {
        let mut map: HashMap<String, Vec<PbRecord>> = HashMap::new();
        for record in records {
            map.entry(record.code.clone()).or_default().push(record);
        }
        for list in map.values_mut() {
            list.sort_by_key(|r| r.date);
        }
        map
    }
}
