//! Daily composite history from quarterly holdings.

use super::schedule::{HoldingsSchedule, WeightedConstituent};
use super::{Composite, CompositeInput, CompositePoint, CompositeStrategy, WeightedSum};
use crate::error::AggregationError;
use chrono::NaiveDate;
use pbval_data::{PbRecord, Quarter};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Composite history where each calendar quarter is valued with the holdings
/// disclosed for it.
///
/// Quarters without a disclosure reuse the previous one, through the quarter
/// of the latest constituent PB. A trading day on which no constituent of its
/// quarter has a PB repeats the quarter's previous value.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeSeriesStrategy;

impl CompositeStrategy for TimeSeriesStrategy {
    fn name(&self) -> &'static str {
        "time-series"
    }

    fn aggregate(&self, input: &CompositeInput<'_>) -> Result<Composite, AggregationError> {
        let schedule = HoldingsSchedule::from_entries(input.holdings);
        if schedule.is_empty() {
            return Err(AggregationError::NoHoldings(input.etf_code.to_string()));
        }

        let latest_pb = input
            .series
            .values()
            .flatten()
            .filter(|r| r.pb.is_some())
            .map(|r| r.date)
            .max();
        let schedule = schedule.fill_gaps(latest_pb.map(Quarter::containing));

        let per_quarter: BTreeMap<Quarter, Vec<CompositePoint>> = schedule
            .iter()
            .map(|(q, members)| (q, quarter_series(q, members, input.series)))
            .collect();

        let calendar = trading_calendar(&schedule, input.series);
        let points = align_to_calendar(&per_quarter, &calendar);
        if points.is_empty() {
            return Err(AggregationError::NoCoverage(input.etf_code.to_string()));
        }

        debug!(
            etf = input.etf_code,
            quarters = per_quarter.len(),
            points = points.len(),
            "Built composite history"
        );
        Ok(Composite::Series { points })
    }
}

/// Composite points for the days of `quarter`, using its composition.
fn quarter_series(
    quarter: Quarter,
    members: &[WeightedConstituent],
    series: &HashMap<String, Vec<PbRecord>>,
) -> Vec<CompositePoint> {
    let mut by_day: BTreeMap<NaiveDate, WeightedSum> = BTreeMap::new();
    for member in members {
        let Some(records) = series.get(&member.code) else {
            continue;
        };
        for record in records.iter().filter(|r| quarter.contains(r.date)) {
            if let Some(pb) = record.pb.filter(|v| v.is_finite()) {
                by_day.entry(record.date).or_default().add(member.weight, pb);
            }
        }
    }

    by_day
        .into_iter()
        .filter_map(|(date, sum)| {
            sum.average().map(|pb| CompositePoint {
                date,
                quarter,
                pb,
                contributing: sum.count,
                total_weight: sum.weight,
                carried_forward: false,
            })
        })
        .collect()
}

/// Concatenate per-quarter series, keeping the later quarter's point when two
/// quarters produce the same day.
pub(crate) fn combine_quarters(
    per_quarter: &BTreeMap<Quarter, Vec<CompositePoint>>,
) -> Vec<CompositePoint> {
    let mut by_day: BTreeMap<NaiveDate, CompositePoint> = BTreeMap::new();
    for points in per_quarter.values() {
        for point in points {
            by_day.insert(point.date, point.clone());
        }
    }
    by_day.into_values().collect()
}

/// Every day any constituent of the schedule has a record, within the
/// schedule's quarters.
fn trading_calendar(
    schedule: &HoldingsSchedule,
    series: &HashMap<String, Vec<PbRecord>>,
) -> Vec<NaiveDate> {
    let (Some(first), Some(last)) = (schedule.first_quarter(), schedule.last_quarter()) else {
        return Vec::new();
    };
    let (start, end) = (first.first_day(), last.last_day());

    let days: BTreeSet<NaiveDate> = schedule
        .constituent_codes()
        .iter()
        .filter_map(|code| series.get(code))
        .flatten()
        .map(|r| r.date)
        .filter(|d| (start..=end).contains(d))
        .collect();
    days.into_iter().collect()
}

/// Assign each calendar day to its quarter's series.
///
/// A day takes the latest point of its own quarter dated on or before it. Days
/// before a quarter's first point produce nothing.
pub(crate) fn align_to_calendar(
    per_quarter: &BTreeMap<Quarter, Vec<CompositePoint>>,
    calendar: &[NaiveDate],
) -> Vec<CompositePoint> {
    let combined = combine_quarters(per_quarter);
    let mut aligned: BTreeMap<NaiveDate, CompositePoint> =
        combined.into_iter().map(|p| (p.date, p)).collect();

    for &day in calendar {
        if aligned.contains_key(&day) {
            continue;
        }
        let Some(points) = per_quarter.get(&Quarter::containing(day)) else {
            continue;
        };
        let idx = points.partition_point(|p| p.date <= day);
        if let Some(previous) = idx.checked_sub(1).and_then(|i| points.get(i)) {
            aligned.insert(
                day,
                CompositePoint {
                    date: day,
                    carried_forward: true,
                    ..previous.clone()
                },
            );
        }
    }

    aligned.into_values().collect()
}
