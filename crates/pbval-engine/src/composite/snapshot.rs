//! Current composite from the latest holdings.

use super::schedule::HoldingsSchedule;
use super::{Composite, CompositeInput, CompositeSnapshot, CompositeStrategy, WeightedSum};
use crate::error::AggregationError;

/// Single composite value from the most recently disclosed holdings, each
/// constituent valued at its latest defined PB regardless of date.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestSnapshotStrategy;

impl CompositeStrategy for LatestSnapshotStrategy {
    fn name(&self) -> &'static str {
        "latest-snapshot"
    }

    fn aggregate(&self, input: &CompositeInput<'_>) -> Result<Composite, AggregationError> {
        let schedule = HoldingsSchedule::from_entries(input.holdings);
        let Some((quarter, members)) = schedule.iter().last() else {
            return Err(AggregationError::NoHoldings(input.etf_code.to_string()));
        };

        let mut sum = WeightedSum::default();
        let mut as_of = None;
        for member in members {
            let latest = input.series.get(&member.code).and_then(|records| {
                records
                    .iter()
                    .rev()
                    .find_map(|r| r.pb.filter(|v| v.is_finite()).map(|pb| (r.date, pb)))
            });
            if let Some((date, pb)) = latest {
                sum.add(member.weight, pb);
                as_of = as_of.max(Some(date));
            }
        }

        match (sum.average(), as_of) {
            (Some(pb), Some(as_of)) => Ok(Composite::Snapshot(CompositeSnapshot {
                as_of,
                quarter,
                pb,
                contributing: sum.count,
                total_weight: sum.weight,
            })),
            _ => Err(AggregationError::NoCoverage(input.etf_code.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::fixtures::{date, holding, pb, quarter, series};
    use approx::assert_relative_eq;

    #[test]
    fn test_uses_latest_quarter_and_latest_pb() {
        let holdings = vec![
            holding(quarter(2024, 1), "A", 1.0),
            holding(quarter(2024, 2), "A", 0.5),
            holding(quarter(2024, 2), "B", 0.5),
        ];
        let series = series(vec![
            pb("A", date(2020, 1, 2), Some(1.0)),
            pb("A", date(2020, 1, 3), Some(2.0)),
            pb("B", date(2020, 1, 2), Some(4.0)),
            pb("B", date(2020, 1, 3), None),
        ]);

        let input = CompositeInput {
            etf_code: "510300",
            holdings: &holdings,
            series: &series,
        };
        let Composite::Snapshot(snapshot) = LatestSnapshotStrategy.aggregate(&input).unwrap() else {
            panic!("expected a snapshot");
        };

        assert_eq!(snapshot.quarter, quarter(2024, 2));
        assert_eq!(snapshot.as_of, date(2020, 1, 3));
        assert_relative_eq!(snapshot.pb, 3.0);
        assert_eq!(snapshot.contributing, 2);
    }

    #[test]
    fn test_no_pb_at_all() {
        let holdings = vec![holding(quarter(2024, 1), "A", 1.0)];
        let series = series(vec![pb("A", date(2024, 1, 2), None)]);
        let input = CompositeInput {
            etf_code: "510300",
            holdings: &holdings,
            series: &series,
        };
        assert_eq!(
            LatestSnapshotStrategy.aggregate(&input),
            Err(AggregationError::NoCoverage("510300".to_string()))
        );
    }
}
