//! Primary/fallback strategy chaining.

use super::{
    Composite, CompositeInput, CompositeStrategy, LatestSnapshotStrategy, TimeSeriesStrategy,
};
use crate::error::AggregationError;
use serde::Serialize;
use tracing::warn;

/// A composite together with the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    /// ETF the composite describes
    pub etf_code: String,
    /// The composite value or history
    pub composite: Composite,
    /// Name of the strategy that produced it
    pub strategy: &'static str,
    /// Whether the primary strategy failed and the fallback was used
    pub fell_back: bool,
}

/// Runs a primary strategy and switches to a fallback when the primary finds
/// no constituent coverage.
///
/// A missing holdings disclosure is returned as is, since no strategy can
/// value an ETF without knowing what it holds.
#[derive(Debug, Clone, Copy)]
pub struct FallbackPolicy<P, F> {
    primary: P,
    fallback: F,
}

impl FallbackPolicy<TimeSeriesStrategy, LatestSnapshotStrategy> {
    /// Time-series history, falling back to the latest snapshot.
    pub const fn standard() -> Self {
        Self::new(TimeSeriesStrategy, LatestSnapshotStrategy)
    }
}

impl Default for FallbackPolicy<TimeSeriesStrategy, LatestSnapshotStrategy> {
    fn default() -> Self {
        Self::standard()
    }
}

impl<P: CompositeStrategy, F: CompositeStrategy> FallbackPolicy<P, F> {
    /// Chain `primary` and `fallback`.
    pub const fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }

    /// Aggregate with the primary strategy, falling back on missing coverage.
    pub fn aggregate(&self, input: &CompositeInput<'_>) -> Result<Aggregation, AggregationError> {
        match self.primary.aggregate(input) {
            Ok(composite) => Ok(Aggregation {
                etf_code: input.etf_code.to_string(),
                composite,
                strategy: self.primary.name(),
                fell_back: false,
            }),
            Err(AggregationError::NoCoverage(etf)) => {
                warn!(
                    etf = %etf,
                    primary = self.primary.name(),
                    fallback = self.fallback.name(),
                    "Primary composite strategy found no coverage, falling back"
                );
                self.fallback.aggregate(input).map(|composite| Aggregation {
                    etf_code: input.etf_code.to_string(),
                    composite,
                    strategy: self.fallback.name(),
                    fell_back: true,
                })
            }
            Err(e) => Err(e),
        }
    }
}
