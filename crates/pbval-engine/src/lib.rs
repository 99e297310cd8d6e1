#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/pbval/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod composite;
pub mod error;
pub mod join;
pub mod service;
pub mod shares;

pub use composite::{
    Aggregation, Composite, CompositeInput, CompositePoint, CompositeSnapshot, CompositeStrategy,
    FallbackPolicy, HoldingsSchedule, LatestSnapshotStrategy, TimeSeriesStrategy,
};
pub use error::{AggregationError, DataKind, PbError, Result};
pub use join::{join_pb_series, price_to_book};
pub use service::{DataSource, PbSeries, PbService};
pub use shares::ShareCountResolver;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
