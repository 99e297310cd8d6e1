#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/pbval/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod profile;
pub mod stats;

pub use export::{CompositeRow, ExportError, ExportFormat, Exporter};
pub use profile::{AmplitudeDay, DayDirection, EtfPriceProfile, amplitude};
pub use stats::{DistributionSummary, ValuationSummary, ValuationZone, percentile_rank};
