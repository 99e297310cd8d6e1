#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/pbval/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod batch;
pub mod config;
pub mod error;
pub mod etf;

// Re-export main types from sub-crates
pub use pbval_data as data;
pub use pbval_engine as engine;
pub use pbval_output as output;

pub use batch::{BatchFailure, BatchReport, BatchRunner, InstrumentOutcome};
pub use config::{BatchConfig, PbConfig};
pub use error::{Result, WorkflowError};
pub use etf::{EtfValuation, HoldingsSource, load_holdings, profile_etf, value_etf};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
