#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/pbval/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod code;
pub mod error;
pub mod holdings;
pub mod model;
pub mod normalize;
pub mod provider;
pub mod retention;
pub mod web;

pub use cache::{CacheStats, SqliteCache};
pub use error::{DataError, Result};
pub use model::{HoldingEntry, NetAssetReport, PbRecord, PriceBar, Quarter, ShareCountChange};
pub use normalize::{normalize, normalize_reports};
pub use provider::{MarketDataProvider, StaticProvider};
pub use retention::RetentionWindow;
pub use web::WebProvider;

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
