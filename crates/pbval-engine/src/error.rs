//! Error types for valuation and aggregation.

use pbval_data::DataError;
use std::fmt;
use thiserror::Error;

/// Result type for valuation operations.
pub type Result<T> = std::result::Result<T, PbError>;

/// Kind of upstream data an instrument needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    /// Daily price bars
    Prices,
    /// Net-asset reports
    NetAssets,
    /// Share capital history
    ShareHistory,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Prices => "price data",
            Self::NetAssets => "net-asset data",
            Self::ShareHistory => "share count history",
        })
    }
}

/// Errors computing one instrument's PB series.
#[derive(Debug, Error)]
pub enum PbError {
    /// Required data is missing from both the cache and the provider
    #[error("No {what} available for {code}")]
    DataUnavailable {
        /// Instrument code
        code: String,
        /// Which data was missing
        what: DataKind,
    },

    /// The provider call failed
    #[error("Provider failed for {code}: {source}")]
    Provider {
        /// Instrument code
        code: String,
        /// Underlying provider error
        #[source]
        source: DataError,
    },

    /// Cache read or write failed
    #[error("Cache error: {0}")]
    Cache(#[from] DataError),
}

/// Errors building an ETF composite.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    /// The ETF has no usable holdings disclosure
    #[error("No holdings disclosed for {0}")]
    NoHoldings(String),

    /// Holdings exist but no constituent has a defined PB where it is needed
    #[error("No constituent PB data covers the holdings of {0}")]
    NoCoverage(String),
}
