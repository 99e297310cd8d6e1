//! Errors of the batch and ETF workflows.

use pbval_data::DataError;
use pbval_engine::{AggregationError, PbError};
use thiserror::Error;

/// Result type for workflow operations.
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Errors that abort a whole workflow run.
///
/// Per-instrument failures inside a batch are counted in the report instead.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Cache, file or provider failure outside any single instrument
    #[error(transparent)]
    Data(#[from] DataError),

    /// PB computation failure
    #[error(transparent)]
    Pb(#[from] PbError),

    /// The ETF composite could not be built
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}
