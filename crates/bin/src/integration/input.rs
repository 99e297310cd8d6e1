//! Instrument list resolution for batch runs.

use pbval_data::{DataError, holdings};
use std::path::Path;
use thiserror::Error;

/// Errors resolving which instruments to run.
#[derive(Debug, Error)]
pub(crate) enum InputError {
    /// Neither `--codes` nor `--holdings-file` was given
    #[error("No instruments given; pass --codes or --holdings-file")]
    NoInstruments,

    /// The holdings file could not be read
    #[error("Failed to read {path}: {source}")]
    HoldingsFile {
        path: String,
        #[source]
        source: DataError,
    },
}

/// Codes from `--codes`, else from the second column of a holdings file.
pub(crate) fn resolve_codes(
    codes: Vec<String>,
    holdings_file: Option<&Path>,
) -> Result<Vec<String>, InputError> {
    let codes: Vec<String> = codes
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if !codes.is_empty() {
        return Ok(codes);
    }

    let path = holdings_file.ok_or(InputError::NoInstruments)?;
    let listed = holdings::read_code_list(path).map_err(|source| InputError::HoldingsFile {
        path: path.display().to_string(),
        source,
    })?;
    if listed.is_empty() {
        return Err(InputError::NoInstruments);
    }
    Ok(listed)
}
