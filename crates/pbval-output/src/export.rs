//! CSV and JSON export of valuation results.

use crate::profile::EtfPriceProfile;
use crate::stats::ValuationSummary;
use chrono::NaiveDate;
use pbval_data::PbRecord;
use pbval_engine::{Aggregation, Composite, CompositePoint};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty_json" | "prettyjson" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

fn csv_rows<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in rows {
        wtr.serialize(row)?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
}

fn json<T: Serialize + ?Sized>(value: &T, format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(value)?),
        _ => Ok(serde_json::to_string(value)?),
    }
}

impl Exporter for Vec<PbRecord> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => csv_rows(self),
            ExportFormat::Json | ExportFormat::PrettyJson => json(self, format),
        }
    }
}

/// Flat composite row, with the quarter rendered as a label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompositeRow {
    /// ETF code
    pub etf_code: String,
    /// Trading day
    pub date: NaiveDate,
    /// Holdings quarter, e.g. `2024Q1`
    pub quarter: String,
    /// Weighted average PB
    pub pb: f64,
    /// Constituents with a defined PB
    pub contributing: usize,
    /// Combined weight of the contributing constituents
    pub total_weight: f64,
    /// Whether the value was carried forward
    pub carried_forward: bool,
}

impl CompositeRow {
    /// Row for one point of `etf_code`'s composite history.
    pub fn from_point(etf_code: &str, point: &CompositePoint) -> Self {
        Self {
            etf_code: etf_code.to_string(),
            date: point.date,
            quarter: point.quarter.to_string(),
            pb: point.pb,
            contributing: point.contributing,
            total_weight: point.total_weight,
            carried_forward: point.carried_forward,
        }
    }
}

impl Exporter for Aggregation {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match (format, &self.composite) {
            (ExportFormat::Csv, Composite::Series { points }) => {
                csv_rows(points.iter().map(|p| CompositeRow::from_point(&self.etf_code, p)))
            }
            (ExportFormat::Csv, Composite::Snapshot(s)) => csv_rows([CompositeRow {
                etf_code: self.etf_code.clone(),
                date: s.as_of,
                quarter: s.quarter.to_string(),
                pb: s.pb,
                contributing: s.contributing,
                total_weight: s.total_weight,
                carried_forward: false,
            }]),
            (_, _) => json(self, format),
        }
    }
}

/// Flat valuation summary row.
#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    name: &'a str,
    period_start: NaiveDate,
    period_end: NaiveDate,
    current: f64,
    percentile: f64,
    count: usize,
    mean: f64,
    median: f64,
    min: f64,
    max: f64,
    std_dev: f64,
}

impl<'a> From<&'a ValuationSummary> for SummaryRow<'a> {
    fn from(s: &'a ValuationSummary) -> Self {
        Self {
            name: &s.name,
            period_start: s.period_start,
            period_end: s.period_end,
            current: s.current,
            percentile: s.percentile,
            count: s.distribution.count,
            mean: s.distribution.mean,
            median: s.distribution.median,
            min: s.distribution.min,
            max: s.distribution.max,
            std_dev: s.distribution.std_dev,
        }
    }
}

impl Exporter for ValuationSummary {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => csv_rows([SummaryRow::from(self)]),
            ExportFormat::Json | ExportFormat::PrettyJson => json(self, format),
        }
    }
}

impl Exporter for Vec<ValuationSummary> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => csv_rows(self.iter().map(SummaryRow::from)),
            ExportFormat::Json | ExportFormat::PrettyJson => json(self, format),
        }
    }
}

impl Exporter for EtfPriceProfile {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => Err(ExportError::InvalidFormat(
                "price profiles export as JSON only".to_string(),
            )),
            ExportFormat::Json | ExportFormat::PrettyJson => json(self, format),
        }
    }
}
