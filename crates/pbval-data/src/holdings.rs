//! ETF holdings files.
//!
//! Holdings are kept per fund as `hold_<etf>.csv` with the column layout of
//! the fund disclosure tables: 序号, 股票代码, 股票名称, 占净值比例 (percent),
//! 持股数, 持仓市值, 季度. A plain code list (second column holds the code) is
//! also accepted for batch runs.

use crate::code::clean_holding_code;
use crate::error::{DataError, Result};
use crate::model::{HoldingEntry, Quarter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Serialize, Deserialize)]
struct HoldingRow {
    #[serde(rename = "序号", default)]
    seq: Option<u32>,
    #[serde(rename = "股票代码")]
    code: String,
    #[serde(rename = "股票名称", default)]
    name: String,
    #[serde(rename = "占净值比例")]
    weight_pct: String,
    #[serde(rename = "持股数", default)]
    shares: Option<f64>,
    #[serde(rename = "持仓市值", default)]
    market_value: Option<f64>,
    #[serde(rename = "季度", default)]
    quarter: String,
}

/// Path of the holdings file for `etf_code` inside `dir`.
pub fn holdings_path(dir: &Path, etf_code: &str) -> PathBuf {
    dir.join(format!("hold_{}.csv", etf_code))
}

/// Read a holdings file.
///
/// Rows with a zero or unreadable weight, an unusable code, or no
/// recognisable quarter label are skipped.
pub fn read_holdings(path: &Path, etf_code: &str) -> Result<Vec<HoldingEntry>> {
    let file = File::open(path)?;
    read_holdings_from(file, etf_code)
}

/// Read holdings rows from any reader.
pub fn read_holdings_from<R: Read>(reader: R, etf_code: &str) -> Result<Vec<HoldingEntry>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut entries = Vec::new();

    for (line, row) in rdr.deserialize::<HoldingRow>().enumerate() {
        let row = row?;
        let Some(code) = clean_holding_code(&row.code) else {
            warn!(line, raw = %row.code, "skipping holdings row with unusable code");
            continue;
        };
        let Some(quarter) = Quarter::parse_label(&row.quarter) else {
            warn!(line, label = %row.quarter, "skipping holdings row without quarter");
            continue;
        };
        let weight = parse_percent(&row.weight_pct).map(|pct| pct / 100.0);
        let Some(weight) = weight.filter(|w| *w > 0.0) else {
            continue;
        };

        entries.push(HoldingEntry {
            etf_code: etf_code.to_string(),
            quarter,
            constituent_code: code,
            constituent_name: row.name.trim().to_string(),
            weight,
            shares: row.shares,
            market_value: row.market_value,
        });
    }

    Ok(entries)
}

/// Write holdings in the disclosure table layout, creating parent directories.
pub fn write_holdings(path: &Path, entries: &[HoldingEntry]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    write_holdings_to(&mut file, entries)?;
    file.flush()?;
    Ok(())
}

/// Write holdings rows to any writer. Row numbers restart at 1 for each quarter.
pub fn write_holdings_to<W: Write>(writer: W, entries: &[HoldingEntry]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut current: Option<Quarter> = None;
    let mut seq = 0;

    for entry in entries {
        if current != Some(entry.quarter) {
            current = Some(entry.quarter);
            seq = 0;
        }
        seq += 1;
        wtr.serialize(HoldingRow {
            seq: Some(seq),
            code: entry.constituent_code.clone(),
            name: entry.constituent_name.clone(),
            weight_pct: format!("{}", round_pct(entry.weight * 100.0)),
            shares: entry.shares,
            market_value: entry.market_value,
            quarter: entry.quarter.disclosure_label(),
        })?;
    }

    wtr.flush()?;
    Ok(())
}

/// Read a code list where the second column holds instrument codes.
///
/// Blank or unusable codes are skipped; duplicates are kept once, in file order.
pub fn read_code_list(path: &Path) -> Result<Vec<String>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut seen = BTreeSet::new();
    let mut codes = Vec::new();

    for record in rdr.records() {
        let record = record?;
        let raw = record.get(1).ok_or_else(|| {
            DataError::Parse(format!("{}: row without a code column", path.display()))
        })?;
        if let Some(code) = clean_holding_code(raw) {
            if seen.insert(code.clone()) {
                codes.push(code);
            }
        }
    }

    Ok(codes)
}

/// Distinct constituent codes across all entries, sorted.
pub fn constituent_codes(entries: &[HoldingEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| e.constituent_code.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn parse_percent(text: &str) -> Option<f64> {
    text.trim()
        .trim_end_matches('%')
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn round_pct(pct: f64) -> f64 {
    (pct * 10_000.0).round() / 10_000.0
}
