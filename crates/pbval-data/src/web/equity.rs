//! Share capital history from the Eastmoney datacenter equity report.

use crate::error::{DataError, Result};
use crate::model::ShareCountChange;
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct EquityResponse {
    result: Option<EquityResult>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EquityResult {
    #[serde(default)]
    data: Vec<EquityRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct EquityRow {
    end_date: String,
    total_shares: Option<f64>,
    limited_shares: Option<f64>,
    listed_a_shares: Option<f64>,
    change_reason: Option<String>,
}

/// Parse an equity report into share count changes.
///
/// An empty `result` means the instrument has no recorded changes. Rows with
/// no total share count are dropped.
pub fn parse_equity_history(code: &str, body: &str) -> Result<Vec<ShareCountChange>> {
    let response: EquityResponse = serde_json::from_str(body)?;

    let Some(result) = response.result else {
        if response.success == Some(false) {
            let message = response.message.unwrap_or_default();
            // The datacenter reports "no data" as a failed query.
            if !message.contains("数据") {
                return Err(DataError::Provider(format!(
                    "equity report for {}: {}",
                    code, message
                )));
            }
        }
        return Ok(Vec::new());
    };

    let mut changes = Vec::with_capacity(result.data.len());
    for row in result.data {
        let Some(total_shares) = row.total_shares else {
            continue;
        };
        let day = row.end_date.get(..10).unwrap_or(row.end_date.as_str());
        let effective_date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .map_err(|e| DataError::Parse(format!("equity date {:?}: {}", row.end_date, e)))?;

        changes.push(ShareCountChange {
            code: code.to_string(),
            effective_date,
            total_shares,
            restricted_shares: row.limited_shares,
            circulating_shares: row.listed_a_shares,
            reason: row.change_reason.filter(|r| !r.trim().is_empty()),
        });
    }

    Ok(changes)
}
