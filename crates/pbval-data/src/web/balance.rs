//! Net assets from the 10jqka balance-sheet feed.
//!
//! The feed wraps a JSON document in a string field, `flashData`. Inside,
//! `title` names each line item (either a bare name or `[name, unit]`) and
//! `report[i]` holds that item's values per period; `report[0]` is the list of
//! period end dates.

use crate::error::{DataError, Result};
use crate::model::NetAssetReport;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Line item holding total shareholders' equity.
pub const TOTAL_EQUITY_ITEM: &str = "所有者权益（或股东权益）合计";

#[derive(Debug, Deserialize)]
struct DebtResponse {
    #[serde(rename = "flashData")]
    flash_data: Value,
}

#[derive(Debug, Deserialize)]
struct FlashData {
    title: Vec<Value>,
    report: Vec<Vec<Value>>,
}

/// Parse a balance-sheet response into net-asset reports, one per period.
pub fn parse_balance_sheet(code: &str, body: &str) -> Result<Vec<NetAssetReport>> {
    let response: DebtResponse = serde_json::from_str(body)?;
    let flash: FlashData = match response.flash_data {
        Value::String(inner) => serde_json::from_str(&inner)?,
        other => serde_json::from_value(other)?,
    };

    let equity_idx = flash
        .title
        .iter()
        .position(|t| item_name(t) == Some(TOTAL_EQUITY_ITEM))
        .ok_or_else(|| {
            DataError::Provider(format!("balance sheet for {} has no total equity line", code))
        })?;

    let (Some(periods), Some(values)) = (flash.report.first(), flash.report.get(equity_idx))
    else {
        return Err(DataError::Provider(format!(
            "balance sheet for {} has no report rows",
            code
        )));
    };

    let mut reports = Vec::with_capacity(periods.len());
    for (period, value) in periods.iter().zip(values) {
        let Some(period_end) = period
            .as_str()
            .and_then(|p| NaiveDate::parse_from_str(p.trim(), "%Y-%m-%d").ok())
        else {
            warn!(code, period = %period, "skipping balance sheet column with bad period");
            continue;
        };
        reports.push(NetAssetReport::from_text(code, period_end, value_text(value)));
    }

    Ok(reports)
}

fn item_name(title: &Value) -> Option<&str> {
    match title {
        Value::String(name) => Some(name.as_str()),
        Value::Array(parts) => parts.first().and_then(Value::as_str),
        _ => None,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}
