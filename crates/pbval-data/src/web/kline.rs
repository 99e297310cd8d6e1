//! Daily bars from the Eastmoney kline API.

use crate::error::{DataError, Result};
use crate::model::PriceBar;
use chrono::NaiveDate;
use serde::Deserialize;

/// Volume is reported in lots of 100 shares.
const SHARES_PER_LOT: f64 = 100.0;

#[derive(Debug, Deserialize)]
struct KlineResponse {
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    #[serde(default)]
    klines: Vec<String>,
}

/// Parse a kline response body into bars ordered by date, one per day.
///
/// Each kline is `date,open,close,high,low,volume,amount`. A response without
/// a `data` object means the instrument is unknown and yields no bars.
pub fn parse_klines(code: &str, body: &str) -> Result<Vec<PriceBar>> {
    let response: KlineResponse = serde_json::from_str(body)?;
    let Some(data) = response.data else {
        return Ok(Vec::new());
    };

    let mut bars = data
        .klines
        .iter()
        .map(|line| parse_line(code, line))
        .collect::<Result<Vec<_>>>()?;

    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);
    Ok(bars)
}

fn parse_line(code: &str, line: &str) -> Result<PriceBar> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 7 {
        return Err(DataError::Parse(format!("short kline for {}: {}", code, line)));
    }

    let date = NaiveDate::parse_from_str(fields[0], "%Y-%m-%d")
        .map_err(|e| DataError::Parse(format!("kline date {:?}: {}", fields[0], e)))?;
    let num = |idx: usize| -> Result<f64> {
        fields[idx]
            .parse::<f64>()
            .map_err(|e| DataError::Parse(format!("kline field {:?}: {}", fields[idx], e)))
    };

    Ok(PriceBar {
        code: code.to_string(),
        date,
        open: num(1)?,
        close: num(2)?,
        high: num(3)?,
        low: num(4)?,
        volume: num(5)? * SHARES_PER_LOT,
        amount: num(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_klines() {
        let body = r#"{"rc":0,"data":{"code":"600000","klines":[
            "2024-01-03,7.10,7.15,7.20,7.05,1000,715000.00",
            "2024-01-02,7.00,7.08,7.12,6.98,2000,1416000.00"
        ]}}"#;
        let bars = parse_klines("600000", body).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[0].open, 7.00);
        assert_eq!(bars[0].close, 7.08);
        assert_eq!(bars[0].high, 7.12);
        assert_eq!(bars[0].low, 6.98);
        assert_eq!(bars[0].volume, 200_000.0);
        assert_eq!(bars[0].amount, 1_416_000.0);
        assert_eq!(bars[1].code, "600000");
    }

    #[test]
    fn test_unknown_instrument_is_empty() {
        let bars = parse_klines("999999", r#"{"rc":0,"data":null}"#).unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn test_malformed_line_is_error() {
        let body = r#"{"data":{"klines":["2024-01-02,7.00"]}}"#;
        assert!(matches!(
            parse_klines("600000", body),
            Err(DataError::Parse(_))
        ));
    }
}
