//! Shared fixtures for workflow tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use pbval::BatchConfig;
use pbval_data::{NetAssetReport, PriceBar, ShareCountChange, StaticProvider};
use std::time::Duration;

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub(crate) fn config() -> BatchConfig {
    BatchConfig::for_date(date(2025, 1, 1)).with_fetch_delay(Duration::ZERO)
}

/// Register two February 2024 trading days for `code`, valued at `pb`
/// against a year-end report of 5000 and 1000 shares.
pub(crate) fn with_stock(provider: StaticProvider, code: &str, pb: f64) -> StaticProvider {
    let close = pb * 5.0;
    let bars = [date(2024, 2, 1), date(2024, 2, 2)]
        .into_iter()
        .map(|day| PriceBar {
            code: code.to_string(),
            date: day,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0e4,
            amount: close * 1.0e4,
        })
        .collect();

    provider
        .with_prices(code, bars)
        .with_net_assets(
            code,
            vec![NetAssetReport::from_text(code, date(2023, 12, 31), "5000")],
        )
        .with_share_history(
            code,
            vec![ShareCountChange {
                code: code.to_string(),
                effective_date: date(2010, 1, 1),
                total_shares: 1000.0,
                restricted_shares: None,
                circulating_shares: None,
                reason: None,
            }],
        )
}
