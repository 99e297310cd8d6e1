//! Point-in-time join of prices, net-asset reports and share counts.
//!
//! Each trading day is valued against the latest report whose period ended on
//! or before that day and the share count in effect on that day. A report is
//! never applied to days before its period end.

use crate::shares::ShareCountResolver;
use pbval_data::{NetAssetReport, PbRecord, PriceBar, ShareCountChange, normalize_reports};
use tracing::{debug, warn};

/// Price-to-book from a close, a share count and net assets.
///
/// Returns `None` when net assets are zero or the ratio is not finite.
pub fn price_to_book(close: f64, total_shares: f64, net_assets: f64) -> Option<f64> {
    if net_assets == 0.0 {
        return None;
    }
    let pb = close * total_shares / net_assets;
    pb.is_finite().then_some(pb)
}

/// Build the daily PB series of `code`.
///
/// Inputs may arrive in any order. One record is produced per price bar, in
/// ascending date order, except for days with no resolvable share count,
/// which are skipped. Days before the first report keep only price and share
/// fields.
pub fn join_pb_series(
    code: &str,
    bars: &[PriceBar],
    reports: &[NetAssetReport],
    history: &[ShareCountChange],
) -> Vec<PbRecord> {
    let reports = normalize_reports(reports.to_vec());
    let resolver = ShareCountResolver::new(history);

    let mut days: Vec<&PriceBar> = bars.iter().collect();
    days.sort_by_key(|bar| bar.date);

    let mut records = Vec::with_capacity(days.len());
    for bar in days {
        let Some(total_shares) = resolver.resolve(bar.date) else {
            warn!(code, date = %bar.date, "No share count in effect, skipping day");
            continue;
        };

        let applicable = reports.partition_point(|r| r.period_end <= bar.date);
        let record = match applicable.checked_sub(1).and_then(|i| reports.get(i)) {
            Some(report) => {
                let market_cap = bar.close * total_shares;
                PbRecord {
                    code: code.to_string(),
                    date: bar.date,
                    close_price: bar.close,
                    total_shares,
                    market_cap: Some(market_cap),
                    net_assets: report.net_assets,
                    report_period: Some(report.period_end),
                    pb: report
                        .net_assets
                        .and_then(|na| price_to_book(bar.close, total_shares, na)),
                }
            }
            None => PbRecord {
                code: code.to_string(),
                date: bar.date,
                close_price: bar.close,
                total_shares,
                market_cap: None,
                net_assets: None,
                report_period: None,
                pb: None,
            },
        };
        records.push(record);
    }

    debug!(code, days = records.len(), "Joined PB series");
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Days, NaiveDate};
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bar(d: NaiveDate, close: f64) -> PriceBar {
        PriceBar {
            code: "600000".to_string(),
            date: d,
            open: close,
            high: close,
            low: close,
            close,
            volume: 100.0,
            amount: close * 100.0,
        }
    }

    fn shares(d: NaiveDate, total: f64) -> ShareCountChange {
        ShareCountChange {
            code: "600000".to_string(),
            effective_date: d,
            total_shares: total,
            restricted_shares: None,
            circulating_shares: None,
            reason: None,
        }
    }

    #[test]
    fn test_price_to_book() {
        assert_relative_eq!(price_to_book(10.0, 1000.0, 5000.0).unwrap(), 2.0);
        assert_eq!(price_to_book(10.0, 1000.0, 0.0), None);
    }

    #[test]
    fn test_report_applies_from_period_end() {
        let bars = vec![
            bar(date(2023, 6, 29), 9.0),
            bar(date(2023, 6, 30), 10.0),
            bar(date(2023, 7, 3), 11.0),
        ];
        let reports = vec![NetAssetReport::from_text("600000", date(2023, 6, 30), "5000")];
        let history = vec![shares(date(2020, 1, 1), 1000.0)];

        let records = join_pb_series("600000", &bars, &reports, &history);
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].report_period, None);
        assert_eq!(records[0].market_cap, None);
        assert_eq!(records[0].pb, None);

        assert_eq!(records[1].report_period, Some(date(2023, 6, 30)));
        assert_relative_eq!(records[1].market_cap.unwrap(), 10_000.0);
        assert_relative_eq!(records[1].pb.unwrap(), 2.0);
        assert_relative_eq!(records[2].pb.unwrap(), 2.2);
    }

    #[test]
    fn test_latest_applicable_report_wins() {
        let bars = vec![bar(date(2024, 5, 6), 10.0), bar(date(2024, 2, 1), 10.0)];
        let reports = vec![
            NetAssetReport::from_text("600000", date(2024, 3, 31), "10000"),
            NetAssetReport::from_text("600000", date(2023, 12, 31), "5000"),
        ];
        let history = vec![shares(date(2020, 1, 1), 1000.0)];

        let records = join_pb_series("600000", &bars, &reports, &history);
        assert_eq!(records[0].date, date(2024, 2, 1));
        assert_relative_eq!(records[0].pb.unwrap(), 2.0);
        assert_eq!(records[1].report_period, Some(date(2024, 3, 31)));
        assert_relative_eq!(records[1].pb.unwrap(), 1.0);
    }

    /// Quarterly reports, deliberately out of order.
    fn quarterly_reports() -> Vec<NetAssetReport> {
        vec![
            NetAssetReport::from_text("600000", date(2023, 9, 30), "3000"),
            NetAssetReport::from_text("600000", date(2022, 12, 31), "1000"),
            NetAssetReport::from_text("600000", date(2024, 3, 31), "5000"),
            NetAssetReport::from_text("600000", date(2023, 6, 30), "2000"),
            NetAssetReport::from_text("600000", date(2023, 12, 31), "4000"),
        ]
    }

    #[rstest]
    #[case(date(2022, 12, 30), None)]
    #[case(date(2022, 12, 31), Some(date(2022, 12, 31)))]
    #[case(date(2023, 6, 29), Some(date(2022, 12, 31)))]
    #[case(date(2023, 6, 30), Some(date(2023, 6, 30)))]
    #[case(date(2023, 7, 1), Some(date(2023, 6, 30)))]
    #[case(date(2023, 12, 31), Some(date(2023, 12, 31)))]
    #[case(date(2024, 3, 30), Some(date(2023, 12, 31)))]
    #[case(date(2024, 3, 31), Some(date(2024, 3, 31)))]
    #[case(date(2025, 1, 2), Some(date(2024, 3, 31)))]
    fn test_as_of_report_selection(#[case] day: NaiveDate, #[case] expected: Option<NaiveDate>) {
        let history = vec![shares(date(2020, 1, 1), 1000.0)];
        let records = join_pb_series("600000", &[bar(day, 10.0)], &quarterly_reports(), &history);
        assert_eq!(records[0].report_period, expected);
    }

    #[test]
    fn test_as_of_never_looks_ahead_over_every_day() {
        let reports = quarterly_reports();
        let history = vec![shares(date(2020, 1, 1), 1000.0)];
        let start = date(2022, 11, 1);
        let bars: Vec<PriceBar> = (0..600)
            .map(|offset| bar(start + Days::new(offset), 10.0))
            .collect();

        let records = join_pb_series("600000", &bars, &reports, &history);
        assert_eq!(records.len(), bars.len());

        for record in &records {
            let expected = reports
                .iter()
                .filter(|r| r.period_end <= record.date)
                .max_by_key(|r| r.period_end);
            assert_eq!(
                record.report_period,
                expected.map(|r| r.period_end),
                "report for {}",
                record.date
            );
            match expected.and_then(|r| r.net_assets) {
                Some(na) => assert_relative_eq!(record.pb.unwrap(), 10_000.0 / na),
                None => assert_eq!(record.pb, None),
            }
        }
    }

    #[test]
    fn test_zero_and_undecodable_net_assets() {
        let bars = vec![bar(date(2024, 1, 2), 10.0), bar(date(2024, 4, 2), 10.0)];
        let reports = vec![
            NetAssetReport::from_text("600000", date(2023, 12, 31), "0"),
            NetAssetReport::from_text("600000", date(2024, 3, 31), "--"),
        ];
        let history = vec![shares(date(2020, 1, 1), 1000.0)];

        let records = join_pb_series("600000", &bars, &reports, &history);
        assert_eq!(records[0].net_assets, Some(0.0));
        assert_eq!(records[0].pb, None);
        assert_eq!(records[1].net_assets, None);
        assert_eq!(records[1].pb, None);
        assert!(records[1].market_cap.is_some());
    }

    #[test]
    fn test_share_change_applies_on_effective_date() {
        let bars = vec![bar(date(2022, 5, 31), 10.0), bar(date(2022, 6, 1), 10.0)];
        let reports = vec![NetAssetReport::from_text("600000", date(2021, 12, 31), "1500")];
        let history = vec![shares(date(2022, 6, 1), 150.0), shares(date(2020, 1, 1), 100.0)];

        let records = join_pb_series("600000", &bars, &reports, &history);
        assert_relative_eq!(records[0].total_shares, 100.0);
        assert_relative_eq!(records[1].total_shares, 150.0);
        assert_relative_eq!(records[1].pb.unwrap(), 1.0);
    }

    #[test]
    fn test_empty_share_history_skips_every_day() {
        let bars = vec![bar(date(2024, 1, 2), 10.0)];
        let reports = vec![NetAssetReport::from_text("600000", date(2023, 12, 31), "10")];
        assert!(join_pb_series("600000", &bars, &reports, &[]).is_empty());
    }
}
