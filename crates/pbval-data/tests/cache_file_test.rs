//! On-disk cache behaviour across independent handles.

use chrono::NaiveDate;
use pbval_data::{
    NetAssetReport, PbRecord, PriceBar, RetentionWindow, ShareCountChange, SqliteCache,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn window() -> RetentionWindow {
    RetentionWindow::five_years_before(date(2025, 1, 1))
}

#[test]
fn test_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pbval.db");

    {
        let cache = SqliteCache::new(&path).unwrap();
        cache
            .put_prices(
                &[PriceBar {
                    code: "600000".to_string(),
                    date: date(2024, 5, 6),
                    open: 7.0,
                    high: 7.2,
                    low: 6.9,
                    close: 7.1,
                    volume: 1.0e6,
                    amount: 7.1e6,
                }],
                &window(),
            )
            .unwrap();
        cache
            .put_net_assets(
                &[NetAssetReport::from_text("600000", date(2024, 3, 31), "5000亿")],
                &window(),
            )
            .unwrap();
        cache
            .put_share_history(&[ShareCountChange {
                code: "600000".to_string(),
                effective_date: date(2010, 1, 1),
                total_shares: 2.9e10,
                restricted_shares: None,
                circulating_shares: Some(2.9e10),
                reason: None,
            }])
            .unwrap();
    }

    let reopened = SqliteCache::new(&path).unwrap();
    assert_eq!(reopened.get_prices("600000", &window()).unwrap().len(), 1);
    assert_eq!(
        reopened.get_net_assets("600000", &window()).unwrap()[0].net_assets,
        Some(5.0e11)
    );
    assert_eq!(reopened.get_share_history("600000").unwrap().len(), 1);

    let stats = reopened.get_stats().unwrap();
    assert_eq!(stats.price_instruments, 1);
    assert_eq!(stats.net_asset_instruments, 1);
    assert_eq!(stats.share_history_instruments, 1);
}

#[test]
fn test_pb_series_write_once() {
    let dir = tempfile::tempdir().unwrap();
    let cache = SqliteCache::new(dir.path().join("pbval.db")).unwrap();

    let record = |pb: f64| PbRecord {
        code: "000001".to_string(),
        date: date(2024, 6, 3),
        close_price: 10.0,
        total_shares: 1000.0,
        market_cap: Some(10_000.0),
        net_assets: Some(10_000.0 / pb),
        report_period: Some(date(2024, 3, 31)),
        pb: Some(pb),
    };

    assert_eq!(cache.put_pb_series(&[record(2.0)], &window()).unwrap(), 1);
    assert_eq!(cache.put_pb_series(&[record(4.0)], &window()).unwrap(), 0);

    let cached = cache.get_pb_series("000001", &window()).unwrap();
    assert_eq!(cached, vec![record(2.0)]);
}
