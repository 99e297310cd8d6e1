//! Summaries and exports over engine output.

use chrono::NaiveDate;
use pbval_data::{HoldingEntry, PbRecord, Quarter};
use pbval_engine::{CompositeInput, FallbackPolicy};
use pbval_output::{ExportFormat, Exporter, ValuationSummary, ValuationZone};
use std::collections::HashMap;

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

fn record(code: &str, day: NaiveDate, pb: f64) -> PbRecord {
    PbRecord {
        code: code.to_string(),
        date: day,
        close_price: pb,
        total_shares: 1.0,
        market_cap: Some(pb),
        net_assets: Some(1.0),
        report_period: Some(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()),
        pb: Some(pb),
    }
}

#[test]
fn test_composite_summary_workflow() {
    let q1 = Quarter::new(2024, 1).unwrap();
    let holdings: Vec<HoldingEntry> = [("600000", 0.5), ("000001", 0.5)]
        .into_iter()
        .map(|(code, weight)| HoldingEntry {
            etf_code: "510300".to_string(),
            quarter: q1,
            constituent_code: code.to_string(),
            constituent_name: code.to_string(),
            weight,
            shares: None,
            market_value: None,
        })
        .collect();

    let days = [date(1, 2), date(1, 3), date(1, 4), date(1, 5)];
    let mut series: HashMap<String, Vec<PbRecord>> = HashMap::new();
    series.insert(
        "600000".to_string(),
        days.iter().zip([1.0, 2.0, 3.0, 1.0]).map(|(d, pb)| record("600000", *d, pb)).collect(),
    );
    series.insert(
        "000001".to_string(),
        days.iter().zip([3.0, 2.0, 1.0, 1.0]).map(|(d, pb)| record("000001", *d, pb)).collect(),
    );

    let input = CompositeInput {
        etf_code: "510300",
        holdings: &holdings,
        series: &series,
    };
    let aggregation = FallbackPolicy::standard().aggregate(&input).unwrap();
    assert!(!aggregation.fell_back);

    let pb_values = aggregation.composite.pb_values();
    assert_eq!(pb_values, vec![2.0, 2.0, 2.0, 1.0]);

    let points = match &aggregation.composite {
        pbval_engine::Composite::Series { points } => points.clone(),
        other => panic!("expected a series, got {other:?}"),
    };
    let summary = ValuationSummary::from_composite("510300", &points).unwrap();
    assert_eq!(summary.current, 1.0);
    assert_eq!(summary.percentile, 25.0);
    assert_eq!(summary.zone(), ValuationZone::Normal);

    let csv = aggregation.export_to_string(ExportFormat::Csv).unwrap();
    assert_eq!(csv.lines().count(), 5);
    assert!(csv.contains("2024-01-05,2024Q1,1.0,2,1.0,false"));
}

#[test]
fn test_summary_export_to_file() {
    let records: Vec<PbRecord> = (2..=6).map(|d| record("600000", date(2, d), d as f64)).collect();
    let summary = ValuationSummary::from_pb_records("600000", &records).unwrap();
    assert_eq!(summary.percentile, 100.0);
    assert_eq!(summary.zone(), ValuationZone::High);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("summary.json");
    summary.export_to_file(&path, ExportFormat::PrettyJson).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    let parsed: ValuationSummary = serde_json::from_str(&written).unwrap();
    assert_eq!(parsed, summary);
}
