//! Decoding of magnitude-suffixed disclosure figures.
//!
//! Balance-sheet feeds report equity as text such as `"1,234.5亿"` or
//! `"-3.2万"`. [`normalize`] turns that into currency units and never fails:
//! anything it cannot read becomes `None`, which downstream code treats as a
//! data gap.

use crate::model::NetAssetReport;
use tracing::debug;

/// Magnitude suffixes, longest first so `万亿` is not read as `亿`.
const SUFFIXES: [(&str, f64); 3] = [("万亿", 1e12), ("亿", 1e8), ("万", 1e4)];

/// Decode a disclosed numeric figure into currency units.
///
/// Recognises the `亿` (hundred-million), `万` (ten-thousand) and `万亿`
/// multipliers, a trailing `元`, thousands separators and negative values.
/// Returns `None` for empty or placeholder text and for anything that does not
/// parse to a finite number.
///
/// # Examples
///
/// ```
/// use pbval_data::normalize;
///
/// assert_eq!(normalize("2.5亿"), Some(250_000_000.0));
/// assert_eq!(normalize("1234.5"), Some(1234.5));
/// assert_eq!(normalize("--"), None);
/// ```
pub fn normalize(raw: &str) -> Option<f64> {
    let text: String = raw
        .trim()
        .trim_end_matches('元')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    if text.is_empty() || text == "--" || text.eq_ignore_ascii_case("false") {
        return None;
    }

    let (number, multiplier) = SUFFIXES
        .iter()
        .find_map(|(suffix, scale)| text.strip_suffix(suffix).map(|n| (n, *scale)))
        .unwrap_or((text.as_str(), 1.0));

    match number.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value * multiplier),
        _ => {
            debug!(raw, "unparseable disclosure figure");
            None
        }
    }
}

/// Order reports ascending by period end and keep one report per period.
///
/// When a period appears more than once, a report with decoded net assets is
/// preferred over one without; otherwise the first occurrence is kept.
pub fn normalize_reports(mut reports: Vec<NetAssetReport>) -> Vec<NetAssetReport> {
    reports.sort_by_key(|r| r.period_end);

    let mut out: Vec<NetAssetReport> = Vec::with_capacity(reports.len());
    for report in reports {
        match out.last_mut() {
            Some(last) if last.period_end == report.period_end => {
                if last.net_assets.is_none() && report.net_assets.is_some() {
                    *last = report;
                }
            }
            _ => out.push(report),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use rstest::rstest;

    #[rstest]
    #[case("123.45亿", 12_345_000_000.0)]
    #[case("-3.2亿", -320_000_000.0)]
    #[case("5000万", 50_000_000.0)]
    #[case("1.2万亿", 1_200_000_000_000.0)]
    #[case("1,234.5", 1234.5)]
    #[case(" 42 ", 42.0)]
    #[case("88.8亿元", 8_880_000_000.0)]
    fn test_normalize_values(#[case] raw: &str, #[case] expected: f64) {
        let value = normalize(raw).unwrap();
        assert_relative_eq!(value, expected, max_relative = 1e-12);
    }

    #[rstest]
    #[case("")]
    #[case("--")]
    #[case("false")]
    #[case("n/a")]
    #[case("亿")]
    #[case("1.2.3亿")]
    fn test_normalize_undefined(#[case] raw: &str) {
        assert_eq!(normalize(raw), None);
    }

    fn report(month: u32, text: &str) -> NetAssetReport {
        NetAssetReport::from_text(
            "600000",
            NaiveDate::from_ymd_opt(2024, month, 28).unwrap(),
            text,
        )
    }

    #[test]
    fn test_normalize_reports_orders_ascending() {
        let reports = vec![report(9, "3亿"), report(3, "1亿"), report(6, "2亿")];
        let sorted = normalize_reports(reports);
        let months: Vec<u32> = sorted
            .iter()
            .map(|r| chrono::Datelike::month(&r.period_end))
            .collect();
        assert_eq!(months, vec![3, 6, 9]);
    }

    #[test]
    fn test_normalize_reports_dedups_by_period() {
        let reports = vec![report(3, "--"), report(3, "1亿"), report(3, "9亿")];
        let deduped = normalize_reports(reports);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].net_assets, Some(100_000_000.0));
    }
}
