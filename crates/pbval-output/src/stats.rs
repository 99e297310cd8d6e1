//! Percentile ranking and distribution statistics for valuation histories.
//!
//! Percentiles are right-inclusive everywhere: a historical value equal to
//! the current one counts toward it. Standard deviations use the sample
//! (`n - 1`) denominator.

use chrono::NaiveDate;
use pbval_data::PbRecord;
use pbval_engine::CompositePoint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Share of `historical` values at or below `current`, in percent.
///
/// Non-finite values are ignored. Returns `None` when no finite history
/// remains or `current` itself is not finite.
///
/// # Examples
///
/// ```
/// use pbval_output::percentile_rank;
///
/// let history = [1.0, 2.0, 3.0, 4.0, 5.0];
/// assert_eq!(percentile_rank(3.0, &history), Some(60.0));
/// assert_eq!(percentile_rank(3.0, &[]), None);
/// ```
pub fn percentile_rank(current: f64, historical: &[f64]) -> Option<f64> {
    if !current.is_finite() {
        return None;
    }
    let finite: Vec<f64> = historical.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    let at_or_below = finite.iter().filter(|v| **v <= current).count();
    Some(at_or_below as f64 * 100.0 / finite.len() as f64)
}

/// Descriptive statistics of a sample.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DistributionSummary {
    /// Number of finite values
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Median, averaging the two middle values for an even count
    pub median: f64,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
    /// Sample standard deviation, 0 for fewer than two values
    pub std_dev: f64,
}

impl DistributionSummary {
    /// Summarise the finite values of `values`. Returns `None` if there are none.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let median = if count % 2 == 0 {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        } else {
            sorted[count / 2]
        };
        let std_dev = if count < 2 {
            0.0
        } else {
            let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        };

        Some(Self {
            count,
            mean,
            median,
            min: sorted[0],
            max: sorted[count - 1],
            std_dev,
        })
    }
}

/// Current valuation set against its own history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValuationSummary {
    /// Instrument or ETF label
    pub name: String,
    /// First day of the history
    pub period_start: NaiveDate,
    /// Last day of the history
    pub period_end: NaiveDate,
    /// Most recent PB
    pub current: f64,
    /// Date of the most recent PB
    pub current_date: NaiveDate,
    /// Percentile of `current` within the history
    pub percentile: f64,
    /// Distribution of the history
    pub distribution: DistributionSummary,
}

impl ValuationSummary {
    /// Summarise a dated PB history. The last point is taken as current.
    ///
    /// Points need not be sorted. Returns `None` when there is no finite value.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use pbval_output::ValuationSummary;
    ///
    /// let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
    /// let points = [(day(2), 1.0), (day(3), 2.0), (day(4), 1.5)];
    ///
    /// let summary = ValuationSummary::from_points("600000", &points).unwrap();
    /// assert_eq!(summary.current, 1.5);
    /// assert!((summary.percentile - 200.0 / 3.0).abs() < 1e-9);
    /// ```
    pub fn from_points(name: impl Into<String>, points: &[(NaiveDate, f64)]) -> Option<Self> {
        let mut points: Vec<(NaiveDate, f64)> =
            points.iter().copied().filter(|(_, v)| v.is_finite()).collect();
        points.sort_by_key(|(date, _)| *date);

        let (period_start, _) = *points.first()?;
        let (current_date, current) = *points.last()?;
        let values: Vec<f64> = points.iter().map(|(_, v)| *v).collect();

        Some(Self {
            name: name.into(),
            period_start,
            period_end: current_date,
            current,
            current_date,
            percentile: percentile_rank(current, &values)?,
            distribution: DistributionSummary::from_values(&values)?,
        })
    }

    /// Summarise the defined PB values of an instrument's series.
    pub fn from_pb_records(name: impl Into<String>, records: &[PbRecord]) -> Option<Self> {
        let points: Vec<(NaiveDate, f64)> = records
            .iter()
            .filter_map(|r| r.pb.map(|pb| (r.date, pb)))
            .collect();
        Self::from_points(name, &points)
    }

    /// Summarise a composite ETF history.
    ///
    /// Carried-forward points repeat an earlier value and are left out, so
    /// each observed composite value counts once in the distribution.
    pub fn from_composite(name: impl Into<String>, points: &[CompositePoint]) -> Option<Self> {
        let points: Vec<(NaiveDate, f64)> = points
            .iter()
            .filter(|p| !p.carried_forward)
            .map(|p| (p.date, p.pb))
            .collect();
        Self::from_points(name, &points)
    }

    /// Coarse reading of the percentile.
    pub fn zone(&self) -> ValuationZone {
        ValuationZone::from_percentile(self.percentile)
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\nValuation Summary: {}\n", self.name));
        output.push_str(&format!(
            "Period: {} to {}\n",
            self.period_start, self.period_end
        ));
        output.push_str(&"=".repeat(80));
        output.push('\n');

        output.push_str(&format!(
            "  Current PB:               {:.4} ({})\n",
            self.current, self.current_date
        ));
        output.push_str(&format!(
            "  Percentile:               {:.2}% ({})\n",
            self.percentile,
            self.zone()
        ));

        output.push_str("\nHistorical Distribution:\n");
        output.push_str(&"-".repeat(80));
        output.push('\n');
        let d = &self.distribution;
        output.push_str(&format!("  Observations:             {}\n", d.count));
        output.push_str(&format!("  Mean:                     {:.4}\n", d.mean));
        output.push_str(&format!("  Median:                   {:.4}\n", d.median));
        output.push_str(&format!("  Min:                      {:.4}\n", d.min));
        output.push_str(&format!("  Max:                      {:.4}\n", d.max));
        output.push_str(&format!("  Std Dev:                  {:.4}\n", d.std_dev));

        output.push_str(&"=".repeat(80));
        output.push('\n');

        output
    }

    /// Format as Markdown for documentation.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("# Valuation Summary: {}\n\n", self.name));
        output.push_str(&format!(
            "**Period:** {} to {}\n\n",
            self.period_start, self.period_end
        ));
        output.push_str(&format!(
            "- **Current PB:** {:.4} ({})\n",
            self.current, self.current_date
        ));
        output.push_str(&format!(
            "- **Percentile:** {:.2}% ({})\n\n",
            self.percentile,
            self.zone()
        ));

        let d = &self.distribution;
        output.push_str("## Historical Distribution\n\n");
        output.push_str("| Count | Mean | Median | Min | Max | Std Dev |\n");
        output.push_str("|-------|------|--------|-----|-----|---------|\n");
        output.push_str(&format!(
            "| {} | {:.4} | {:.4} | {:.4} | {:.4} | {:.4} |\n",
            d.count, d.mean, d.median, d.min, d.max, d.std_dev
        ));

        output
    }
}

impl fmt::Display for ValuationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Valuation Summary: {} ({} to {})",
            self.name, self.period_start, self.period_end
        )?;
        writeln!(f, "  Current PB: {:.4} on {}", self.current, self.current_date)?;
        writeln!(f, "  Percentile: {:.2}% ({})", self.percentile, self.zone())?;
        writeln!(
            f,
            "  Range: {:.4} - {:.4}, median {:.4}",
            self.distribution.min, self.distribution.max, self.distribution.median
        )?;
        Ok(())
    }
}

/// Percentile band of a valuation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ValuationZone {
    /// At or below the 20th percentile
    Low,
    /// Between the 20th and 80th percentiles
    Normal,
    /// Above the 80th percentile
    High,
}

impl ValuationZone {
    /// Band for a percentile in `[0, 100]`.
    pub fn from_percentile(percentile: f64) -> Self {
        if percentile <= 20.0 {
            Self::Low
        } else if percentile <= 80.0 {
            Self::Normal
        } else {
            Self::High
        }
    }
}

impl fmt::Display for ValuationZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case(3.0, Some(60.0))]
    #[case(0.5, Some(0.0))]
    #[case(5.0, Some(100.0))]
    #[case(9.0, Some(100.0))]
    #[case(f64::NAN, None)]
    fn test_percentile_rank(#[case] current: f64, #[case] expected: Option<f64>) {
        assert_eq!(percentile_rank(current, &[1.0, 2.0, 3.0, 4.0, 5.0]), expected);
    }

    #[test]
    fn test_composite_summary_skips_carried_points() {
        let point = |d: u32, pb: f64, carried_forward: bool| CompositePoint {
            date: NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
            quarter: pbval_data::Quarter::new(2024, 1).unwrap(),
            pb,
            contributing: 2,
            total_weight: 1.0,
            carried_forward,
        };
        let points = vec![
            point(2, 1.0, false),
            point(3, 3.0, false),
            point(4, 3.0, true),
            point(5, 2.0, false),
        ];

        let summary = ValuationSummary::from_composite("510300", &points).unwrap();
        assert_eq!(summary.distribution.count, 3);
        assert_relative_eq!(summary.percentile, 200.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(summary.distribution.mean, 2.0);
        assert_eq!(summary.current, 2.0);
    }

    #[test]
    fn test_percentile_ties_count_toward_current() {
        assert_eq!(percentile_rank(2.0, &[2.0, 2.0, 3.0, 1.0]), Some(75.0));
    }

    #[test]
    fn test_percentile_ignores_non_finite_history() {
        assert_eq!(percentile_rank(2.0, &[1.0, f64::NAN, 3.0]), Some(50.0));
        assert_eq!(percentile_rank(2.0, &[f64::INFINITY]), None);
    }

    #[test]
    fn test_distribution_summary() {
        let d = DistributionSummary::from_values(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(d.count, 4);
        assert_relative_eq!(d.mean, 2.5);
        assert_relative_eq!(d.median, 2.5);
        assert_relative_eq!(d.min, 1.0);
        assert_relative_eq!(d.max, 4.0);
        // Sample deviation of 1..=4.
        assert_relative_eq!(d.std_dev, (5.0f64 / 3.0).sqrt());
    }

    #[test]
    fn test_distribution_single_value() {
        let d = DistributionSummary::from_values(&[1.7]).unwrap();
        assert_eq!(d.std_dev, 0.0);
        assert_eq!(d.median, 1.7);
        assert!(DistributionSummary::from_values(&[]).is_none());
    }

    #[rstest]
    #[case(10.0, ValuationZone::Low)]
    #[case(20.0, ValuationZone::Low)]
    #[case(50.0, ValuationZone::Normal)]
    #[case(95.0, ValuationZone::High)]
    fn test_zone(#[case] percentile: f64, #[case] expected: ValuationZone) {
        assert_eq!(ValuationZone::from_percentile(percentile), expected);
    }

    #[test]
    fn test_summary_rendering() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let summary =
            ValuationSummary::from_points("510300", &[(day(3), 1.2), (day(2), 1.4)]).unwrap();

        assert_eq!(summary.period_start, day(2));
        assert_eq!(summary.current_date, day(3));
        assert_relative_eq!(summary.percentile, 50.0);

        let ascii = summary.to_ascii_table();
        assert!(ascii.contains("Valuation Summary: 510300"));
        assert!(ascii.contains("Percentile:"));

        let markdown = summary.to_markdown();
        assert!(markdown.contains("# Valuation Summary: 510300"));
        assert!(markdown.contains("| Count |"));

        assert!(summary.to_string().contains("Current PB: 1.2000"));
    }
}
