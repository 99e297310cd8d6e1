//! Trading profile of an ETF from its daily bars.
//!
//! Windows are anchored on the latest bar with a usable amplitude rather than
//! today, so a stale series still yields a full year of history.

use chrono::{Days, NaiveDate};
use pbval_data::PriceBar;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Calendar days in the long window.
pub const YEAR_WINDOW_DAYS: u64 = 365;

/// Calendar days in the short window.
pub const RECENT_WINDOW_DAYS: u64 = 60;

/// Intraday range of one bar as a percentage of its open.
pub fn amplitude(bar: &PriceBar) -> Option<f64> {
    if bar.open == 0.0 {
        return None;
    }
    let pct = (bar.high - bar.low) / bar.open * 100.0;
    pct.is_finite().then_some(pct)
}

/// Open-to-close direction of a day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DayDirection {
    /// Close above open
    Up,
    /// Close below open
    Down,
    /// Close equal to open
    Flat,
}

impl fmt::Display for DayDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Flat => "flat",
        })
    }
}

/// The widest-ranging day of a window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AmplitudeDay {
    /// Trading day
    pub date: NaiveDate,
    /// `(high - low) / open` in percent
    pub amplitude: f64,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Open-to-close direction
    pub direction: DayDirection,
    /// Absolute open-to-close move in percent of open
    pub change_pct: f64,
    /// Open-to-high move in percent of open
    pub max_rise_pct: f64,
    /// Open-to-low move in percent of open
    pub max_fall_pct: f64,
}

impl AmplitudeDay {
    fn from_bar(bar: &PriceBar, amplitude: f64) -> Self {
        let pct = |delta: f64| delta / bar.open * 100.0;
        let direction = if bar.close > bar.open {
            DayDirection::Up
        } else if bar.close < bar.open {
            DayDirection::Down
        } else {
            DayDirection::Flat
        };
        Self {
            date: bar.date,
            amplitude,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            direction,
            change_pct: pct((bar.close - bar.open).abs()),
            max_rise_pct: pct(bar.high - bar.open),
            max_fall_pct: pct(bar.open - bar.low),
        }
    }
}

/// Amplitude and turnover figures for an ETF.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EtfPriceProfile {
    /// ETF code
    pub code: String,
    /// First day of the one-year window
    pub year_start: NaiveDate,
    /// Latest bar with a usable amplitude
    pub year_end: NaiveDate,
    /// Widest day of the year
    pub year_max: AmplitudeDay,
    /// Average daily traded value over the year
    pub avg_turnover: f64,
    /// First day of the sixty-day window
    pub recent_start: NaiveDate,
    /// Widest day of the last sixty days
    pub recent_max: AmplitudeDay,
    /// Mean amplitude of the last sixty days with the widest day removed,
    /// `None` when that day is the only one
    pub recent_avg_amplitude_ex_max: Option<f64>,
}

impl EtfPriceProfile {
    /// Profile `bars` of `code`. Returns `None` when no bar has a usable open.
    pub fn from_bars(code: impl Into<String>, bars: &[PriceBar]) -> Option<Self> {
        let mut usable: Vec<(&PriceBar, f64)> = bars
            .iter()
            .filter_map(|b| amplitude(b).map(|a| (b, a)))
            .collect();
        usable.sort_by_key(|(b, _)| b.date);

        let latest = usable.last().map(|(b, _)| b.date)?;
        let year_cutoff = latest.checked_sub_days(Days::new(YEAR_WINDOW_DAYS))?;
        let recent_cutoff = latest.checked_sub_days(Days::new(RECENT_WINDOW_DAYS))?;

        let year: Vec<(&PriceBar, f64)> = usable
            .into_iter()
            .filter(|(b, _)| b.date >= year_cutoff)
            .collect();
        let (year_bar, year_amp) = widest(&year)?;

        let traded: Vec<f64> = bars
            .iter()
            .filter(|b| b.date >= year_cutoff && b.date <= latest)
            .map(|b| b.amount)
            .filter(|a| a.is_finite())
            .collect();
        let avg_turnover = if traded.is_empty() {
            0.0
        } else {
            traded.iter().sum::<f64>() / traded.len() as f64
        };

        let recent: Vec<(&PriceBar, f64)> = year
            .iter()
            .copied()
            .filter(|(b, _)| b.date >= recent_cutoff)
            .collect();
        // Holds at least the day at `latest`.
        let (recent_bar, recent_amp) = widest(&recent)?;

        let rest: Vec<f64> = recent
            .iter()
            .filter(|(b, _)| b.date != recent_bar.date)
            .map(|(_, a)| *a)
            .collect();
        let recent_avg_amplitude_ex_max =
            (!rest.is_empty()).then(|| rest.iter().sum::<f64>() / rest.len() as f64);

        Some(Self {
            code: code.into(),
            year_start: year.first().map(|(b, _)| b.date)?,
            year_end: latest,
            year_max: AmplitudeDay::from_bar(year_bar, year_amp),
            avg_turnover,
            recent_start: recent.first().map(|(b, _)| b.date)?,
            recent_max: AmplitudeDay::from_bar(recent_bar, recent_amp),
            recent_avg_amplitude_ex_max,
        })
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\nPrice Profile: {}\n", self.code));
        output.push_str(&"=".repeat(80));
        output.push('\n');

        output.push_str(&format!(
            "\nLast Year ({} to {}):\n",
            self.year_start, self.year_end
        ));
        output.push_str(&"-".repeat(80));
        output.push('\n');
        let day = &self.year_max;
        output.push_str(&format!(
            "  Max Amplitude:            {:.2}% on {}\n",
            day.amplitude, day.date
        ));
        output.push_str(&format!(
            "  O/H/L/C:                  {} / {} / {} / {}\n",
            day.open, day.high, day.low, day.close
        ));
        output.push_str(&format!(
            "  Day Move:                 {} {:.2}% (rise {:.2}%, fall {:.2}%)\n",
            day.direction, day.change_pct, day.max_rise_pct, day.max_fall_pct
        ));
        output.push_str(&format!(
            "  Avg Daily Turnover:       {:.2} (100M)\n",
            self.avg_turnover / 1e8
        ));

        output.push_str(&format!(
            "\nLast 60 Days ({} to {}):\n",
            self.recent_start, self.year_end
        ));
        output.push_str(&"-".repeat(80));
        output.push('\n');
        output.push_str(&format!(
            "  Max Amplitude:            {:.2}% on {}\n",
            self.recent_max.amplitude, self.recent_max.date
        ));
        match self.recent_avg_amplitude_ex_max {
            Some(avg) => output.push_str(&format!("  Avg Amplitude (ex max):   {:.2}%\n", avg)),
            None => output.push_str("  Avg Amplitude (ex max):   n/a\n"),
        }

        output.push_str(&"=".repeat(80));
        output.push('\n');

        output
    }
}

/// Widest day, the earliest one on ties.
fn widest<'a>(days: &[(&'a PriceBar, f64)]) -> Option<(&'a PriceBar, f64)> {
    days.iter()
        .copied()
        .reduce(|best, day| if day.1 > best.1 { day } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bar(date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> PriceBar {
        PriceBar {
            code: "588200".to_string(),
            date,
            open,
            high,
            low,
            close,
            volume: 1000.0,
            amount: close * 1000.0,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_amplitude() {
        assert_relative_eq!(amplitude(&bar(day(2024, 1, 2), 1.0, 1.1, 0.95, 1.0)).unwrap(), 15.0);
        assert_eq!(amplitude(&bar(day(2024, 1, 2), 0.0, 1.0, 0.5, 1.0)), None);
    }

    #[test]
    fn test_profile_windows() {
        let bars = vec![
            // Outside the year window.
            bar(day(2023, 1, 3), 1.0, 2.0, 0.5, 1.0),
            // In the year window only.
            bar(day(2024, 2, 1), 1.0, 1.2, 0.9, 1.1),
            bar(day(2024, 11, 1), 1.0, 1.05, 0.97, 0.98),
            bar(day(2024, 12, 2), 1.0, 1.04, 1.0, 1.0),
            bar(day(2024, 12, 31), 1.0, 1.02, 1.0, 1.01),
        ];

        let profile = EtfPriceProfile::from_bars("588200", &bars).unwrap();

        assert_eq!(profile.year_start, day(2024, 2, 1));
        assert_eq!(profile.year_end, day(2024, 12, 31));
        assert_eq!(profile.year_max.date, day(2024, 2, 1));
        assert_relative_eq!(profile.year_max.amplitude, 30.0, epsilon = 1e-9);
        assert_eq!(profile.year_max.direction, DayDirection::Up);
        assert_relative_eq!(profile.year_max.change_pct, 10.0, epsilon = 1e-9);

        assert_eq!(profile.recent_start, day(2024, 11, 1));
        assert_eq!(profile.recent_max.date, day(2024, 11, 1));
        assert_relative_eq!(profile.recent_max.amplitude, 8.0, epsilon = 1e-9);
        assert_relative_eq!(profile.recent_avg_amplitude_ex_max.unwrap(), 3.0, epsilon = 1e-9);

        let turnover = (1.1 + 0.98 + 1.0 + 1.01) * 1000.0 / 4.0;
        assert_relative_eq!(profile.avg_turnover, turnover, epsilon = 1e-9);

        assert!(profile.to_ascii_table().contains("Max Amplitude"));
    }

    #[test]
    fn test_turnover_uses_traded_value() {
        let bars = vec![
            PriceBar {
                amount: 3.0e8,
                ..bar(day(2024, 6, 3), 1.0, 1.02, 0.99, 1.01)
            },
            PriceBar {
                amount: 1.0e8,
                ..bar(day(2024, 6, 4), 1.0, 1.01, 0.99, 1.0)
            },
        ];

        let profile = EtfPriceProfile::from_bars("588200", &bars).unwrap();
        assert_relative_eq!(profile.avg_turnover, 2.0e8);
        assert!(profile.to_ascii_table().contains("2.00 (100M)"));
    }

    #[test]
    fn test_unusable_latest_bar_does_not_anchor_windows() {
        let bars = vec![
            bar(day(2024, 3, 1), 1.0, 1.06, 1.0, 1.05),
            bar(day(2024, 3, 4), 1.0, 1.02, 1.0, 1.0),
            // Suspended day reported with a zero open, far after the others.
            bar(day(2024, 9, 2), 0.0, 0.0, 0.0, 0.0),
        ];

        let profile = EtfPriceProfile::from_bars("588200", &bars).unwrap();
        assert_eq!(profile.year_end, day(2024, 3, 4));
        assert_eq!(profile.recent_start, day(2024, 3, 1));
        assert_eq!(profile.recent_max.date, day(2024, 3, 1));
        assert_relative_eq!(profile.recent_avg_amplitude_ex_max.unwrap(), 2.0, epsilon = 1e-9);
        assert_relative_eq!(profile.avg_turnover, (1.05 + 1.0) * 1000.0 / 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_single_recent_day() {
        let profile =
            EtfPriceProfile::from_bars("588200", &[bar(day(2024, 5, 6), 1.0, 1.1, 1.0, 1.05)])
                .unwrap();
        assert_eq!(profile.recent_avg_amplitude_ex_max, None);
        assert!(EtfPriceProfile::from_bars("588200", &[]).is_none());
    }
}
