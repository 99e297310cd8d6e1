//! Rolling retention window for cached records.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Days kept by the default window: five years of 365 days.
pub const DEFAULT_RETENTION_DAYS: i64 = 5 * 365;

/// Oldest date kept in the cache.
///
/// The window is computed once per run and passed to every cache read and
/// write, so every record written or returned during that run agrees on the
/// same cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionWindow {
    cutoff: NaiveDate,
}

impl RetentionWindow {
    /// Window whose oldest kept date is `cutoff`.
    pub const fn from_cutoff(cutoff: NaiveDate) -> Self {
        Self { cutoff }
    }

    /// Window covering `days` days before `today`.
    pub fn days_before(today: NaiveDate, days: i64) -> Self {
        Self {
            cutoff: today - Duration::days(days),
        }
    }

    /// Five years of 365 days before `today`.
    pub fn five_years_before(today: NaiveDate) -> Self {
        Self::days_before(today, DEFAULT_RETENTION_DAYS)
    }

    /// Oldest date kept.
    pub const fn cutoff(&self) -> NaiveDate {
        self.cutoff
    }

    /// Whether a record dated `date` is kept.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.cutoff
    }

    /// Drop items whose date falls before the cutoff.
    pub fn retain<T>(&self, items: &[T], date_of: impl Fn(&T) -> NaiveDate) -> Vec<T>
    where
        T: Clone,
    {
        items
            .iter()
            .filter(|item| self.contains(date_of(item)))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_year_cutoff() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        let window = RetentionWindow::five_years_before(today);
        assert_eq!(window.cutoff(), today - Duration::days(1825));
        assert!(window.contains(window.cutoff()));
        assert!(!window.contains(window.cutoff() - Duration::days(1)));
        assert!(window.contains(today));
    }

    #[test]
    fn test_retain_filters_old_items() {
        let window = RetentionWindow::from_cutoff(NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        let dates = vec![
            NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
            NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2022, 5, 1).unwrap(),
        ];
        let kept = window.retain(&dates, |d| *d);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0], NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
    }
}
