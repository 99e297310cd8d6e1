//! Share count in effect on a given day.

use chrono::NaiveDate;
use pbval_data::ShareCountChange;

/// Total shares in effect on `target` according to `history`.
///
/// The most recent change on or before `target` wins. For a day before every
/// recorded change, the earliest change is used instead. Returns `None` only
/// for an empty history. The order of `history` does not matter.
pub fn resolve(history: &[ShareCountChange], target: NaiveDate) -> Option<f64> {
    let on_or_before = history
        .iter()
        .filter(|c| c.effective_date <= target)
        .max_by_key(|c| c.effective_date);

    on_or_before
        .or_else(|| history.iter().min_by_key(|c| c.effective_date))
        .map(|c| c.total_shares)
}

/// [`resolve`] over a history sorted once, for repeated lookups.
#[derive(Debug, Clone)]
pub struct ShareCountResolver {
    changes: Vec<(NaiveDate, f64)>,
}

impl ShareCountResolver {
    /// Index a history given in any order.
    pub fn new(history: &[ShareCountChange]) -> Self {
        let mut changes: Vec<(NaiveDate, f64)> = history
            .iter()
            .map(|c| (c.effective_date, c.total_shares))
            .collect();
        changes.sort_by_key(|(date, _)| *date);
        Self { changes }
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Total shares in effect on `target`.
    pub fn resolve(&self, target: NaiveDate) -> Option<f64> {
        let idx = self.changes.partition_point(|(date, _)| *date <= target);
        let entry = if idx > 0 {
            self.changes.get(idx - 1)
        } else {
            self.changes.first()
        };
        entry.map(|(_, shares)| *shares)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn history() -> Vec<ShareCountChange> {
        // Newest first, as the cache returns it.
        [(date(2022, 6, 1), 150.0), (date(2020, 1, 1), 100.0)]
            .into_iter()
            .map(|(effective_date, total_shares)| ShareCountChange {
                code: "600000".to_string(),
                effective_date,
                total_shares,
                restricted_shares: None,
                circulating_shares: None,
                reason: None,
            })
            .collect()
    }

    #[rstest]
    #[case(date(2021, 1, 1), 100.0)]
    #[case(date(2023, 1, 1), 150.0)]
    #[case(date(2019, 1, 1), 100.0)]
    #[case(date(2020, 1, 1), 100.0)]
    #[case(date(2022, 6, 1), 150.0)]
    fn test_resolve(#[case] target: NaiveDate, #[case] expected: f64) {
        assert_eq!(resolve(&history(), target), Some(expected));
        assert_eq!(ShareCountResolver::new(&history()).resolve(target), Some(expected));
    }

    #[test]
    fn test_resolve_empty_history() {
        assert_eq!(resolve(&[], date(2024, 1, 1)), None);
        let resolver = ShareCountResolver::new(&[]);
        assert!(resolver.is_empty());
        assert_eq!(resolver.resolve(date(2024, 1, 1)), None);
    }
}
