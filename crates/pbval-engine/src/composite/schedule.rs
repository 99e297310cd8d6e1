//! Holdings composition per quarter.

use pbval_data::{HoldingEntry, Quarter};
use std::collections::BTreeMap;

/// A constituent and its weight within one quarter's holdings.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedConstituent {
    /// Six-digit constituent code
    pub code: String,
    /// Fraction of fund net value
    pub weight: f64,
}

/// Holdings grouped by disclosure quarter.
///
/// A constituent listed more than once in the same quarter has its weights
/// summed. Entries with a non-positive or non-finite weight are ignored.
#[derive(Debug, Clone, Default)]
pub struct HoldingsSchedule {
    quarters: BTreeMap<Quarter, Vec<WeightedConstituent>>,
}

impl HoldingsSchedule {
    /// Group `entries` by quarter.
    pub fn from_entries(entries: &[HoldingEntry]) -> Self {
        let mut quarters: BTreeMap<Quarter, Vec<WeightedConstituent>> = BTreeMap::new();
        for entry in entries {
            if !entry.weight.is_finite() || entry.weight <= 0.0 {
                continue;
            }
            let members = quarters.entry(entry.quarter).or_default();
            match members.iter_mut().find(|m| m.code == entry.constituent_code) {
                Some(existing) => existing.weight += entry.weight,
                None => members.push(WeightedConstituent {
                    code: entry.constituent_code.clone(),
                    weight: entry.weight,
                }),
            }
        }
        Self { quarters }
    }

    /// Whether no quarter has usable holdings.
    pub fn is_empty(&self) -> bool {
        self.quarters.is_empty()
    }

    /// Earliest disclosed quarter.
    pub fn first_quarter(&self) -> Option<Quarter> {
        self.quarters.keys().next().copied()
    }

    /// Latest disclosed quarter.
    pub fn last_quarter(&self) -> Option<Quarter> {
        self.quarters.keys().next_back().copied()
    }

    /// Composition disclosed for `quarter`, if any.
    pub fn get(&self, quarter: Quarter) -> Option<&[WeightedConstituent]> {
        self.quarters.get(&quarter).map(Vec::as_slice)
    }

    /// Disclosed quarters with their composition, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (Quarter, &[WeightedConstituent])> {
        self.quarters.iter().map(|(q, m)| (*q, m.as_slice()))
    }

    /// Schedule with every quarter from the first disclosure through
    /// `max(last disclosure, through)`, where an undisclosed quarter reuses
    /// the composition of the most recent earlier one.
    pub fn fill_gaps(&self, through: Option<Quarter>) -> Self {
        let (Some(first), Some(last)) = (self.first_quarter(), self.last_quarter()) else {
            return Self::default();
        };
        let end = through.map_or(last, |t| t.max(last));

        let mut quarters = BTreeMap::new();
        let mut current: &[WeightedConstituent] = &[];
        let mut q = first;
        while q <= end {
            if let Some(members) = self.quarters.get(&q) {
                current = members;
            }
            quarters.insert(q, current.to_vec());
            q = q.next();
        }
        Self { quarters }
    }

    /// Distinct constituent codes across every quarter, sorted.
    pub fn constituent_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self
            .quarters
            .values()
            .flatten()
            .map(|m| m.code.clone())
            .collect();
        codes.sort();
        codes.dedup();
        codes
    }
}
