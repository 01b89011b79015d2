//! Change detection between a candidate allocation set and the
//! last-confirmed baseline. Comparison is by category id, never by position,
//! and ignores display metadata.

use crate::types::AllocationSet;
use serde::{Deserialize, Serialize};

/// True iff submitting `candidate` would change anything relative to
/// `baseline`: a shared id with a different percentage, or an id present on
/// one side only with a nonzero percentage.
pub fn has_changes(candidate: &AllocationSet, baseline: &AllocationSet) -> bool {
    for a in candidate.iter() {
        match baseline.get(&a.id) {
            Some(b) => {
                if b.percentage != a.percentage {
                    return true;
                }
            }
            None => {
                if a.percentage != 0 {
                    return true;
                }
            }
        }
    }
    baseline
        .iter()
        .any(|b| candidate.get(&b.id).is_none() && b.percentage != 0)
}

/// Per-category delta shown in the rebalance summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationDelta {
    pub id: String,
    pub name: String,
    pub from: u32,
    pub to: u32,
}

/// Deltas for every candidate entry whose percentage differs from the
/// baseline (categories new to the candidate count from 0).
pub fn diff(candidate: &AllocationSet, baseline: &AllocationSet) -> Vec<AllocationDelta> {
    candidate
        .iter()
        .filter_map(|a| {
            let from = baseline.get(&a.id).map(|b| b.percentage).unwrap_or(0);
            (from != a.percentage).then(|| AllocationDelta {
                id: a.id.clone(),
                name: a.name.clone(),
                from,
                to: a.percentage,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Allocation, AllocationSet};

    fn set(entries: &[(&str, u32)]) -> AllocationSet {
        AllocationSet::new(
            entries
                .iter()
                .map(|(id, pct)| Allocation::new(*id, *id, *pct))
                .collect(),
        )
    }

    #[test]
    fn test_identical_sets_have_no_changes() {
        let a = set(&[("ai", 15), ("meme", 10)]);
        assert!(!has_changes(&a, &a.clone()));
    }

    #[test]
    fn test_percentage_difference_detected() {
        let a = set(&[("ai", 15), ("meme", 10)]);
        let b = set(&[("ai", 20), ("meme", 10)]);
        assert!(has_changes(&a, &b));
    }

    #[test]
    fn test_order_is_irrelevant() {
        let a = set(&[("ai", 15), ("meme", 10)]);
        let b = set(&[("meme", 10), ("ai", 15)]);
        assert!(!has_changes(&a, &b));
    }

    #[test]
    fn test_display_name_is_ignored() {
        let a = set(&[("ai", 15)]);
        let mut b = a.clone();
        b.entries[0].name = "renamed".into();
        assert!(!has_changes(&a, &b));
    }

    #[test]
    fn test_missing_id_with_nonzero_percentage_is_a_change() {
        let a = set(&[("ai", 15), ("meme", 10)]);
        let b = set(&[("ai", 15)]);
        assert!(has_changes(&a, &b));
        assert!(has_changes(&b, &a));
    }

    #[test]
    fn test_missing_id_with_zero_percentage_is_not_a_change() {
        let a = set(&[("ai", 15), ("meme", 0)]);
        let b = set(&[("ai", 15)]);
        assert!(!has_changes(&a, &b));
        assert!(!has_changes(&b, &a));
    }

    #[test]
    fn test_symmetry() {
        let a = set(&[("ai", 15), ("meme", 10), ("l1", 20)]);
        let b = set(&[("ai", 10), ("meme", 10), ("l1", 25)]);
        assert_eq!(has_changes(&a, &b), has_changes(&b, &a));
    }

    #[test]
    fn test_diff_reports_each_changed_category() {
        let baseline = set(&[("ai", 15), ("meme", 10), ("l1", 15)]);
        let candidate = set(&[("ai", 15), ("meme", 5), ("l1", 20)]);

        let deltas = diff(&candidate, &baseline);
        assert_eq!(deltas.len(), 2);
        assert!(deltas.contains(&AllocationDelta {
            id: "meme".into(),
            name: "meme".into(),
            from: 10,
            to: 5,
        }));
        assert!(deltas.contains(&AllocationDelta {
            id: "l1".into(),
            name: "l1".into(),
            from: 15,
            to: 20,
        }));
    }
}
