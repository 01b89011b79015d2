//! Auto-balancing: redistribute percentages so a set sums to exactly 100
//! without touching categories the caller has locked (typically the ones an
//! advisor suggestion pinned).

use crate::types::AllocationSet;

/// Redistribute so the set sums to exactly 100.
///
/// Locked entries keep their input percentage. The shortfall or excess is
/// spread evenly over the unlocked entries with a nonzero percentage,
/// rounded to the nearest integer and clamped to 0..=100; any rounding
/// residue lands on the largest adjustable entry. If nothing is adjustable,
/// the single largest entry of the whole set absorbs the difference.
///
/// A set already summing to 100 is returned unchanged.
pub fn auto_balance(set: &AllocationSet, locked: &[String]) -> AllocationSet {
    let current_total = set.total() as i64;
    if current_total == 100 {
        return set.clone();
    }

    let mut balanced = set.clone();

    let adjustable: Vec<String> = set
        .iter()
        .filter(|a| !locked.iter().any(|l| l == &a.id) && a.percentage > 0)
        .map(|a| a.id.clone())
        .collect();

    if adjustable.is_empty() {
        if let Some(largest) = largest_entry_id(set, None)
            && let Some(entry) = balanced.entries.iter_mut().find(|a| a.id == largest)
        {
            entry.percentage = clamp_pct(entry.percentage as i64 + (100 - current_total));
        }
        return balanced;
    }

    let per_entry = (100 - current_total) as f64 / adjustable.len() as f64;
    for entry in balanced.entries.iter_mut() {
        if adjustable.iter().any(|id| id == &entry.id) {
            entry.percentage = clamp_pct((entry.percentage as f64 + per_entry).round() as i64);
        }
    }

    // Rounding can leave the total a point or two off; push the residue onto
    // the largest adjustable entry (ranked by its pre-adjustment percentage).
    let new_total = balanced.total() as i64;
    if new_total != 100
        && let Some(largest) = largest_entry_id(set, Some(&adjustable))
        && let Some(entry) = balanced.entries.iter_mut().find(|a| a.id == largest)
    {
        entry.percentage = (entry.percentage as i64 + (100 - new_total)).max(0) as u32;
    }

    balanced
}

/// Id of the entry with the highest percentage, optionally restricted to a
/// subset of ids. First occurrence wins ties.
fn largest_entry_id(set: &AllocationSet, among: Option<&[String]>) -> Option<String> {
    set.iter()
        .filter(|a| match among {
            Some(ids) => ids.iter().any(|id| id == &a.id),
            None => true,
        })
        .fold(None::<&crate::types::Allocation>, |best, a| match best {
            Some(b) if b.percentage >= a.percentage => Some(b),
            _ => Some(a),
        })
        .map(|a| a.id.clone())
}

fn clamp_pct(value: i64) -> u32 {
    value.clamp(0, 100) as u32
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

    fn locked(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_already_balanced_is_untouched() {
        let input = set(&[("a", 60), ("b", 40)]);
        assert_eq!(auto_balance(&input, &[]), input);
    }

    #[test]
    fn test_sum_invariant_over_allocation() {
        // 110% total, nothing locked: both shrink, residue lands on the
        // largest, and neither ends above its input value.
        let input = set(&[("a", 50), ("b", 60)]);
        let balanced = auto_balance(&input, &[]);

        assert_eq!(balanced.total(), 100);
        assert!(balanced.get("a").unwrap().percentage <= 50);
        assert!(balanced.get("b").unwrap().percentage <= 60);
    }

    #[test]
    fn test_sum_invariant_under_allocation() {
        let input = set(&[("a", 10), ("b", 20), ("c", 30)]);
        let balanced = auto_balance(&input, &[]);
        assert_eq!(balanced.total(), 100);
    }

    #[test]
    fn test_locked_entries_preserved() {
        let input = set(&[("ai", 15), ("meme", 5), ("l1", 20), ("defi", 40)]);
        let balanced = auto_balance(&input, &locked(&["l1", "meme"]));

        assert_eq!(balanced.total(), 100);
        assert_eq!(balanced.get("l1").unwrap().percentage, 20);
        assert_eq!(balanced.get("meme").unwrap().percentage, 5);
    }

    #[test]
    fn test_advisor_scenario_already_100_unchanged() {
        // l1 bumped 15→20 and meme cut 10→5 by a suggestion; the set still
        // sums to 100 so nothing else moves.
        let input = set(&[
            ("ai", 15),
            ("meme", 5),
            ("rwa", 15),
            ("bigcap", 25),
            ("defi", 15),
            ("l1", 20),
            ("stablecoin", 5),
        ]);
        let balanced = auto_balance(&input, &locked(&["l1", "meme"]));

        assert_eq!(balanced, input);
        assert_eq!(balanced.total(), 100);
    }

    #[test]
    fn test_no_adjustable_falls_back_to_largest() {
        let input = set(&[("a", 30), ("b", 50)]);
        let balanced = auto_balance(&input, &locked(&["a", "b"]));

        assert_eq!(balanced.total(), 100);
        assert_eq!(balanced.get("a").unwrap().percentage, 30);
        assert_eq!(balanced.get("b").unwrap().percentage, 70);
    }

    #[test]
    fn test_all_zero_adjustable_falls_back_to_largest() {
        let input = set(&[("a", 0), ("b", 0)]);
        let balanced = auto_balance(&input, &[]);

        assert_eq!(balanced.total(), 100);
        assert_eq!(balanced.get("a").unwrap().percentage, 100);
    }

    #[test]
    fn test_single_entry_forced_to_100() {
        let balanced = auto_balance(&set(&[("only", 40)]), &[]);
        assert_eq!(balanced.get("only").unwrap().percentage, 100);
    }

    #[test]
    fn test_rounding_residue_lands_on_largest_adjustable() {
        // diff = -1 over three adjustable entries: per-entry share rounds
        // away, the residue must still bring the total back to exactly 100.
        let input = set(&[("a", 33), ("b", 34), ("c", 34)]);
        let balanced = auto_balance(&input, &[]);
        assert_eq!(balanced.total(), 100);
    }

    #[test]
    fn test_locked_zero_entry_stays_zero() {
        let input = set(&[("a", 0), ("b", 80)]);
        let balanced = auto_balance(&input, &locked(&["a"]));

        assert_eq!(balanced.total(), 100);
        assert_eq!(balanced.get("a").unwrap().percentage, 0);
        assert_eq!(balanced.get("b").unwrap().percentage, 100);
    }
}
