//! Reduce ranked collections to Top-N plus "Others".
//!
//! A community of thousands of holders cannot be displayed individually, so
//! every listed collection goes through this reducer.

use log::debug;
use std::cmp::Ordering;

use crate::model::{Rankable, RankedBucket};

/// Deterministic ranking order
///
/// USD value descending, then amount descending, then label ascending.
pub fn rank_order<T: Rankable>(a: &T, b: &T) -> Ordering {
    b.usd_value()
        .total_cmp(&a.usd_value())
        .then_with(|| b.amount().total_cmp(&a.amount()))
        .then_with(|| a.label().cmp(b.label()))
}

/// Reduce a collection to its top N entries plus an "Others" remainder
///
/// **Public** - main entry point for ranking
///
/// # Arguments
/// * `entries` - Entries to rank (any order)
/// * `top_n` - Number of entries to keep verbatim
///
/// # Returns
/// Bucket whose `others_*` fields are the exact sum of the entries not kept.
/// When `entries.len() <= top_n` the remainder is zero-valued.
pub fn reduce_top_n<T: Rankable>(mut entries: Vec<T>, top_n: usize) -> RankedBucket<T> {
    debug!("Reducing {} entries to top {}", entries.len(), top_n);

    entries.sort_by(rank_order);

    let cut = top_n.min(entries.len());
    let tail = entries.split_off(cut);

    RankedBucket {
        top_entries: entries,
        others_count: tail.len(),
        others_amount: tail.iter().map(|e| e.amount()).sum(),
        others_usd: tail.iter().map(|e| e.usd_value()).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RankedEntry;

    fn entries(amounts: &[f64]) -> Vec<RankedEntry> {
        amounts
            .iter()
            .enumerate()
            .map(|(i, a)| RankedEntry::new(format!("e{}", i), *a, *a))
            .collect()
    }

    #[test]
    fn test_top_two_of_four() {
        let bucket = reduce_top_n(entries(&[50.0, 30.0, 10.0, 5.0]), 2);

        let top: Vec<f64> = bucket.top_entries.iter().map(|e| e.amount).collect();
        assert_eq!(top, vec![50.0, 30.0]);
        assert_eq!(bucket.others_count, 2);
        assert_eq!(bucket.others_amount, 15.0);
        assert_eq!(bucket.others_usd, 15.0);
    }

    #[test]
    fn test_fewer_entries_than_n() {
        let bucket = reduce_top_n(entries(&[3.0, 9.0]), 15);

        assert_eq!(bucket.top_entries.len(), 2);
        assert_eq!(bucket.top_entries[0].amount, 9.0);
        assert_eq!(bucket.others_count, 0);
        assert_eq!(bucket.others_amount, 0.0);
    }

    #[test]
    fn test_closure_over_unsorted_input() {
        let amounts = [4.0, 17.5, 0.25, 8.0, 8.0, 1.0, 12.0];
        let total: f64 = amounts.iter().sum();

        for n in 0..=amounts.len() + 1 {
            let bucket = reduce_top_n(entries(&amounts), n);
            assert_eq!(bucket.top_entries.len(), n.min(amounts.len()));
            assert_eq!(bucket.others_count, amounts.len().saturating_sub(n));
            assert!((bucket.total_amount() - total).abs() < 1e-9);
        }
    }

    #[test]
    fn test_tie_breaks() {
        let bucket = reduce_top_n(
            vec![
                RankedEntry::new("b", 5.0, 10.0),
                RankedEntry::new("a", 5.0, 10.0),
                RankedEntry::new("c", 7.0, 10.0),
                RankedEntry::new("d", 1.0, 20.0),
            ],
            4,
        );

        let labels: Vec<&str> = bucket.top_entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["d", "c", "a", "b"]);
    }
}
