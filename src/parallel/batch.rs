//! Progress batches over a run of independent trials.

use std::ops::Range;

/// Split trials `0..total` into at most `num_batches` contiguous ranges whose sizes differ
/// by at most one, larger ones first.
///
/// ```
/// # use gridpick::parallel::batch_ranges;
/// assert_eq!(batch_ranges(10, 3), vec![0..4, 4..7, 7..10]);
/// ```
pub fn batch_ranges(total: usize, num_batches: usize) -> Vec<Range<usize>> {
    let batches = num_batches.min(total);
    if batches == 0 {
        return Vec::new();
    }
    let (base, remainder) = (total / batches, total % batches);
    (0..batches)
        .scan(0, |start, batch| {
            let end = *start + base + usize::from(batch < remainder);
            let range = *start..end;
            *start = end;
            Some(range)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_trial_count_splits_evenly() {
        let ranges = batch_ranges(10_000, 40);
        assert_eq!(ranges.len(), 40);
        assert!(ranges.iter().all(|range| range.len() == 250));
        assert_eq!(ranges.last().map(|range| range.end), Some(10_000));
    }

    #[test]
    fn every_trial_lands_in_exactly_one_batch() {
        let ranges = batch_ranges(1_003, 40);
        let covered: Vec<usize> = ranges.into_iter().flatten().collect();
        assert_eq!(covered, (0..1_003).collect::<Vec<_>>());
    }

    #[test]
    fn fewer_trials_than_batches() {
        assert_eq!(batch_ranges(3, 40), vec![0..1, 1..2, 2..3]);
    }

    #[test]
    fn nothing_to_split() {
        assert!(batch_ranges(0, 40).is_empty());
        assert!(batch_ranges(25, 0).is_empty());
    }
}
