use crate::optimizer::sampling::TrialOutcome;

/// Order retained trials best first: points descending, then later trials first.
pub fn rank_trials(mut trials: Vec<TrialOutcome>) -> Vec<TrialOutcome> {
    trials.sort_by(|left, right| {
        right
            .points
            .total_cmp(&left.points)
            .then_with(|| right.trial.cmp(&left.trial))
    });
    trials
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial(trial: usize, points: f64) -> TrialOutcome {
        TrialOutcome {
            trial,
            picks: Vec::new(),
            star: None,
            points,
            cost: 0.0,
            attempts: 1,
        }
    }

    #[test]
    fn ranks_by_points_then_trial_index() {
        let ranked = rank_trials(vec![
            trial(0, 10.0),
            trial(1, 30.0),
            trial(2, 30.0),
            trial(3, 20.0),
        ]);
        let order: Vec<usize> = ranked.iter().map(|t| t.trial).collect();
        assert_eq!(order, vec![2, 1, 3, 0]);
    }
}
