//! Randomized roster search: many independent draws, each retried until it fits the
//! budget, scored with the star rule, kept if above the inclusion threshold.
//!
//! No optimality guarantee. Trials share only read-only inputs, so they run on the
//! Rayon pool with no locking; results are joined and filtered afterwards.

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::data::candidate::{Candidate, CandidateId, Category, PoolPartition};
use crate::optimizer::constraints::{ConstraintModel, FEASIBILITY_TOLERANCE};
use crate::optimizer::error::RosterError;
use crate::optimizer::ranking::rank_trials;
use crate::optimizer::rng::Rng;
use crate::optimizer::star::{starred_total, StarEligibility};
use crate::parallel::{batch_ranges, PoolSession, WorkerPool};

/// Number of progress-reporting batches for [SamplingSolver::solve_with_progress].
const SAMPLING_PROGRESS_BATCH_COUNT: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingConfig {
    pub trial_count: usize,
    /// Trials scoring at or below this are discarded.
    pub inclusion_threshold: f64,
    /// Redraws allowed after the first over-budget draw.
    pub max_retries: usize,
    pub seed: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            trial_count: 10_000,
            inclusion_threshold: 700.0,
            max_retries: 100,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialOutcome {
    pub trial: usize,
    /// Free-pool indices drawn, ascending.
    pub picks: Vec<usize>,
    /// Starred entity across the whole trial roster (free picks and committed).
    pub star: Option<CandidateId>,
    pub points: f64,
    pub cost: f64,
    /// Draws used, including the accepted one.
    pub attempts: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrialStats {
    pub retained: usize,
    pub below_threshold: usize,
    pub retry_exhausted: usize,
    pub ambiguous_star: usize,
}

impl TrialStats {
    pub fn total(&self) -> usize {
        self.retained + self.below_threshold + self.retry_exhausted + self.ambiguous_star
    }

    fn merge(&mut self, other: TrialStats) {
        self.retained += other.retained;
        self.below_threshold += other.below_threshold;
        self.retry_exhausted += other.retry_exhausted;
        self.ambiguous_star += other.ambiguous_star;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SamplingSolution {
    /// Retained trials, best first.
    pub retained: Vec<TrialOutcome>,
    pub stats: TrialStats,
}

impl SamplingSolution {
    pub fn best(&self) -> Option<&TrialOutcome> {
        self.retained.first()
    }
}

/// Read-only inputs every trial works from.
struct TrialPlan<'a> {
    partition: &'a PoolPartition,
    drivers: Vec<usize>,
    teams: Vec<usize>,
    driver_quota: usize,
    team_quota: usize,
    budget_cap: f64,
}

#[derive(Debug, Clone)]
pub struct SamplingSolver {
    config: SamplingConfig,
    eligibility: StarEligibility,
    pool: WorkerPool,
}

impl SamplingSolver {
    pub fn new(config: SamplingConfig, eligibility: StarEligibility) -> Self {
        Self {
            config,
            eligibility,
            pool: WorkerPool::default(),
        }
    }

    pub fn with_pool(self, pool: WorkerPool) -> Self {
        Self { pool, ..self }
    }

    pub fn solve(
        &self,
        partition: &PoolPartition,
        model: &ConstraintModel,
    ) -> Result<SamplingSolution, RosterError> {
        self.solve_with_progress(partition, model, |_, _| {})
    }

    /// Like [solve](Self::solve) but runs trials in batches and calls
    /// `on_progress(done, total)` after each one.
    pub fn solve_with_progress<F>(
        &self,
        partition: &PoolPartition,
        model: &ConstraintModel,
        mut on_progress: F,
    ) -> Result<SamplingSolution, RosterError>
    where
        F: FnMut(usize, usize),
    {
        let plan = self.plan(partition, model)?;
        let total = self.config.trial_count;
        on_progress(0, total);

        let session = self.pool.session();
        let mut retained = Vec::new();
        let mut stats = TrialStats::default();
        for range in batch_ranges(total, SAMPLING_PROGRESS_BATCH_COUNT) {
            let done = range.end;
            let (batch, batch_stats) = self.run_trials(&plan, range, Some(&session));
            retained.extend(batch);
            stats.merge(batch_stats);
            on_progress(done, total);
        }
        self.finish(retained, stats)
    }

    /// Single-threaded run over the same trial stream; results match the parallel path.
    pub fn solve_sequential(
        &self,
        partition: &PoolPartition,
        model: &ConstraintModel,
    ) -> Result<SamplingSolution, RosterError> {
        let plan = self.plan(partition, model)?;
        let (retained, stats) = self.run_trials(&plan, 0..self.config.trial_count, None);
        self.finish(retained, stats)
    }

    /// Run one trial. `RetryExhausted` and `AmbiguousStar` mean the trial is dropped.
    pub fn run_trial(
        &self,
        partition: &PoolPartition,
        model: &ConstraintModel,
        trial: usize,
    ) -> Result<TrialOutcome, RosterError> {
        let plan = self.plan(partition, model)?;
        self.trial(&plan, trial)
    }

    fn plan<'a>(
        &self,
        partition: &'a PoolPartition,
        model: &ConstraintModel,
    ) -> Result<TrialPlan<'a>, RosterError> {
        let plan = TrialPlan {
            partition,
            drivers: partition.free.indices_in(Category::Driver),
            teams: partition.free.indices_in(Category::Team),
            driver_quota: model.category_quota(Category::Driver),
            team_quota: model.category_quota(Category::Team),
            budget_cap: model.budget_cap(),
        };
        if plan.drivers.len() < plan.driver_quota || plan.teams.len() < plan.team_quota {
            warn!(
                "sampling: need {} driver(s) and {} team(s) but only {} and {} are free",
                plan.driver_quota,
                plan.team_quota,
                plan.drivers.len(),
                plan.teams.len()
            );
            return Err(RosterError::NoFeasibleRoster {
                options: self.config.trial_count,
            });
        }
        Ok(plan)
    }

    fn run_trials(
        &self,
        plan: &TrialPlan<'_>,
        trials: std::ops::Range<usize>,
        session: Option<&PoolSession>,
    ) -> (Vec<TrialOutcome>, TrialStats) {
        let results: Vec<Result<TrialOutcome, RosterError>> = match session {
            Some(session) => session
                .install(|| trials.into_par_iter().map(|trial| self.trial(plan, trial)).collect()),
            None => trials.map(|trial| self.trial(plan, trial)).collect(),
        };

        let mut retained = Vec::new();
        let mut stats = TrialStats::default();
        for result in results {
            match result {
                Ok(outcome) if outcome.points > self.config.inclusion_threshold => {
                    stats.retained += 1;
                    retained.push(outcome);
                }
                Ok(_) => stats.below_threshold += 1,
                Err(err) if err.is_trial_local() => {
                    debug!("sampling: dropping trial: {err}");
                    match err {
                        RosterError::RetryExhausted { .. } => stats.retry_exhausted += 1,
                        _ => stats.ambiguous_star += 1,
                    }
                }
                Err(err) => warn!("sampling: unexpected trial failure: {err}"),
            }
        }
        (retained, stats)
    }

    fn finish(
        &self,
        retained: Vec<TrialOutcome>,
        stats: TrialStats,
    ) -> Result<SamplingSolution, RosterError> {
        info!(
            "sampling: {} trial(s): {} retained, {} below threshold, {} over budget, {} ambiguous",
            stats.total(),
            stats.retained,
            stats.below_threshold,
            stats.retry_exhausted,
            stats.ambiguous_star
        );
        if stats.retry_exhausted > 0 && stats.retry_exhausted == stats.total() {
            warn!("sampling: every trial exhausted its retries; budget may be too tight");
        }
        if retained.is_empty() {
            return Err(RosterError::NoFeasibleRoster {
                options: self.config.trial_count,
            });
        }
        Ok(SamplingSolution {
            retained: rank_trials(retained),
            stats,
        })
    }

    fn trial(&self, plan: &TrialPlan<'_>, trial: usize) -> Result<TrialOutcome, RosterError> {
        let free = &plan.partition.free;
        let mut rng = Rng::for_trial(self.config.seed, trial);
        let max_attempts = self.config.max_retries + 1;

        let mut accepted = None;
        for attempt in 1..=max_attempts {
            let mut picks = rng.sample(&plan.drivers, plan.driver_quota);
            picks.extend(rng.sample(&plan.teams, plan.team_quota));
            let cost: f64 = picks
                .iter()
                .filter_map(|&index| free.get(index))
                .map(|candidate| candidate.cost)
                .sum();
            if cost <= plan.budget_cap + FEASIBILITY_TOLERANCE {
                accepted = Some((picks, cost, attempt));
                break;
            }
        }
        let Some((mut picks, cost, attempts)) = accepted else {
            return Err(RosterError::RetryExhausted {
                attempts: max_attempts,
            });
        };
        picks.sort_unstable();

        let roster: Vec<&Candidate> = picks
            .iter()
            .filter_map(|&index| free.get(index))
            .chain(plan.partition.committed.iter())
            .collect();
        let star = self.eligibility.select_star(roster.iter().copied())?;
        let points = starred_total(roster.iter().copied(), star);

        Ok(TrialOutcome {
            trial,
            picks,
            star: star.map(|candidate| candidate.id),
            points,
            cost: cost + plan.partition.committed.iter().map(|c| c.cost).sum::<f64>(),
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::candidate::{CandidatePool, CategoryCounts};

    fn pool() -> CandidatePool {
        CandidatePool::new(vec![
            Candidate::new(0, "Ace", Category::Driver, 10.0, 50.0),
            Candidate::new(1, "Bolt", Category::Driver, 12.0, 60.0),
            Candidate::new(2, "Crash", Category::Driver, 20.0, 80.0),
            Candidate::new(3, "Dash", Category::Driver, 25.0, 90.0),
            Candidate::new(4, "Works", Category::Team, 15.0, 40.0),
            Candidate::new(5, "Privateer", Category::Team, 5.0, 10.0),
        ])
    }

    fn solver(trials: usize, threshold: f64, seed: u64) -> SamplingSolver {
        SamplingSolver::new(
            SamplingConfig {
                trial_count: trials,
                inclusion_threshold: threshold,
                max_retries: 100,
                seed,
            },
            StarEligibility::new(15.0),
        )
    }

    #[test]
    fn retained_trials_respect_budget_and_quotas() {
        let partition = pool().partition(CategoryCounts::new(2, 1), 40.0);
        let model = ConstraintModel::from_partition(&partition).expect("model");
        let solution = solver(500, 0.0, 9).solve(&partition, &model).expect("some trials fit");

        assert!(!solution.retained.is_empty());
        for trial in &solution.retained {
            assert!(trial.cost <= 40.0 + 1e-9, "trial {} costs {}", trial.trial, trial.cost);
            let selection: Vec<bool> = (0..partition.free.len())
                .map(|index| trial.picks.contains(&index))
                .collect();
            assert!(model.is_feasible(&selection));
        }
        assert_eq!(solution.stats.total(), 500);
    }

    #[test]
    fn best_trial_matches_known_optimum_with_enough_draws() {
        let partition = pool().partition(CategoryCounts::new(2, 1), 40.0);
        let model = ConstraintModel::from_partition(&partition).expect("model");
        let solution = solver(2_000, 0.0, 1).solve(&partition, &model).expect("feasible");
        let best = solution.best().expect("retained");
        // Ace + Bolt + Works, Bolt starred.
        assert!((best.points - 210.0).abs() < 1e-9);
        assert_eq!(best.star, Some(CandidateId(1)));
    }

    #[test]
    fn parallel_and_sequential_runs_agree() {
        let partition = pool().partition(CategoryCounts::new(2, 1), 45.0);
        let model = ConstraintModel::from_partition(&partition).expect("model");
        let solver = solver(300, 100.0, 42);
        let parallel = solver.solve(&partition, &model).expect("parallel");
        let sequential = solver.solve_sequential(&partition, &model).expect("sequential");
        assert_eq!(parallel.retained, sequential.retained);
        assert_eq!(parallel.stats, sequential.stats);
    }

    #[test]
    fn dedicated_pool_runs_every_batch_and_matches_sequential() {
        let partition = pool().partition(CategoryCounts::new(2, 1), 45.0);
        let model = ConstraintModel::from_partition(&partition).expect("model");
        let solver = solver(1_000, 100.0, 8).with_pool(WorkerPool::with_workers(2));
        let mut reports = Vec::new();
        let pooled = solver
            .solve_with_progress(&partition, &model, |done, total| reports.push((done, total)))
            .expect("pooled");
        let sequential = solver.solve_sequential(&partition, &model).expect("sequential");

        assert_eq!(reports.len(), SAMPLING_PROGRESS_BATCH_COUNT + 1);
        assert_eq!(reports.last(), Some(&(1_000, 1_000)));
        assert_eq!(pooled.retained, sequential.retained);
    }

    #[test]
    fn threshold_filters_low_scores() {
        let partition = pool().partition(CategoryCounts::new(2, 1), 100.0);
        let model = ConstraintModel::from_partition(&partition).expect("model");
        let solution = solver(400, 200.0, 5).solve(&partition, &model).expect("retained");
        assert!(solution.retained.iter().all(|trial| trial.points > 200.0));
        assert!(solution.stats.below_threshold > 0);
    }

    #[test]
    fn impossible_budget_exhausts_retries() {
        let partition = pool().partition(CategoryCounts::new(2, 1), 20.0);
        let model = ConstraintModel::from_partition(&partition).expect("model");
        let solver = solver(10, 0.0, 3);
        let err = solver
            .run_trial(&partition, &model, 0)
            .expect_err("cheapest roster costs 27");
        assert_eq!(err, RosterError::RetryExhausted { attempts: 101 });

        let err = solver.solve(&partition, &model).expect_err("nothing retained");
        assert!(matches!(err, RosterError::NoFeasibleRoster { .. }));
    }

    #[test]
    fn tied_star_candidates_drop_the_trial() {
        let pool = CandidatePool::new(vec![
            Candidate::new(0, "Twin A", Category::Driver, 10.0, 60.0),
            Candidate::new(1, "Twin B", Category::Driver, 10.0, 60.0),
            Candidate::new(2, "Works", Category::Team, 15.0, 40.0),
        ]);
        let partition = pool.partition(CategoryCounts::new(2, 1), 100.0);
        let model = ConstraintModel::from_partition(&partition).expect("model");
        let solver = solver(20, 0.0, 8);
        let err = solver.run_trial(&partition, &model, 0).expect_err("twins tie");
        assert!(matches!(err, RosterError::AmbiguousStar { .. }));

        let err = solver.solve(&partition, &model).expect_err("every trial ties");
        assert!(matches!(err, RosterError::NoFeasibleRoster { .. }));
    }

    #[test]
    fn committed_entities_join_every_trial_and_can_be_starred() {
        let pool = CandidatePool::new(vec![
            Candidate::new(0, "Ace", Category::Driver, 10.0, 50.0),
            Candidate::new(1, "Rookie", Category::Driver, 5.0, 70.0).locked(),
            Candidate::new(2, "Crash", Category::Driver, 20.0, 80.0),
            Candidate::new(3, "Works", Category::Team, 15.0, 40.0),
        ]);
        let partition = pool.partition(CategoryCounts::new(2, 1), 40.0);
        let model = ConstraintModel::from_partition(&partition).expect("model");
        let solution = solver(200, 0.0, 2).solve(&partition, &model).expect("feasible");
        let best = solution.best().expect("retained");
        assert_eq!(best.star, Some(CandidateId(1)));
        // Rookie doubled + Crash + Works.
        assert!((best.points - 260.0).abs() < 1e-9);
        assert!((best.cost - 40.0).abs() < 1e-9);
    }

    #[test]
    fn missing_free_members_is_rejected_up_front() {
        let partition = pool().partition(CategoryCounts::new(5, 1), 500.0);
        let model = ConstraintModel::from_partition(&partition).expect("model");
        let err = solver(10, 0.0, 1).solve(&partition, &model).expect_err("only 4 drivers");
        assert!(matches!(err, RosterError::NoFeasibleRoster { .. }));
    }
}
