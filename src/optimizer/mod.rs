pub mod constraints;
pub mod error;
pub mod exact;
pub mod ranking;
pub mod reconcile;
pub mod rng;
pub mod sampling;
pub mod star;

use log::info;
use serde::Serialize;

use crate::config::RosterConfig;
use crate::data::candidate::{CandidatePool, PoolPartition};
use crate::optimizer::constraints::ConstraintModel;
use crate::optimizer::error::RosterError;
use crate::optimizer::exact::{ExactSolution, ExactStarSolver};
use crate::optimizer::reconcile::{FreeChoice, Roster, StarReconciler};
use crate::optimizer::sampling::{SamplingSolution, SamplingSolver};

/// Which search fills the free slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum OptimizerStrategy {
    /// One integer program per star option; globally optimal.
    #[default]
    Exact,
    /// Random budget-feasible draws; best effort.
    Sampling,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationReport {
    pub strategy: OptimizerStrategy,
    pub roster: Roster,
    pub total_score: f64,
    pub total_cost: f64,
    /// Only for `Exact`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact: Option<ExactSolution>,
    /// Only for `Sampling`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampling: Option<SamplingSolution>,
}

#[derive(Debug, Clone)]
pub struct RosterScenario<'a> {
    pub pool: &'a CandidatePool,
    pub config: &'a RosterConfig,
    pub strategy: OptimizerStrategy,
    /// Sampling seed; ignored by the exact solver.
    pub seed: u64,
}

pub fn optimize_roster(scenario: &RosterScenario<'_>) -> Result<OptimizationReport, RosterError> {
    optimize_roster_with_progress(scenario, |_, _| {})
}

/// Pool -> partition -> constraint model -> solver -> reconciliation.
///
/// `on_progress(done, total)` fires per sampling batch; the exact path reports once.
pub fn optimize_roster_with_progress<F>(
    scenario: &RosterScenario<'_>,
    mut on_progress: F,
) -> Result<OptimizationReport, RosterError>
where
    F: FnMut(usize, usize),
{
    let config = scenario.config;
    let partition = scenario.pool.partition(config.targets(), config.budget);
    info!(
        "pool: {} candidate(s), {} committed, {} free; budget left {:.2}, quota {}/{} driver/team",
        scenario.pool.len(),
        partition.committed.len(),
        partition.free.len(),
        partition.remaining_budget,
        partition.remaining_quota.drivers,
        partition.remaining_quota.teams
    );
    let model = ConstraintModel::from_partition(&partition)?;
    let reconciler = StarReconciler::new(config.eligibility());

    let report = match scenario.strategy {
        OptimizerStrategy::Exact => {
            let solver =
                ExactStarSolver::new(config.eligibility()).with_pool(config.worker_pool());
            let solution = solver.solve(&partition.free, &model)?;
            on_progress(1, 1);
            let star = solution
                .best
                .starred
                .and_then(|index| partition.free.get(index))
                .map(|candidate| candidate.id);
            let roster = reconciler.reconcile(
                &partition,
                FreeChoice {
                    picks: &solution.best.picks,
                    star,
                },
                solution.unstarred.as_ref().map(|outcome| outcome.picks.as_slice()),
            )?;
            finish(scenario.strategy, roster, &partition, Some(solution), None)?
        }
        OptimizerStrategy::Sampling => {
            let solver = SamplingSolver::new(config.sampling(scenario.seed), config.eligibility())
                .with_pool(config.worker_pool());
            let solution = solver.solve_with_progress(&partition, &model, &mut on_progress)?;
            let best = solution.best().ok_or(RosterError::NoFeasibleRoster {
                options: config.trial_count,
            })?;
            let roster = reconciler.reconcile(
                &partition,
                FreeChoice {
                    picks: &best.picks,
                    star: best.star,
                },
                Some(&best.picks),
            )?;
            finish(scenario.strategy, roster, &partition, None, Some(solution))?
        }
    };

    info!(
        "roster: {} entries, score {:.3}, cost {:.2} of {:.2}",
        report.roster.entries.len(),
        report.total_score,
        report.total_cost,
        config.budget
    );
    Ok(report)
}

fn finish(
    strategy: OptimizerStrategy,
    roster: Roster,
    partition: &PoolPartition,
    exact: Option<ExactSolution>,
    sampling: Option<SamplingSolution>,
) -> Result<OptimizationReport, RosterError> {
    if let Some(missing) = partition
        .committed
        .iter()
        .find(|candidate| !roster.contains(candidate.id))
    {
        return Err(RosterError::Solver(format!(
            "final roster dropped committed entity {}",
            missing.name
        )));
    }
    if !roster.satisfies(partition.targets, partition.budget) {
        return Err(RosterError::Solver(format!(
            "final roster breaks quota or budget (cost {:.2} of {:.2})",
            roster.total_cost(),
            partition.budget
        )));
    }
    Ok(OptimizationReport {
        strategy,
        total_score: roster.total_score(),
        total_cost: roster.total_cost(),
        roster,
        exact,
        sampling,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::candidate::{Candidate, Category};

    fn config() -> RosterConfig {
        RosterConfig {
            budget: 40.0,
            driver_quota: 2,
            team_quota: 1,
            trial_count: 1_000,
            inclusion_threshold: 0.0,
            seed: Some(3),
            ..RosterConfig::default()
        }
    }

    fn pool() -> CandidatePool {
        CandidatePool::new(vec![
            Candidate::new(0, "Ace", Category::Driver, 10.0, 50.0),
            Candidate::new(1, "Bolt", Category::Driver, 12.0, 60.0),
            Candidate::new(2, "Crash", Category::Driver, 20.0, 80.0),
            Candidate::new(3, "Works", Category::Team, 15.0, 40.0),
        ])
    }

    #[test]
    fn both_strategies_reach_the_optimum_on_a_small_pool() {
        let pool = pool();
        let config = config();
        for strategy in [OptimizerStrategy::Exact, OptimizerStrategy::Sampling] {
            let report = optimize_roster(&RosterScenario {
                pool: &pool,
                config: &config,
                strategy,
                seed: 3,
            })
            .expect("feasible");
            assert!((report.total_score - 210.0).abs() < 1e-6, "{strategy:?}");
            assert_eq!(
                report.roster.starred().map(|entry| entry.name.as_str()),
                Some("Bolt")
            );
        }
    }

    #[test]
    fn over_committed_pool_is_an_infeasible_model() {
        let pool = CandidatePool::new(vec![
            Candidate::new(0, "Ace", Category::Driver, 10.0, 50.0).locked(),
            Candidate::new(1, "Bolt", Category::Driver, 12.0, 60.0).locked(),
            Candidate::new(2, "Crash", Category::Driver, 20.0, 80.0).forced(),
            Candidate::new(3, "Works", Category::Team, 15.0, 40.0),
        ]);
        let config = config();
        let err = optimize_roster(&RosterScenario {
            pool: &pool,
            config: &config,
            strategy: OptimizerStrategy::Exact,
            seed: 0,
        })
        .expect_err("three committed drivers for two slots");
        assert!(matches!(err, RosterError::InfeasibleModel { .. }));
    }

    #[test]
    fn progress_reports_reach_total() {
        let pool = pool();
        let config = config();
        let mut last = (0, 0);
        optimize_roster_with_progress(
            &RosterScenario {
                pool: &pool,
                config: &config,
                strategy: OptimizerStrategy::Sampling,
                seed: 3,
            },
            |done, total| last = (done, total),
        )
        .expect("feasible");
        assert_eq!(last, (1_000, 1_000));
    }
}
