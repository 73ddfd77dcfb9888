//! Exact solver: one 0/1 integer program per star option, best result wins.
//!
//! Doubling a score is not linear in the picks, so instead of modelling the star we
//! enumerate it. Every eligible free driver gets its own solve with that driver's score
//! doubled, plus one solve with no star at all. Feasibility is the same for every option
//! (only the objective changes), so the options are independent and solved in parallel.

use good_lp::{
    default_solver, variable, variables, Expression, ResolutionError, Solution, SolverModel,
    Variable,
};
use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;

use crate::data::candidate::FreePool;
use crate::optimizer::constraints::{ConstraintModel, LinearConstraint, FEASIBILITY_TOLERANCE};
use crate::optimizer::error::RosterError;
use crate::optimizer::star::{StarEligibility, StarOption};
use crate::parallel::WorkerPool;

/// Result of solving under one star assumption.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StarOutcome {
    pub option: StarOption,
    /// Free-pool indices picked, ascending.
    pub picks: Vec<usize>,
    /// Free-pool index of the starred pick. `None` for `NoStar`, or when the assumed star
    /// was not worth picking even with the bonus.
    pub starred: Option<usize>,
    /// Objective value: picked scores with the star counted twice.
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExactSolution {
    pub best: StarOutcome,
    /// The `NoStar` solve, used by reconciliation to try a committed entity as star.
    pub unstarred: Option<StarOutcome>,
    /// Every feasible outcome in star-option order.
    pub outcomes: Vec<StarOutcome>,
    pub infeasible_options: usize,
}

#[derive(Debug, Clone)]
pub struct ExactStarSolver {
    eligibility: StarEligibility,
    pool: WorkerPool,
}

impl ExactStarSolver {
    pub fn new(eligibility: StarEligibility) -> Self {
        Self {
            eligibility,
            pool: WorkerPool::default(),
        }
    }

    pub fn with_pool(self, pool: WorkerPool) -> Self {
        Self { pool, ..self }
    }

    /// `NoStar` followed by every star-eligible free driver in free-pool order.
    pub fn star_options(&self, free: &FreePool) -> Vec<StarOption> {
        std::iter::once(StarOption::NoStar)
            .chain(
                free.members()
                    .iter()
                    .enumerate()
                    .filter(|(_, candidate)| self.eligibility.is_eligible(candidate))
                    .map(|(index, _)| StarOption::Star(index)),
            )
            .collect()
    }

    pub fn solve(
        &self,
        free: &FreePool,
        model: &ConstraintModel,
    ) -> Result<ExactSolution, RosterError> {
        let options = self.star_options(free);
        info!(
            "exact solve: {} free candidate(s), {} star option(s)",
            free.len(),
            options.len()
        );

        let solved: Vec<Result<Option<StarOutcome>, RosterError>> = self.pool.install(|| {
            options
                .par_iter()
                .map(|option| solve_option(free, model, *option))
                .collect()
        });

        let mut outcomes = Vec::with_capacity(solved.len());
        for (option, result) in options.iter().zip(solved) {
            match result? {
                Some(outcome) => {
                    debug!("star option {option:?}: score {:.3}", outcome.score);
                    outcomes.push(outcome);
                }
                None => debug!("star option {option:?}: infeasible, dropped"),
            }
        }
        let infeasible_options = options.len() - outcomes.len();

        let best = select_best(&outcomes)
            .cloned()
            .ok_or(RosterError::NoFeasibleRoster {
                options: options.len(),
            })?;
        let unstarred = outcomes
            .iter()
            .find(|outcome| outcome.option == StarOption::NoStar)
            .cloned();
        info!(
            "exact solve: best option {:?} scores {:.3} ({} infeasible option(s))",
            best.option, best.score, infeasible_options
        );

        Ok(ExactSolution {
            best,
            unstarred,
            outcomes,
            infeasible_options,
        })
    }

    /// Budget/quota optimum with no score doubled.
    pub fn solve_without_star(
        &self,
        free: &FreePool,
        model: &ConstraintModel,
    ) -> Result<StarOutcome, RosterError> {
        solve_option(free, model, StarOption::NoStar)?
            .ok_or(RosterError::NoFeasibleRoster { options: 1 })
    }
}

/// Highest score wins. On an exact score tie the later option in declared order wins,
/// so any star beats `NoStar` and a higher free-pool index beats a lower one.
pub fn select_best(outcomes: &[StarOutcome]) -> Option<&StarOutcome> {
    outcomes.iter().max_by(|left, right| {
        left.score
            .total_cmp(&right.score)
            .then_with(|| left.option.cmp(&right.option))
    })
}

fn solve_option(
    free: &FreePool,
    model: &ConstraintModel,
    option: StarOption,
) -> Result<Option<StarOutcome>, RosterError> {
    let scores = option.scoring_vector(&free.scores());
    let Some(selection) = solve_binary_program(&scores, model)? else {
        return Ok(None);
    };

    let picks: Vec<usize> = selection
        .iter()
        .enumerate()
        .filter(|(_, picked)| **picked)
        .map(|(index, _)| index)
        .collect();
    let score = picks.iter().map(|&index| scores[index]).sum();
    let starred = option.index().filter(|index| selection[*index]);

    Ok(Some(StarOutcome {
        option,
        picks,
        starred,
        score,
    }))
}

/// Maximise `scores . x` over binary `x` subject to `model`. `Ok(None)` means infeasible.
fn solve_binary_program(
    scores: &[f64],
    model: &ConstraintModel,
) -> Result<Option<Vec<bool>>, RosterError> {
    if scores.len() != model.variable_count() {
        return Err(RosterError::Solver(format!(
            "{} score(s) for a model over {} variable(s)",
            scores.len(),
            model.variable_count()
        )));
    }
    // Rows without any variable are constant; decide them here rather than hand the
    // backend an empty expression.
    let (empty_rows, rows): (Vec<&LinearConstraint>, Vec<&LinearConstraint>) = model
        .constraints()
        .iter()
        .partition(|constraint| constraint.coefficients.iter().all(|c| *c == 0.0));
    let empty_selection = vec![false; scores.len()];
    if !empty_rows
        .iter()
        .all(|constraint| constraint.is_satisfied(&empty_selection))
    {
        return Ok(None);
    }
    if scores.is_empty() {
        return Ok(Some(Vec::new()));
    }

    let mut vars = variables!();
    let picks: Vec<Variable> = scores.iter().map(|_| vars.add(variable().binary())).collect();

    let mut objective = Expression::default();
    for (pick, score) in picks.iter().zip(scores) {
        objective.add_mul(*score, *pick);
    }

    let mut problem = vars.maximise(objective).using(default_solver);
    for constraint in rows {
        let mut row = Expression::default();
        for (pick, coefficient) in picks.iter().zip(&constraint.coefficients) {
            if *coefficient != 0.0 {
                row.add_mul(*coefficient, *pick);
            }
        }
        if constraint.lower == constraint.upper {
            problem = problem.with(row.eq(constraint.upper));
        } else {
            problem = problem
                .with(row.clone().geq(constraint.lower))
                .with(row.leq(constraint.upper));
        }
    }

    let solution = match problem.solve() {
        Ok(solution) => solution,
        Err(ResolutionError::Infeasible) => return Ok(None),
        Err(err) => return Err(RosterError::Solver(err.to_string())),
    };
    let selection: Vec<bool> = picks
        .iter()
        .map(|pick| solution.value(*pick) > 0.5)
        .collect();

    if !model.is_feasible(&selection) {
        return Err(RosterError::Solver(format!(
            "rounded solution breaks a constraint (tolerance {FEASIBILITY_TOLERANCE})"
        )));
    }
    Ok(Some(selection))
}
