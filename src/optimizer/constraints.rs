//! Linear constraints over the free pool: one budget row plus one count row per
//! category that still needs picks.

use serde::Serialize;

use crate::data::candidate::{Candidate, Category, CategoryCounts, FreePool, PoolPartition};
use crate::optimizer::error::RosterError;

/// Slack allowed when checking float activities against bounds.
pub const FEASIBILITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConstraintKind {
    Budget,
    CategoryCount(Category),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearConstraint {
    pub kind: ConstraintKind,
    /// One coefficient per free-pool member, in free-pool order.
    pub coefficients: Vec<f64>,
    pub lower: f64,
    pub upper: f64,
}

impl LinearConstraint {
    pub fn activity(&self, selection: &[bool]) -> f64 {
        self.coefficients
            .iter()
            .zip(selection)
            .filter(|(_, picked)| **picked)
            .map(|(coefficient, _)| coefficient)
            .sum()
    }

    pub fn is_satisfied(&self, selection: &[bool]) -> bool {
        let activity = self.activity(selection);
        activity >= self.lower - FEASIBILITY_TOLERANCE
            && activity <= self.upper + FEASIBILITY_TOLERANCE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintModel {
    constraints: Vec<LinearConstraint>,
    variable_count: usize,
}

impl ConstraintModel {
    /// Build the model for `free`.
    ///
    /// Category rows are equalities: the roster must hit each quota exactly. A category
    /// with quota zero gets no row, and the free pool must already be empty of it.
    pub fn build(
        free: &FreePool,
        remaining_budget: f64,
        quota: CategoryCounts,
    ) -> Result<Self, RosterError> {
        if !remaining_budget.is_finite() || remaining_budget < 0.0 {
            return Err(RosterError::infeasible_model(format!(
                "remaining budget {remaining_budget} is negative after committed entities"
            )));
        }
        for category in Category::ALL {
            let needed = quota.get(category);
            if needed < 0 {
                return Err(RosterError::infeasible_model(format!(
                    "committed {category}s exceed the quota by {}",
                    -needed
                )));
            }
        }

        free.members().iter().try_for_each(ensure_finite)?;

        let mut constraints = Vec::with_capacity(1 + Category::ALL.len());
        constraints.push(LinearConstraint {
            kind: ConstraintKind::Budget,
            coefficients: free.costs(),
            lower: 0.0,
            upper: remaining_budget,
        });

        for category in Category::ALL {
            let needed = quota.get(category);
            let members = free.indices_in(category);
            if needed == 0 {
                if !members.is_empty() {
                    return Err(RosterError::infeasible_model(format!(
                        "free pool still holds {} {category}(s) with no {category} quota left",
                        members.len()
                    )));
                }
                continue;
            }
            let mut coefficients = vec![0.0; free.len()];
            for index in members {
                coefficients[index] = 1.0;
            }
            constraints.push(LinearConstraint {
                kind: ConstraintKind::CategoryCount(category),
                coefficients,
                lower: needed as f64,
                upper: needed as f64,
            });
        }

        Ok(Self {
            constraints,
            variable_count: free.len(),
        })
    }

    /// Committed entities are checked too: their scores still reach the star rule.
    pub fn from_partition(partition: &PoolPartition) -> Result<Self, RosterError> {
        partition.committed.iter().try_for_each(ensure_finite)?;
        Self::build(
            &partition.free,
            partition.remaining_budget,
            partition.remaining_quota,
        )
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn variable_count(&self) -> usize {
        self.variable_count
    }

    pub fn budget_cap(&self) -> f64 {
        self.constraints
            .iter()
            .find(|constraint| constraint.kind == ConstraintKind::Budget)
            .map(|constraint| constraint.upper)
            .unwrap_or(0.0)
    }

    /// Picks still required in `category`; zero when the model has no row for it.
    pub fn category_quota(&self, category: Category) -> usize {
        self.constraints
            .iter()
            .find(|constraint| constraint.kind == ConstraintKind::CategoryCount(category))
            .map(|constraint| constraint.upper as usize)
            .unwrap_or(0)
    }

    pub fn is_feasible(&self, selection: &[bool]) -> bool {
        selection.len() == self.variable_count
            && self
                .constraints
                .iter()
                .all(|constraint| constraint.is_satisfied(selection))
    }
}

fn ensure_finite(candidate: &Candidate) -> Result<(), RosterError> {
    if candidate.cost.is_finite() && candidate.score.is_finite() {
        return Ok(());
    }
    Err(RosterError::infeasible_model(format!(
        "{} has cost {} and score {}; both must be finite",
        candidate.name, candidate.cost, candidate.score
    )))
}
