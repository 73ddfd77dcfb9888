//! Final roster assembly. The solvers only see the free pool, so a committed entity
//! that would make a better star is invisible to them; reconciliation checks for it.

use log::debug;
use serde::Serialize;

use crate::data::candidate::{Candidate, CandidateId, Category, CategoryCounts, PoolPartition};
use crate::optimizer::constraints::FEASIBILITY_TOLERANCE;
use crate::optimizer::error::RosterError;
use crate::optimizer::star::{StarEligibility, STAR_MULTIPLIER};

/// Which reconciliation variant produced the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StarSource {
    /// Solver's free picks and the solver's star.
    Solver,
    /// Unstarred free picks, star re-chosen over the whole roster.
    Recomputed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterEntry {
    pub id: CandidateId,
    pub name: String,
    pub category: Category,
    pub cost: f64,
    pub base_score: f64,
    /// Score after the star bonus.
    pub score: f64,
    pub starred: bool,
    pub forced: bool,
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Roster {
    pub entries: Vec<RosterEntry>,
    pub star_source: StarSource,
}

impl Roster {
    fn assemble(
        members: &[&Candidate],
        star: Option<CandidateId>,
        star_source: StarSource,
    ) -> Self {
        let mut entries: Vec<RosterEntry> = members
            .iter()
            .map(|candidate| {
                let starred = star == Some(candidate.id);
                RosterEntry {
                    id: candidate.id,
                    name: candidate.name.clone(),
                    category: candidate.category,
                    cost: candidate.cost,
                    base_score: candidate.score,
                    score: if starred {
                        candidate.score * STAR_MULTIPLIER
                    } else {
                        candidate.score
                    },
                    starred,
                    forced: candidate.force_include,
                    locked: candidate.locked,
                }
            })
            .collect();
        entries.sort_by(|left, right| {
            right
                .category
                .cmp(&left.category)
                .then_with(|| right.score.total_cmp(&left.score))
                .then_with(|| right.cost.total_cmp(&left.cost))
                .then_with(|| right.starred.cmp(&left.starred))
        });
        Self {
            entries,
            star_source,
        }
    }

    pub fn total_score(&self) -> f64 {
        self.entries.iter().map(|entry| entry.score).sum()
    }

    pub fn total_cost(&self) -> f64 {
        self.entries.iter().map(|entry| entry.cost).sum()
    }

    pub fn count(&self, category: Category) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.category == category)
            .count()
    }

    pub fn starred(&self) -> Option<&RosterEntry> {
        self.entries.iter().find(|entry| entry.starred)
    }

    pub fn contains(&self, id: CandidateId) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    /// Exact quota per category, cost within budget, at most one star.
    pub fn satisfies(&self, targets: CategoryCounts, budget: f64) -> bool {
        Category::ALL
            .iter()
            .all(|category| self.count(*category) as i64 == targets.get(*category))
            && self.total_cost() <= budget + FEASIBILITY_TOLERANCE
            && self.entries.iter().filter(|entry| entry.starred).count() <= 1
    }
}

/// Free-pool picks from a solver and the entity it starred, if any.
#[derive(Debug, Clone, Copy)]
pub struct FreeChoice<'a> {
    pub picks: &'a [usize],
    pub star: Option<CandidateId>,
}

#[derive(Debug, Clone, Copy)]
pub struct StarReconciler {
    eligibility: StarEligibility,
}

impl StarReconciler {
    pub fn new(eligibility: StarEligibility) -> Self {
        Self { eligibility }
    }

    /// Merge committed entities back in and settle the star.
    ///
    /// Variant A keeps `chosen` with its star. Variant B takes `unstarred` (the no-star
    /// solve) and stars the best eligible entity of the full roster, committed ones
    /// included. The higher total wins; A on an exact tie.
    pub fn reconcile(
        &self,
        partition: &PoolPartition,
        chosen: FreeChoice<'_>,
        unstarred: Option<&[usize]>,
    ) -> Result<Roster, RosterError> {
        let with_committed = |picks: &[usize]| -> Vec<&Candidate> {
            picks
                .iter()
                .filter_map(|&index| partition.free.get(index))
                .chain(partition.committed.iter())
                .collect()
        };

        let members_a = with_committed(chosen.picks);
        let star_a = chosen.star.filter(|id| {
            members_a
                .iter()
                .any(|candidate| candidate.id == *id && self.eligibility.is_eligible(candidate))
        });
        let variant_a = Roster::assemble(&members_a, star_a, StarSource::Solver);

        let Some(unstarred) = unstarred else {
            return Ok(variant_a);
        };
        let members_b = with_committed(unstarred);
        let star_b = self
            .eligibility
            .select_star(members_b.iter().copied())?
            .map(|candidate| candidate.id);
        let variant_b = Roster::assemble(&members_b, star_b, StarSource::Recomputed);

        debug!(
            "reconcile: solver star {:.3} vs recomputed star {:.3}",
            variant_a.total_score(),
            variant_b.total_score()
        );
        if variant_b.total_score() > variant_a.total_score() {
            Ok(variant_b)
        } else {
            Ok(variant_a)
        }
    }
}
