//! The star rule: exactly one cheap driver may have its score doubled.

use serde::Serialize;

use crate::data::candidate::{Candidate, Category};
use crate::optimizer::error::RosterError;

/// Score multiplier applied to the starred entity.
pub const STAR_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarEligibility {
    /// Drivers strictly cheaper than this may be starred.
    pub cost_threshold: f64,
}

impl StarEligibility {
    pub fn new(cost_threshold: f64) -> Self {
        Self { cost_threshold }
    }

    pub fn is_eligible(&self, candidate: &Candidate) -> bool {
        candidate.category == Category::Driver && candidate.cost < self.cost_threshold
    }

    /// Pick the star for a finished roster: the eligible member with the highest score.
    ///
    /// Returns `Ok(None)` when nobody is eligible. Two or more eligible members sharing
    /// the top score is `AmbiguousStar`; the tie is reported, never broken.
    pub fn select_star<'a, I>(&self, members: I) -> Result<Option<&'a Candidate>, RosterError>
    where
        I: IntoIterator<Item = &'a Candidate>,
    {
        let eligible: Vec<&Candidate> = members
            .into_iter()
            .filter(|candidate| self.is_eligible(candidate))
            .collect();
        if let Some(bad) = eligible.iter().find(|candidate| candidate.score.is_nan()) {
            return Err(RosterError::infeasible_model(format!(
                "star-eligible {} has no numeric score",
                bad.name
            )));
        }
        let Some(top_score) = eligible
            .iter()
            .map(|candidate| candidate.score)
            .max_by(f64::total_cmp)
        else {
            return Ok(None);
        };

        let leaders: Vec<&Candidate> = eligible
            .into_iter()
            .filter(|candidate| candidate.score == top_score)
            .collect();
        match leaders.as_slice() {
            [only] => Ok(Some(*only)),
            _ => Err(RosterError::AmbiguousStar {
                names: leaders.iter().map(|candidate| candidate.name.clone()).collect(),
                score: top_score,
            }),
        }
    }
}

/// Which free-pool entity a solve assumes is starred.
///
/// Ordering is the declared tie-break order: `NoStar` ranks lowest, then free-pool index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StarOption {
    NoStar,
    Star(usize),
}

impl StarOption {
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::NoStar => None,
            Self::Star(index) => Some(*index),
        }
    }

    /// Per-member scores with this option's bonus applied.
    pub fn scoring_vector(&self, base_scores: &[f64]) -> Vec<f64> {
        let mut scores = base_scores.to_vec();
        if let Some(slot) = self.index().and_then(|index| scores.get_mut(index)) {
            *slot *= STAR_MULTIPLIER;
        }
        scores
    }
}

/// Total of `members` with the starred one counted twice.
pub fn starred_total<'a, I>(members: I, star: Option<&Candidate>) -> f64
where
    I: IntoIterator<Item = &'a Candidate>,
{
    let base: f64 = members.into_iter().map(|candidate| candidate.score).sum();
    base + star.map_or(0.0, |candidate| candidate.score * (STAR_MULTIPLIER - 1.0))
}
