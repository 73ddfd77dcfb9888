//! Candidate model and the pure partitioning pipeline: pool -> committed + free pool.
//! Nothing here mutates a loaded candidate; every step returns a new value.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Driver,
    Team,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Driver, Category::Team];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Driver => "driver",
            Self::Team => "team",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "driver" => Some(Self::Driver),
            "team" => Some(Self::Team),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stable identifier of a candidate: its row position in the loaded table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId(pub usize);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub category: Category,
    pub cost: f64,
    pub score: f64,
    pub excluded: bool,
    /// Already under contract.
    pub locked: bool,
    /// Manually pinned into the roster.
    pub force_include: bool,
}

impl Candidate {
    pub fn new(
        id: usize,
        name: impl Into<String>,
        category: Category,
        cost: f64,
        score: f64,
    ) -> Self {
        Self {
            id: CandidateId(id),
            name: name.into(),
            category,
            cost,
            score,
            excluded: false,
            locked: false,
            force_include: false,
        }
    }

    pub fn locked(self) -> Self {
        Self { locked: true, ..self }
    }

    pub fn forced(self) -> Self {
        Self {
            force_include: true,
            ..self
        }
    }

    pub fn excluded(self) -> Self {
        Self {
            excluded: true,
            ..self
        }
    }

    /// Locked and forced candidates are in every roster and never reach the optimizer.
    /// Exclusion is applied first: an excluded candidate is never committed.
    pub fn is_committed(&self) -> bool {
        !self.excluded && (self.locked || self.force_include)
    }
}

/// A count per category. Used for target quotas and for what remains after commitments,
/// so it is signed: an over-committed category shows up as a negative remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub drivers: i64,
    pub teams: i64,
}

impl CategoryCounts {
    pub fn new(drivers: i64, teams: i64) -> Self {
        Self { drivers, teams }
    }

    pub fn get(&self, category: Category) -> i64 {
        match category {
            Category::Driver => self.drivers,
            Category::Team => self.teams,
        }
    }

    fn add(&mut self, category: Category, amount: i64) {
        match category {
            Category::Driver => self.drivers += amount,
            Category::Team => self.teams += amount,
        }
    }

    pub fn minus(&self, other: &CategoryCounts) -> CategoryCounts {
        CategoryCounts {
            drivers: self.drivers - other.drivers,
            teams: self.teams - other.teams,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    candidates: Vec<Candidate>,
}

impl CandidatePool {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn get(&self, id: CandidateId) -> Option<&Candidate> {
        self.candidates
            .get(id.0)
            .filter(|candidate| candidate.id == id)
            .or_else(|| self.candidates.iter().find(|candidate| candidate.id == id))
    }

    pub fn committed(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(|candidate| candidate.is_committed())
    }

    pub fn committed_counts(&self) -> CategoryCounts {
        let mut counts = CategoryCounts::default();
        for candidate in self.committed() {
            counts.add(candidate.category, 1);
        }
        counts
    }

    pub fn committed_cost(&self) -> f64 {
        self.committed().map(|candidate| candidate.cost).sum()
    }

    /// Split into committed entities and the free pool the solvers search.
    ///
    /// Excluded candidates never enter the free pool, and a category whose remaining
    /// quota is already zero (or negative) contributes no free members. Remaining budget
    /// and quotas may come out negative; the constraint model rejects those.
    pub fn partition(&self, targets: CategoryCounts, budget: f64) -> PoolPartition {
        let committed: Vec<Candidate> = self.committed().cloned().collect();
        let remaining_quota = targets.minus(&self.committed_counts());
        let remaining_budget = budget - self.committed_cost();

        let mut free: Vec<Candidate> = self
            .candidates
            .iter()
            .filter(|candidate| !candidate.is_committed() && !candidate.excluded)
            .filter(|candidate| remaining_quota.get(candidate.category) > 0)
            .cloned()
            .collect();
        // Stable: drivers first, load order within a category.
        free.sort_by_key(|candidate| candidate.category);

        PoolPartition {
            committed,
            free: FreePool { members: free },
            targets,
            budget,
            remaining_quota,
            remaining_budget,
        }
    }
}

/// Candidates the optimizer may pick. Indices into this pool are the solver variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FreePool {
    members: Vec<Candidate>,
}

impl FreePool {
    pub fn members(&self) -> &[Candidate] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.members.get(index)
    }

    pub fn indices_in(&self, category: Category) -> Vec<usize> {
        self.members
            .iter()
            .enumerate()
            .filter(|(_, candidate)| candidate.category == category)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn costs(&self) -> Vec<f64> {
        self.members.iter().map(|candidate| candidate.cost).collect()
    }

    pub fn scores(&self) -> Vec<f64> {
        self.members.iter().map(|candidate| candidate.score).collect()
    }
}

#[derive(Debug, Clone)]
pub struct PoolPartition {
    pub committed: Vec<Candidate>,
    pub free: FreePool,
    pub targets: CategoryCounts,
    pub budget: f64,
    pub remaining_quota: CategoryCounts,
    pub remaining_budget: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pool() -> CandidatePool {
        CandidatePool::new(vec![
            Candidate::new(0, "Team A", Category::Team, 15.0, 40.0),
            Candidate::new(1, "Ace", Category::Driver, 10.0, 50.0),
            Candidate::new(2, "Bolt", Category::Driver, 12.0, 60.0).locked(),
            Candidate::new(3, "Crash", Category::Driver, 20.0, 80.0).excluded(),
            Candidate::new(4, "Dash", Category::Driver, 8.0, 30.0).forced(),
            Candidate::new(5, "Team B", Category::Team, 9.0, 20.0),
        ])
    }

    #[test]
    fn partition_removes_committed_and_excluded_from_free_pool() {
        let partition = sample_pool().partition(CategoryCounts::new(3, 1), 50.0);

        let free_names: Vec<&str> = partition
            .free
            .members()
            .iter()
            .map(|candidate| candidate.name.as_str())
            .collect();
        assert_eq!(free_names, vec!["Ace", "Team A", "Team B"]);
        assert_eq!(partition.committed.len(), 2);
        assert_eq!(partition.remaining_quota, CategoryCounts::new(1, 1));
        assert!((partition.remaining_budget - 30.0).abs() < 1e-9);
    }

    #[test]
    fn excluded_candidate_is_dropped_even_when_locked_or_forced() {
        let pool = CandidatePool::new(vec![
            Candidate::new(0, "Ace", Category::Driver, 10.0, 50.0),
            Candidate::new(1, "Bolt", Category::Driver, 12.0, 60.0),
            Candidate::new(2, "Hated", Category::Driver, 5.0, 5.0)
                .locked()
                .excluded(),
            Candidate::new(3, "Pinned", Category::Driver, 6.0, 7.0)
                .forced()
                .excluded(),
            Candidate::new(4, "Works", Category::Team, 15.0, 40.0),
        ]);
        let partition = pool.partition(CategoryCounts::new(2, 1), 40.0);

        assert!(partition.committed.is_empty());
        assert_eq!(partition.remaining_quota, CategoryCounts::new(2, 1));
        assert!((partition.remaining_budget - 40.0).abs() < 1e-9);
        let free_names: Vec<&str> = partition
            .free
            .members()
            .iter()
            .map(|candidate| candidate.name.as_str())
            .collect();
        assert_eq!(free_names, vec!["Ace", "Bolt", "Works"]);
    }

    #[test]
    fn exhausted_category_contributes_no_free_members() {
        let partition = sample_pool().partition(CategoryCounts::new(2, 1), 50.0);
        assert_eq!(partition.remaining_quota.drivers, 0);
        assert!(partition.free.indices_in(Category::Driver).is_empty());
        assert_eq!(partition.free.indices_in(Category::Team).len(), 2);
    }

    #[test]
    fn over_committed_category_goes_negative() {
        let partition = sample_pool().partition(CategoryCounts::new(1, 1), 50.0);
        assert_eq!(partition.remaining_quota.drivers, -1);
    }

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!(Category::parse(" Driver "), Some(Category::Driver));
        assert_eq!(Category::parse("TEAM"), Some(Category::Team));
        assert_eq!(Category::parse("constructor"), None);
    }

    #[test]
    fn pool_lookup_by_id() {
        let pool = sample_pool();
        assert_eq!(pool.get(CandidateId(3)).map(|c| c.name.as_str()), Some("Crash"));
        assert!(pool.get(CandidateId(42)).is_none());
    }
}
