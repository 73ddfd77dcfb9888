use std::collections::HashSet;
use std::fmt;

use crate::config::RosterConfig;
use crate::data::candidate::{CandidatePool, Category};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationSeverity {
    Error,
    Warning,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDiagnostic {
    pub severity: ValidationSeverity,
    pub context: String,
    pub message: String,
}

impl fmt::Display for ValidationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.context, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    pub fn push(
        &mut self,
        severity: ValidationSeverity,
        context: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(ValidationDiagnostic {
            severity,
            context: context.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.severity == ValidationSeverity::Error)
    }

    pub fn count(&self, severity: ValidationSeverity) -> usize {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity == severity)
            .count()
    }
}

/// Check a loaded pool against the run parameters before any solve.
pub fn validate_pool(pool: &CandidatePool, config: &RosterConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut seen: HashSet<(Category, String)> = HashSet::new();

    for candidate in pool.candidates() {
        let context = format!("row {} ({})", candidate.id.0, candidate.name);
        if candidate.name.trim().is_empty() {
            report.push(ValidationSeverity::Error, &context, "name is empty");
        }
        if !candidate.cost.is_finite() || candidate.cost < 0.0 {
            report.push(
                ValidationSeverity::Error,
                &context,
                format!("cost {} must be a non-negative number", candidate.cost),
            );
        }
        if !candidate.score.is_finite() {
            report.push(
                ValidationSeverity::Error,
                &context,
                format!("score {} is not a finite number", candidate.score),
            );
        }
        if candidate.excluded && (candidate.locked || candidate.force_include) {
            report.push(
                ValidationSeverity::Warning,
                &context,
                "excluded but locked or forced; exclusion wins and it is left out",
            );
        }
        if !seen.insert((candidate.category, candidate.name.to_lowercase())) {
            report.push(
                ValidationSeverity::Warning,
                &context,
                format!("duplicate {} name", candidate.category),
            );
        }
    }

    let partition = pool.partition(config.targets(), config.budget);
    for category in Category::ALL {
        let remaining = partition.remaining_quota.get(category);
        if remaining < 0 {
            report.push(
                ValidationSeverity::Error,
                format!("{category} quota"),
                format!(
                    "{} committed {category}(s) for a quota of {}",
                    config.targets().get(category) - remaining,
                    config.targets().get(category)
                ),
            );
            continue;
        }
        let free = partition.free.indices_in(category).len() as i64;
        if free < remaining {
            report.push(
                ValidationSeverity::Error,
                format!("{category} quota"),
                format!("{remaining} {category}(s) still needed but only {free} are selectable"),
            );
        }
    }
    if partition.remaining_budget < 0.0 {
        report.push(
            ValidationSeverity::Error,
            "budget",
            format!(
                "committed entities cost {:.2}, over the budget of {:.2}",
                config.budget - partition.remaining_budget,
                config.budget
            ),
        );
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::candidate::Candidate;

    fn config() -> RosterConfig {
        RosterConfig {
            budget: 40.0,
            driver_quota: 2,
            team_quota: 1,
            ..RosterConfig::default()
        }
    }

    #[test]
    fn clean_pool_has_no_diagnostics() {
        let pool = CandidatePool::new(vec![
            Candidate::new(0, "Ace", Category::Driver, 10.0, 50.0),
            Candidate::new(1, "Bolt", Category::Driver, 12.0, 60.0),
            Candidate::new(2, "Works", Category::Team, 15.0, 40.0),
        ]);
        let report = validate_pool(&pool, &config());
        assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    }

    #[test]
    fn flags_bad_rows_and_unreachable_quota() {
        let pool = CandidatePool::new(vec![
            Candidate::new(0, "", Category::Driver, -1.0, 50.0),
            Candidate::new(1, "Bolt", Category::Driver, 12.0, f64::NAN),
            Candidate::new(2, "bolt", Category::Driver, 12.0, 10.0).excluded(),
            Candidate::new(3, "Works", Category::Team, 45.0, 40.0).locked(),
        ]);
        let report = validate_pool(&pool, &config());
        assert!(report.has_errors());
        // empty name, negative cost, NaN score, budget overrun
        assert_eq!(report.count(ValidationSeverity::Error), 4);
        assert_eq!(report.count(ValidationSeverity::Warning), 1, "duplicate name");
    }

    #[test]
    fn over_committed_category_is_an_error() {
        let pool = CandidatePool::new(vec![
            Candidate::new(0, "Ace", Category::Driver, 1.0, 50.0).locked(),
            Candidate::new(1, "Bolt", Category::Driver, 1.0, 60.0).locked(),
            Candidate::new(2, "Crash", Category::Driver, 1.0, 60.0).forced(),
            Candidate::new(3, "Works", Category::Team, 15.0, 40.0),
        ]);
        let report = validate_pool(&pool, &config());
        assert_eq!(report.count(ValidationSeverity::Error), 1);
        assert!(report.diagnostics[0].message.contains("3 committed driver(s)"));
    }

    #[test]
    fn excluded_commitment_is_a_warning_and_frees_the_slot() {
        let pool = CandidatePool::new(vec![
            Candidate::new(0, "Ace", Category::Driver, 10.0, 50.0),
            Candidate::new(1, "Bolt", Category::Driver, 12.0, 60.0),
            Candidate::new(2, "Hated", Category::Driver, 5.0, 5.0)
                .locked()
                .excluded(),
            Candidate::new(3, "Works", Category::Team, 15.0, 40.0),
        ]);
        let report = validate_pool(&pool, &config());
        assert!(!report.has_errors(), "{:?}", report.diagnostics);
        assert_eq!(report.count(ValidationSeverity::Warning), 1);
        assert!(report.diagnostics[0].message.contains("exclusion wins"));
    }
}
