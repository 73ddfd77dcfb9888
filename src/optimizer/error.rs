use std::fmt;

/// Failures surfaced by the roster solvers.
///
/// `InfeasibleModel` and `NoFeasibleRoster` abort a run. `RetryExhausted` and
/// `AmbiguousStar` are per-trial in the sampling solver (the trial is dropped), but
/// `AmbiguousStar` is fatal when it comes out of reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum RosterError {
    InfeasibleModel { reason: String },
    NoFeasibleRoster { options: usize },
    RetryExhausted { attempts: usize },
    AmbiguousStar { names: Vec<String>, score: f64 },
    Solver(String),
}

impl RosterError {
    pub(crate) fn infeasible_model(reason: impl Into<String>) -> Self {
        Self::InfeasibleModel {
            reason: reason.into(),
        }
    }

    /// Errors that only invalidate a single sampling trial.
    pub fn is_trial_local(&self) -> bool {
        matches!(self, Self::RetryExhausted { .. } | Self::AmbiguousStar { .. })
    }
}

impl fmt::Display for RosterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InfeasibleModel { reason } => write!(f, "infeasible roster model: {reason}"),
            Self::NoFeasibleRoster { options } => {
                write!(f, "no feasible roster found across {options} option(s)")
            }
            Self::RetryExhausted { attempts } => {
                write!(f, "every draw exceeded the budget after {attempts} attempt(s)")
            }
            Self::AmbiguousStar { names, score } => write!(
                f,
                "{} entities tie for the star at score {score}: {}",
                names.len(),
                names.join(", ")
            ),
            Self::Solver(message) => write!(f, "integer program solver failed: {message}"),
        }
    }
}

impl std::error::Error for RosterError {}
