use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single QP solve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QpStatus {
    Optimal,
    Infeasible,
    Unbounded,
    NumericalFailure,
}

impl QpStatus {
    pub fn is_optimal(self) -> bool {
        self == QpStatus::Optimal
    }

    /// Every status other than `Optimal` counts as a failed solve.
    pub fn is_failure(self) -> bool {
        !self.is_optimal()
    }
}

impl fmt::Display for QpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QpStatus::Optimal => write!(f, "optimal"),
            QpStatus::Infeasible => write!(f, "infeasible"),
            QpStatus::Unbounded => write!(f, "unbounded"),
            QpStatus::NumericalFailure => write!(f, "numerical failure"),
        }
    }
}
