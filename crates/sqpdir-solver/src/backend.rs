use serde::{Deserialize, Serialize};
use sqpdir_types::{QpStatus, Result};

use crate::qp_model::QuadraticProgram;

/// Lagrange multipliers of an optimal solution, all non-negative.
///
/// With `g = 2 H x + f`, stationarity reads `g - A^T constraints - lower + upper = 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Multipliers {
    /// One per row of `A x >= b`
    pub constraints: Vec<f64>,
    /// One per variable for `x >= lb`
    pub lower: Vec<f64>,
    /// One per variable for `x <= ub`
    pub upper: Vec<f64>,
}

impl Multipliers {
    pub fn zeros(num_constraints: usize, num_vars: usize) -> Self {
        Multipliers {
            constraints: vec![0.0; num_constraints],
            lower: vec![0.0; num_vars],
            upper: vec![0.0; num_vars],
        }
    }
}

/// Solution from QP solver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QpSolution {
    pub x: Vec<f64>,
    pub status: QpStatus,
    /// x^T H x + f^T x at `x`; +inf when infeasible, -inf when unbounded, NaN on numerical failure
    pub objective: f64,
    pub iterations: usize,
    /// Present only for `Optimal`
    pub multipliers: Option<Multipliers>,
}

impl QpSolution {
    /// A non-optimal outcome carrying a zero direction
    pub fn failed(num_vars: usize, status: QpStatus, iterations: usize) -> Self {
        let objective = match status {
            QpStatus::Infeasible => f64::INFINITY,
            QpStatus::Unbounded => f64::NEG_INFINITY,
            _ => f64::NAN,
        };
        QpSolution {
            x: vec![0.0; num_vars],
            status,
            objective,
            iterations,
            multipliers: None,
        }
    }
}

/// Trait for QP solver backends
pub trait QpBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Backends that factor H directly cannot handle a singular positive semidefinite H
    fn requires_strict_convexity(&self) -> bool {
        false
    }

    /// Solve a convex QP: minimize x^T H x + f^T x
    /// subject to A x >= b, lb <= x <= ub
    ///
    /// Numerical trouble is reported as `Err`; the caller folds it into a status.
    fn solve_qp(&self, qp: &QuadraticProgram) -> Result<QpSolution>;
}
