use serde::{Deserialize, Serialize};
use std::sync::Arc;

use sqpdir_solver::{Multipliers, QpSolver, SolveStats, SolverConfig, StatsSnapshot};
use sqpdir_types::{QpStatus, Result};

use crate::qp_builder::QpBuilder;

/// Search direction returned to the optimizer loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Direction {
    pub d: Vec<f64>,
    pub status: QpStatus,
    /// Model change `0.5 d^T H_raw d + f^T d` at `d`
    pub model_change: f64,
    pub multipliers: Option<Multipliers>,
    pub iterations: usize,
}

impl Direction {
    pub fn norm(&self) -> f64 {
        self.d.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    pub fn is_usable(&self) -> bool {
        self.status.is_optimal()
    }
}

/// Per-iteration direction finder: formulates and solves the QP subproblem
pub struct DirectionFinder {
    solver: QpSolver,
}

impl DirectionFinder {
    pub fn new(solver: QpSolver) -> Self {
        DirectionFinder { solver }
    }

    /// Create with the given configuration, counting into the process-wide tracker
    pub fn from_config(config: SolverConfig) -> Result<Self> {
        Ok(Self::new(QpSolver::with_process_stats(config)?))
    }

    /// Create from a backend name such as `"active-set"` or `"interior-point"`
    pub fn with_backend_name(name: &str, stats: Arc<SolveStats>) -> Result<Self> {
        let config = SolverConfig::default().with_backend(name.parse()?);
        Ok(Self::new(QpSolver::new(config, stats)?))
    }

    pub fn solver(&self) -> &QpSolver {
        &self.solver
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.solver.snapshot()
    }

    /// Build the QP from `builder` and solve it.
    ///
    /// Only shape errors are returned as `Err`; solver trouble is in `Direction::status`.
    pub fn find_direction(&self, builder: &QpBuilder) -> Result<Direction> {
        let qp = builder.build()?;
        let solution = self.solver.solve(&qp);

        tracing::debug!(
            status = %solution.status,
            num_vars = qp.num_vars(),
            num_constraints = qp.num_constraints(),
            iterations = solution.iterations,
            "direction QP solved"
        );

        Ok(Direction {
            d: solution.x,
            status: solution.status,
            model_change: solution.objective,
            multipliers: solution.multipliers,
            iterations: solution.iterations,
        })
    }
}
