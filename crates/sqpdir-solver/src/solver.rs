use std::sync::Arc;

use crate::active_set_backend::ActiveSetBackend;
use crate::backend::{QpBackend, QpSolution};
use crate::clarabel_backend::ClarabelBackend;
use crate::config::{BackendKind, SolverConfig};
use crate::fast_path;
use crate::qp_model::QuadraticProgram;
use crate::stats::{SolveStats, StatsSnapshot};
use sqpdir_linalg::{classify_curvature, is_diagonal, Curvature};
use sqpdir_types::{QpStatus, Result, SqpError};

/// One-shot convex QP solver with a configurable backend.
///
/// Every call to [`QpSolver::solve`] counts one request on the shared
/// [`SolveStats`], plus one error when the status is not `Optimal`. Failures are
/// always reported through the status, never by panicking.
pub struct QpSolver {
    config: SolverConfig,
    backend: Arc<dyn QpBackend>,
    /// Used when the primary backend cannot factor a singular H
    fallback: Arc<dyn QpBackend>,
    stats: Arc<SolveStats>,
}

impl QpSolver {
    /// Create a solver for `config`, recording into `stats`
    pub fn new(config: SolverConfig, stats: Arc<SolveStats>) -> Result<Self> {
        config.validate()?;
        let backend: Arc<dyn QpBackend> = match config.backend {
            BackendKind::ActiveSet => Arc::new(ActiveSetBackend::from_config(&config)),
            BackendKind::InteriorPoint => Arc::new(ClarabelBackend::from_config(&config)),
        };
        Ok(Self::assemble(config, backend, stats))
    }

    /// Create with a custom backend
    pub fn with_backend(
        config: SolverConfig,
        backend: Arc<dyn QpBackend>,
        stats: Arc<SolveStats>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, backend, stats))
    }

    /// Create a solver that records into the process-wide tracker
    pub fn with_process_stats(config: SolverConfig) -> Result<Self> {
        Self::new(config, SolveStats::process())
    }

    fn assemble(config: SolverConfig, backend: Arc<dyn QpBackend>, stats: Arc<SolveStats>) -> Self {
        let fallback: Arc<dyn QpBackend> = Arc::new(ClarabelBackend::from_config(&config));
        QpSolver {
            config,
            backend,
            fallback,
            stats,
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn stats(&self) -> &Arc<SolveStats> {
        &self.stats
    }

    /// Read-only view of the request and error counters
    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Solve `qp`. The program is only read.
    pub fn solve(&self, qp: &QuadraticProgram) -> QpSolution {
        self.stats.record_attempt();

        let solution = match self.solve_checked(qp) {
            Ok(solution) => solution,
            Err(e) => {
                tracing::debug!(error = %e, "QP solve aborted");
                QpSolution::failed(qp.num_vars(), QpStatus::NumericalFailure, 0)
            }
        };

        if solution.status.is_failure() {
            self.stats.record_failure();
            tracing::warn!(
                status = %solution.status,
                num_vars = qp.num_vars(),
                num_constraints = qp.num_constraints(),
                "QP solve did not reach an optimum"
            );
        }

        solution
    }

    fn solve_checked(&self, qp: &QuadraticProgram) -> Result<QpSolution> {
        let n = qp.num_vars();

        if !qp.is_numerically_sound() {
            return Err(SqpError::NonFinite("QP data contains NaN or infinite entries".to_string()));
        }

        if qp.has_empty_box() {
            tracing::debug!("lower bound exceeds upper bound");
            return Ok(QpSolution::failed(n, QpStatus::Infeasible, 0));
        }

        let curvature = classify_curvature(qp.h(), self.config.psd_tolerance);
        if !curvature.is_convex() {
            return Err(SqpError::NonConvex("H has a negative eigenvalue".to_string()));
        }

        let solution = if !qp.has_linear_rows() && is_diagonal(qp.h(), 0.0) {
            fast_path::box_diagonal(qp)?
        } else if !qp.has_linear_rows() && !qp.has_finite_bounds() {
            fast_path::unconstrained(qp, curvature, self.config.tolerance)?
        } else {
            let backend = if curvature != Curvature::PositiveDefinite
                && self.backend.requires_strict_convexity()
            {
                tracing::debug!(
                    primary = self.backend.name(),
                    fallback = self.fallback.name(),
                    "singular H, switching backend"
                );
                &self.fallback
            } else {
                &self.backend
            };
            backend.solve_qp(qp)?
        };

        if solution.status.is_optimal() && solution.x.iter().any(|v| !v.is_finite()) {
            return Err(SqpError::NonFinite("solution vector".to_string()));
        }

        Ok(solution)
    }
}
