use clarabel::algebra::CscMatrix;
use clarabel::solver::{DefaultSettings, DefaultSolver, IPSolver, SolverStatus, SupportedConeT};
use nalgebra::{DMatrix, DVector};

use crate::backend::{QpBackend, QpSolution};
use crate::config::SolverConfig;
use crate::fast_path;
use crate::qp_model::QuadraticProgram;
use sqpdir_linalg::classify_curvature;
use sqpdir_types::{QpStatus, Result, SqpError};

/// Clarabel-based QP solver (interior point, pure Rust).
///
/// Handles positive semidefinite H and reports dual infeasibility as unboundedness.
pub struct ClarabelBackend {
    verbose: bool,
    max_iter: u32,
    tolerance: f64,
    psd_tolerance: f64,
}

impl ClarabelBackend {
    /// Create a new Clarabel solver with default settings
    pub fn new() -> Self {
        ClarabelBackend {
            verbose: false,
            max_iter: 200,
            tolerance: 1e-8,
            psd_tolerance: 1e-10,
        }
    }

    /// Create solver with custom settings
    pub fn with_params(max_iter: u32, tolerance: f64) -> Self {
        ClarabelBackend {
            verbose: false,
            max_iter,
            tolerance,
            psd_tolerance: 1e-10,
        }
    }

    pub fn from_config(config: &SolverConfig) -> Self {
        ClarabelBackend {
            verbose: config.verbose,
            max_iter: u32::try_from(config.max_iterations).unwrap_or(u32::MAX),
            tolerance: config.tolerance,
            psd_tolerance: config.psd_tolerance,
        }
    }

    fn settings(&self) -> DefaultSettings<f64> {
        let mut settings = DefaultSettings::default();
        settings.verbose = self.verbose;
        settings.max_iter = self.max_iter;
        settings.tol_gap_abs = self.tolerance;
        settings.tol_gap_rel = self.tolerance;
        settings.tol_feas = self.tolerance;
        settings
    }
}

impl Default for ClarabelBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl QpBackend for ClarabelBackend {
    fn name(&self) -> &'static str {
        "interior-point"
    }

    fn solve_qp(&self, qp: &QuadraticProgram) -> Result<QpSolution> {
        let form = qp.inequality_form();
        if form.is_empty() {
            // Nothing for the cone solver to work on
            let curvature = classify_curvature(qp.h(), self.psd_tolerance);
            if !curvature.is_convex() {
                return Err(SqpError::NonConvex("H has a negative eigenvalue".to_string()));
            }
            return fast_path::unconstrained(qp, curvature, self.tolerance);
        }

        // Clarabel minimizes 0.5 x^T P x + q^T x, so P = 2H
        let p_csc = to_clarabel_csc_upper(&(qp.h() * 2.0));

        // Clarabel format: A x + s = b, s in the nonnegative cone.
        // Every stacked row n_k^T x >= d_k becomes -n_k^T x + s = -d_k.
        let a_csc = to_clarabel_csc(&(-form.normals.transpose()));
        let b: Vec<f64> = form.rhs.iter().map(|d| -d).collect();
        let cones = [SupportedConeT::NonnegativeConeT(form.len())];

        let mut solver = DefaultSolver::new(&p_csc, qp.f().as_slice(), &a_csc, &b, &cones, self.settings());
        solver.solve();

        let iterations = solver.info.iterations as usize;
        let status = match solver.solution.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => QpStatus::Optimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                QpStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                QpStatus::Unbounded
            }
            SolverStatus::MaxIterations => {
                return Err(SqpError::IterationLimit(self.max_iter as usize));
            }
            other => {
                return Err(SqpError::Backend(format!("clarabel stopped with {:?}", other)));
            }
        };

        if status != QpStatus::Optimal {
            return Ok(QpSolution::failed(qp.num_vars(), status, iterations));
        }

        // Clamp solution to box constraints to handle interior-point round-off
        let mut x = DVector::from_column_slice(&solver.solution.x);
        for i in 0..x.len() {
            x[i] = x[i].max(qp.lb()[i]).min(qp.ub()[i]);
        }

        Ok(QpSolution {
            objective: qp.objective(&x),
            x: x.as_slice().to_vec(),
            status,
            iterations,
            multipliers: Some(form.scatter_multipliers(&solver.solution.z)),
        })
    }
}

/// Convert DMatrix to Clarabel CSC format (upper triangle only for P)
fn to_clarabel_csc_upper(mat: &DMatrix<f64>) -> CscMatrix<f64> {
    let mut colptr = vec![0];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    // Iterate column by column (CSC format)
    for col in 0..mat.ncols() {
        // For upper triangle: row <= col
        for row in 0..=col {
            let val = mat[(row, col)];
            if val != 0.0 {
                rowval.push(row);
                nzval.push(val);
            }
        }
        colptr.push(nzval.len());
    }

    CscMatrix {
        m: mat.nrows(),
        n: mat.ncols(),
        colptr,
        rowval,
        nzval,
    }
}

/// Convert DMatrix to Clarabel CSC format (full matrix)
fn to_clarabel_csc(mat: &DMatrix<f64>) -> CscMatrix<f64> {
    let mut colptr = vec![0];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for col in 0..mat.ncols() {
        for row in 0..mat.nrows() {
            let val = mat[(row, col)];
            if val != 0.0 {
                rowval.push(row);
                nzval.push(val);
            }
        }
        colptr.push(nzval.len());
    }

    CscMatrix {
        m: mat.nrows(),
        n: mat.ncols(),
        colptr,
        rowval,
        nzval,
    }
}
