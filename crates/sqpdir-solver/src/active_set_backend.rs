use nalgebra::{DMatrix, DVector};

use crate::backend::{QpBackend, QpSolution};
use crate::config::SolverConfig;
use crate::qp_model::{InequalityForm, QuadraticProgram};
use sqpdir_linalg::cholesky_solve;
use sqpdir_types::{QpStatus, Result, SqpError};

/// Dense dual active-set solver (Goldfarb-Idnani).
///
/// Starts from the unconstrained minimizer and adds the most violated inequality
/// one at a time, keeping the dual iterate feasible. Needs H positive definite;
/// an empty dual step length proves primal infeasibility.
pub struct ActiveSetBackend {
    max_iters: usize,
    tolerance: f64,
    verbose: bool,
}

/// Working state of one solve
struct ActiveSet {
    /// Indices into the stacked inequality rows
    rows: Vec<usize>,
    /// Multipliers, parallel to `rows`
    duals: Vec<f64>,
}

enum Step {
    Full,
    Partial(usize),
    Infeasible,
}

impl ActiveSetBackend {
    pub fn new() -> Self {
        ActiveSetBackend {
            max_iters: 1000,
            tolerance: 1e-8,
            verbose: false,
        }
    }

    pub fn with_params(max_iters: usize, tolerance: f64) -> Self {
        ActiveSetBackend {
            max_iters,
            tolerance,
            verbose: false,
        }
    }

    pub fn from_config(config: &SolverConfig) -> Self {
        ActiveSetBackend {
            max_iters: config.max_iterations,
            tolerance: config.tolerance,
            verbose: config.verbose,
        }
    }

    /// Most violated inactive row, measured by slack over normal length.
    /// Ties go to the lowest index.
    fn most_violated(
        &self,
        form: &InequalityForm,
        active: &ActiveSet,
        x: &DVector<f64>,
    ) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for k in 0..form.len() {
            if active.rows.contains(&k) {
                continue;
            }
            let slack = form.slack(k, x);
            if slack >= -self.tolerance * (1.0 + form.rhs[k].abs()) {
                continue;
            }
            let scaled = slack / form.normals.column(k).norm().max(f64::MIN_POSITIVE);
            if best.map_or(true, |(_, s)| scaled < s) {
                best = Some((k, scaled));
            }
        }
        best.map(|(k, _)| k)
    }

    fn log_iteration(&self, iteration: usize, active: usize, added: usize) {
        if self.verbose {
            tracing::debug!(iteration, active, added, "active-set iteration");
        } else {
            tracing::trace!(iteration, active, added, "active-set iteration");
        }
    }
}

impl Default for ActiveSetBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl QpBackend for ActiveSetBackend {
    fn name(&self) -> &'static str {
        "active-set"
    }

    fn requires_strict_convexity(&self) -> bool {
        true
    }

    fn solve_qp(&self, qp: &QuadraticProgram) -> Result<QpSolution> {
        let n = qp.num_vars();
        let g = qp.h() * 2.0;
        let chol = g.cholesky().ok_or_else(|| {
            SqpError::Singular("H is not positive definite; active-set needs a strictly convex QP".to_string())
        })?;

        let form = qp.inequality_form();
        let mut x = -chol.solve(qp.f());
        let mut active = ActiveSet {
            rows: Vec::new(),
            duals: Vec::new(),
        };
        let mut iterations = 0;

        while let Some(p) = self.most_violated(&form, &active, &x) {
            let np = form.normals.column(p).clone_owned();
            let mut dual_p = 0.0;

            loop {
                iterations += 1;
                if iterations > self.max_iters {
                    return Err(SqpError::IterationLimit(self.max_iters));
                }
                self.log_iteration(iterations, active.rows.len(), p);

                // z: primal step direction, r: change in the active duals per unit step
                let ginv_np = chol.solve(&np);
                let (z, r) = if active.rows.is_empty() {
                    (ginv_np.clone(), DVector::zeros(0))
                } else {
                    let q = active.rows.len();
                    let n_act = DMatrix::from_fn(n, q, |i, j| form.normals[(i, active.rows[j])]);
                    let ginv_n = chol.solve(&n_act);
                    let gram = n_act.transpose() * &ginv_n;
                    let r = cholesky_solve(&gram, &(ginv_n.transpose() * &np))?;
                    let z = &ginv_np - &ginv_n * &r;
                    (z, r)
                };

                // Partial step: largest step keeping every active dual non-negative
                let mut t_partial = f64::INFINITY;
                let mut blocking = None;
                for (j, &rj) in r.iter().enumerate() {
                    if rj > 0.0 {
                        let ratio = active.duals[j] / rj;
                        if ratio < t_partial {
                            t_partial = ratio;
                            blocking = Some(j);
                        }
                    }
                }

                // Full step: makes row p active. None when n_p depends on the active normals.
                let dependent = z.norm() <= 1e-10 * ginv_np.norm();
                let t_full = if dependent {
                    f64::INFINITY
                } else {
                    -form.slack(p, &x) / z.dot(&np)
                };

                let step = if t_full.is_finite() && t_full <= t_partial {
                    Step::Full
                } else if let Some(j) = blocking {
                    Step::Partial(j)
                } else {
                    Step::Infeasible
                };
                let t = t_full.min(t_partial);

                match step {
                    Step::Infeasible => {
                        tracing::debug!(row = p, iterations, "dual step unbounded, QP infeasible");
                        return Ok(QpSolution::failed(n, QpStatus::Infeasible, iterations));
                    }
                    Step::Full => {
                        x += &z * t;
                        for (u, rj) in active.duals.iter_mut().zip(r.iter()) {
                            *u -= t * rj;
                        }
                        dual_p += t;
                        active.rows.push(p);
                        active.duals.push(dual_p);
                        break;
                    }
                    Step::Partial(j) => {
                        if !dependent {
                            x += &z * t;
                        }
                        for (u, rj) in active.duals.iter_mut().zip(r.iter()) {
                            *u -= t * rj;
                        }
                        dual_p += t;
                        active.rows.remove(j);
                        active.duals.remove(j);
                    }
                }
            }

            if x.iter().any(|v| !v.is_finite()) {
                return Err(SqpError::NonFinite("active-set iterate".to_string()));
            }
        }

        let mut stacked = vec![0.0; form.len()];
        for (&k, &u) in active.rows.iter().zip(active.duals.iter()) {
            stacked[k] = u;
        }

        Ok(QpSolution {
            objective: qp.objective(&x),
            x: x.as_slice().to_vec(),
            status: QpStatus::Optimal,
            iterations,
            multipliers: Some(form.scatter_multipliers(&stacked)),
        })
    }
}
