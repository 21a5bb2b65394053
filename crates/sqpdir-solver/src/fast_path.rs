//! Closed-form solves for QPs without linear rows.

use nalgebra::DVector;

use crate::backend::{Multipliers, QpSolution};
use crate::qp_model::QuadraticProgram;
use sqpdir_linalg::{cholesky_solve, min_norm_solve, Curvature};
use sqpdir_types::{QpStatus, Result};

/// Bounds-only QP with diagonal H.
///
/// Coordinates decouple: each minimizes `h x^2 + f x` on `[lb, ub]`, i.e. the
/// unconstrained minimizer `-f / 2h` clipped to the interval. A zero `h` leaves a
/// linear term whose minimizer is the bound `-f` points to.
pub fn box_diagonal(qp: &QuadraticProgram) -> Result<QpSolution> {
    let n = qp.num_vars();
    let mut x = DVector::zeros(n);
    let mut multipliers = Multipliers::zeros(qp.num_constraints(), n);

    for i in 0..n {
        let h = qp.h()[(i, i)];
        let f = qp.f()[i];
        let (lb, ub) = (qp.lb()[i], qp.ub()[i]);

        let xi = if h > 0.0 {
            (-f / (2.0 * h)).max(lb).min(ub)
        } else if f > 0.0 {
            lb
        } else if f < 0.0 {
            ub
        } else {
            0.0_f64.max(lb).min(ub)
        };

        if !xi.is_finite() && h <= 0.0 {
            tracing::debug!(coordinate = i, "linear coordinate with open bound, unbounded");
            return Ok(QpSolution::failed(n, QpStatus::Unbounded, 0));
        }

        let g = 2.0 * h * xi + f;
        if xi == lb && g > 0.0 {
            multipliers.lower[i] = g;
        } else if xi == ub && g < 0.0 {
            multipliers.upper[i] = -g;
        }
        x[i] = xi;
    }

    Ok(QpSolution {
        objective: qp.objective(&x),
        x: x.as_slice().to_vec(),
        status: QpStatus::Optimal,
        iterations: 0,
        multipliers: Some(multipliers),
    })
}

/// QP with no linear rows and no finite bounds: solve `2 H x = -f`.
///
/// For singular H the minimum-norm solution is taken when `-f` lies in the range
/// of H; otherwise the objective decreases without bound along the null space.
pub fn unconstrained(
    qp: &QuadraticProgram,
    curvature: Curvature,
    tolerance: f64,
) -> Result<QpSolution> {
    let n = qp.num_vars();
    let g = qp.h() * 2.0;
    let rhs = -qp.f();

    let x = match curvature {
        Curvature::PositiveDefinite => cholesky_solve(&g, &rhs)?,
        _ => {
            let (x, residual) = min_norm_solve(&g, &rhs, tolerance)?;
            if residual > tolerance * (1.0 + rhs.norm()) {
                tracing::debug!(residual, "linear term outside the range of H, unbounded");
                return Ok(QpSolution::failed(n, QpStatus::Unbounded, 0));
            }
            x
        }
    };

    Ok(QpSolution {
        objective: qp.objective(&x),
        x: x.as_slice().to_vec(),
        status: QpStatus::Optimal,
        iterations: 0,
        multipliers: Some(Multipliers::zeros(qp.num_constraints(), n)),
    })
}
