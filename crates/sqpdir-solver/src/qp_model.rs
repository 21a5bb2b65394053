use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use sqpdir_linalg::{all_finite, quadratic_form, symmetrize};
use sqpdir_types::{Result, SqpError};

use crate::backend::Multipliers;

/// Linear inequality rows `A x >= b`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraints {
    a: DMatrix<f64>,
    b: DVector<f64>,
}

impl LinearConstraints {
    pub fn new(a: DMatrix<f64>, b: DVector<f64>) -> Result<Self> {
        if a.nrows() != b.len() {
            return Err(SqpError::DimensionMismatch(format!(
                "A has {} rows but b has length {}",
                a.nrows(),
                b.len()
            )));
        }
        Ok(LinearConstraints { a, b })
    }

    /// A present but row-less constraint set over `n` variables
    pub fn empty(n: usize) -> Self {
        LinearConstraints {
            a: DMatrix::zeros(0, n),
            b: DVector::zeros(0),
        }
    }

    pub fn a(&self) -> &DMatrix<f64> {
        &self.a
    }

    pub fn b(&self) -> &DVector<f64> {
        &self.b
    }

    pub fn num_rows(&self) -> usize {
        self.b.len()
    }
}

/// Convex QP in canonical form:
/// minimize x^T H x + f^T x
/// subject to A x >= b, lb <= x <= ub
///
/// There is no 1/2 in front of the quadratic term. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticProgram {
    h: DMatrix<f64>,
    f: DVector<f64>,
    constraints: Option<LinearConstraints>,
    lb: DVector<f64>,
    ub: DVector<f64>,
}

impl QuadraticProgram {
    /// Create a QP, failing fast when dimensions disagree.
    ///
    /// H is stored as `(H + H^T) / 2`, so every consumer sees the same quadratic form.
    pub fn new(
        h: DMatrix<f64>,
        f: DVector<f64>,
        constraints: Option<LinearConstraints>,
        lb: DVector<f64>,
        ub: DVector<f64>,
    ) -> Result<Self> {
        let mut qp = QuadraticProgram {
            h,
            f,
            constraints,
            lb,
            ub,
        };
        qp.validate()?;
        qp.h = symmetrize(&qp.h);
        Ok(qp)
    }

    /// Validate model dimensions
    fn validate(&self) -> Result<()> {
        let n = self.num_vars();

        if self.h.nrows() != n || self.h.ncols() != n {
            return Err(SqpError::DimensionMismatch(format!(
                "H must be {}x{}, got {}x{}",
                n,
                n,
                self.h.nrows(),
                self.h.ncols()
            )));
        }

        if let Some(c) = &self.constraints {
            if c.a.ncols() != n {
                return Err(SqpError::DimensionMismatch(format!(
                    "A must have {} columns, got {}",
                    n,
                    c.a.ncols()
                )));
            }
        }

        if self.lb.len() != n || self.ub.len() != n {
            return Err(SqpError::DimensionMismatch(format!(
                "bounds must have length {}, got lb={} ub={}",
                n,
                self.lb.len(),
                self.ub.len()
            )));
        }

        Ok(())
    }

    pub fn h(&self) -> &DMatrix<f64> {
        &self.h
    }

    pub fn f(&self) -> &DVector<f64> {
        &self.f
    }

    pub fn constraints(&self) -> Option<&LinearConstraints> {
        self.constraints.as_ref()
    }

    pub fn lb(&self) -> &DVector<f64> {
        &self.lb
    }

    pub fn ub(&self) -> &DVector<f64> {
        &self.ub
    }

    /// Get number of variables
    pub fn num_vars(&self) -> usize {
        self.f.len()
    }

    /// Number of linear rows; zero both when absent and when present but empty
    pub fn num_constraints(&self) -> usize {
        self.constraints.as_ref().map_or(0, LinearConstraints::num_rows)
    }

    pub fn has_linear_rows(&self) -> bool {
        self.num_constraints() > 0
    }

    pub fn has_finite_bounds(&self) -> bool {
        self.lb.iter().chain(self.ub.iter()).any(|v| v.is_finite())
    }

    /// H, f, A and b are free of NaN and infinities, and no bound is NaN
    pub fn is_numerically_sound(&self) -> bool {
        let data_finite = all_finite(self.h.iter().chain(self.f.iter()))
            && self
                .constraints
                .as_ref()
                .map_or(true, |c| all_finite(c.a.iter().chain(c.b.iter())));
        let bounds_sane = self.lb.iter().chain(self.ub.iter()).all(|v| !v.is_nan());
        data_finite && bounds_sane
    }

    /// Whether some coordinate has an empty interval
    pub fn has_empty_box(&self) -> bool {
        self.lb
            .iter()
            .zip(self.ub.iter())
            .any(|(&l, &u)| l > u || l == f64::INFINITY || u == f64::NEG_INFINITY)
    }

    /// Evaluate x^T H x + f^T x
    pub fn objective(&self, x: &DVector<f64>) -> f64 {
        quadratic_form(&self.h, x) + self.f.dot(x)
    }

    /// Gradient 2 H x + f
    pub fn gradient(&self, x: &DVector<f64>) -> DVector<f64> {
        &self.h * x * 2.0 + &self.f
    }

    /// Stack linear rows and finite bounds into a single `C x >= d` system.
    ///
    /// Normals are stored as columns of an `n x p` matrix. Infinite bounds produce no row.
    pub fn inequality_form(&self) -> InequalityForm {
        let n = self.num_vars();
        let mut origin = Vec::new();
        let mut rhs = Vec::new();

        if let Some(c) = &self.constraints {
            for i in 0..c.num_rows() {
                origin.push(RowOrigin::Constraint(i));
                rhs.push(c.b[i]);
            }
        }
        for j in 0..n {
            if self.lb[j].is_finite() {
                origin.push(RowOrigin::Lower(j));
                rhs.push(self.lb[j]);
            }
        }
        for j in 0..n {
            if self.ub[j].is_finite() {
                origin.push(RowOrigin::Upper(j));
                rhs.push(-self.ub[j]);
            }
        }

        let mut normals = DMatrix::zeros(n, origin.len());
        for (k, row) in origin.iter().enumerate() {
            match *row {
                RowOrigin::Constraint(i) => {
                    if let Some(c) = &self.constraints {
                        for j in 0..n {
                            normals[(j, k)] = c.a[(i, j)];
                        }
                    }
                }
                RowOrigin::Lower(j) => normals[(j, k)] = 1.0,
                RowOrigin::Upper(j) => normals[(j, k)] = -1.0,
            }
        }

        InequalityForm {
            normals,
            rhs: DVector::from_vec(rhs),
            origin,
            num_vars: n,
            num_constraints: self.num_constraints(),
        }
    }
}

/// Where a stacked inequality row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowOrigin {
    Constraint(usize),
    Lower(usize),
    Upper(usize),
}

/// All inequalities of a QP as `normals^T x >= rhs`
#[derive(Debug, Clone)]
pub struct InequalityForm {
    /// Column k is the normal of row k
    pub normals: DMatrix<f64>,
    pub rhs: DVector<f64>,
    pub origin: Vec<RowOrigin>,
    num_vars: usize,
    num_constraints: usize,
}

impl InequalityForm {
    pub fn len(&self) -> usize {
        self.origin.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origin.is_empty()
    }

    /// Slack `normals[:, k]^T x - rhs[k]`
    pub fn slack(&self, k: usize, x: &DVector<f64>) -> f64 {
        self.normals.column(k).dot(x) - self.rhs[k]
    }

    /// Scatter stacked multipliers back onto constraint rows and bounds
    pub fn scatter_multipliers(&self, stacked: &[f64]) -> Multipliers {
        let mut multipliers = Multipliers::zeros(self.num_constraints, self.num_vars);
        for (row, &value) in self.origin.iter().zip(stacked) {
            let value = value.max(0.0);
            match *row {
                RowOrigin::Constraint(i) => multipliers.constraints[i] = value,
                RowOrigin::Lower(j) => multipliers.lower[j] = value,
                RowOrigin::Upper(j) => multipliers.upper[j] = value,
            }
        }
        multipliers
    }
}
