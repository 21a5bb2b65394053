use nalgebra::{DMatrix, DVector};

use sqpdir_linalg::symmetrize;
use sqpdir_solver::{LinearConstraints, QuadraticProgram};
use sqpdir_types::{Result, SqpError};

/// A block of linearized rows `A d >= b`
#[derive(Debug, Clone)]
struct RowBlock {
    a: DMatrix<f64>,
    b: DVector<f64>,
}

/// Builder for the per-iteration direction QP.
///
/// The curvature matrix is taken in the optimizer's convention, where the model
/// of the objective is `0.5 d^T H_raw d + f^T d`. The QP stores `H = H_raw / 2`
/// so that its objective reads `d^T H d + f^T d`. This halving happens here and
/// nowhere else.
#[derive(Debug, Clone, Default)]
pub struct QpBuilder {
    curvature: Option<DMatrix<f64>>,
    linear: Option<DVector<f64>>,
    rows: Vec<RowBlock>,
    lb: Option<DVector<f64>>,
    ub: Option<DVector<f64>>,
}

impl QpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Curvature estimate `H_raw` as maintained by the BFGS update
    pub fn curvature(mut self, h_raw: DMatrix<f64>) -> Self {
        self.curvature = Some(h_raw);
        self
    }

    /// Linear term `f`; zero when never set
    pub fn linear_term(mut self, f: DVector<f64>) -> Self {
        self.linear = Some(f);
        self
    }

    /// Linearized constraint rows `A d >= b`
    pub fn constraint_rows(mut self, a: DMatrix<f64>, b: DVector<f64>) -> Self {
        self.rows.push(RowBlock { a, b });
        self
    }

    /// Rows that may be missing. Unless both `a` and `b` are given nothing is added,
    /// so the QP carries no linear rows at all.
    pub fn maybe_constraint_rows(self, a: Option<DMatrix<f64>>, b: Option<DVector<f64>>) -> Self {
        match (a, b) {
            (Some(a), Some(b)) => self.constraint_rows(a, b),
            _ => self,
        }
    }

    /// Single aggregated feasibility row `gradient^T d >= rhs`
    pub fn steering_row(self, gradient: DVector<f64>, rhs: f64) -> Self {
        let a = DMatrix::from_row_slice(1, gradient.len(), gradient.as_slice());
        self.constraint_rows(a, DVector::from_element(1, rhs))
    }

    /// Box bounds on the direction; unbounded when never set
    pub fn bounds(mut self, lb: DVector<f64>, ub: DVector<f64>) -> Self {
        self.lb = Some(lb);
        self.ub = Some(ub);
        self
    }

    /// Assemble the QP, failing on any shape disagreement
    pub fn build(&self) -> Result<QuadraticProgram> {
        let h_raw = self
            .curvature
            .as_ref()
            .ok_or_else(|| SqpError::DimensionMismatch("no curvature matrix supplied".to_string()))?;

        if h_raw.nrows() != h_raw.ncols() {
            return Err(SqpError::DimensionMismatch(format!(
                "curvature must be square, got {}x{}",
                h_raw.nrows(),
                h_raw.ncols()
            )));
        }
        let n = h_raw.nrows();

        let h = symmetrize(h_raw) * 0.5;
        let f = self.linear.clone().unwrap_or_else(|| DVector::zeros(n));
        let lb = self
            .lb
            .clone()
            .unwrap_or_else(|| DVector::from_element(n, f64::NEG_INFINITY));
        let ub = self
            .ub
            .clone()
            .unwrap_or_else(|| DVector::from_element(n, f64::INFINITY));

        let constraints = if self.rows.is_empty() {
            None
        } else {
            Some(self.stack_rows(n)?)
        };

        QuadraticProgram::new(h, f, constraints, lb, ub)
    }

    fn stack_rows(&self, n: usize) -> Result<LinearConstraints> {
        let mut total = 0;
        for (k, block) in self.rows.iter().enumerate() {
            if block.a.ncols() != n {
                return Err(SqpError::DimensionMismatch(format!(
                    "row block {} has {} columns, expected {}",
                    k,
                    block.a.ncols(),
                    n
                )));
            }
            if block.a.nrows() != block.b.len() {
                return Err(SqpError::DimensionMismatch(format!(
                    "row block {} has {} rows but {} right-hand sides",
                    k,
                    block.a.nrows(),
                    block.b.len()
                )));
            }
            total += block.b.len();
        }

        let mut a = DMatrix::zeros(total, n);
        let mut b = DVector::zeros(total);
        let mut row = 0;
        for block in &self.rows {
            let m = block.b.len();
            a.rows_mut(row, m).copy_from(&block.a);
            b.rows_mut(row, m).copy_from(&block.b);
            row += m;
        }

        LinearConstraints::new(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curvature_is_halved_once() {
        let qp = QpBuilder::new()
            .curvature(DMatrix::identity(2, 2) * 4.0)
            .linear_term(DVector::from_vec(vec![1.0, 2.0]))
            .build()
            .unwrap();
        assert_eq!(qp.h()[(0, 0)], 2.0);
        assert_eq!(qp.h()[(1, 1)], 2.0);
    }

    #[test]
    fn test_asymmetric_curvature_is_symmetrized() {
        let qp = QpBuilder::new()
            .curvature(DMatrix::from_row_slice(2, 2, &[2.0, 2.0, 0.0, 2.0]))
            .build()
            .unwrap();
        assert_eq!(qp.h()[(0, 1)], 0.5);
        assert_eq!(qp.h()[(1, 0)], 0.5);
    }

    #[test]
    fn test_defaults() {
        let qp = QpBuilder::new()
            .curvature(DMatrix::identity(3, 3))
            .build()
            .unwrap();
        assert_eq!(qp.f(), &DVector::<f64>::zeros(3));
        assert!(qp.constraints().is_none());
        assert!(qp.lb().iter().all(|v| *v == f64::NEG_INFINITY));
        assert!(qp.ub().iter().all(|v| *v == f64::INFINITY));
    }

    #[test]
    fn test_missing_rows_are_omitted() {
        let qp = QpBuilder::new()
            .curvature(DMatrix::identity(2, 2))
            .maybe_constraint_rows(Some(DMatrix::identity(2, 2)), None)
            .build()
            .unwrap();
        assert!(qp.constraints().is_none());
    }

    #[test]
    fn test_rows_are_stacked_in_order() {
        let qp = QpBuilder::new()
            .curvature(DMatrix::identity(2, 2))
            .constraint_rows(
                DMatrix::from_row_slice(1, 2, &[1.0, 0.0]),
                DVector::from_vec(vec![0.5]),
            )
            .steering_row(DVector::from_vec(vec![-1.0, 3.0]), -2.0)
            .build()
            .unwrap();

        let c = qp.constraints().unwrap();
        assert_eq!(c.num_rows(), 2);
        assert_eq!(c.a()[(1, 0)], -1.0);
        assert_eq!(c.a()[(1, 1)], 3.0);
        assert_eq!(c.b()[1], -2.0);
    }

    #[test]
    fn test_shape_errors() {
        let missing = QpBuilder::new().build();
        assert!(matches!(missing, Err(SqpError::DimensionMismatch(_))));

        let not_square = QpBuilder::new().curvature(DMatrix::zeros(2, 3)).build();
        assert!(matches!(not_square, Err(SqpError::DimensionMismatch(_))));

        let wrong_row = QpBuilder::new()
            .curvature(DMatrix::identity(2, 2))
            .steering_row(DVector::from_vec(vec![1.0, 1.0, 1.0]), 0.0)
            .build();
        assert!(matches!(wrong_row, Err(SqpError::DimensionMismatch(_))));

        let wrong_rhs = QpBuilder::new()
            .curvature(DMatrix::identity(2, 2))
            .constraint_rows(DMatrix::identity(2, 2), DVector::zeros(3))
            .build();
        assert!(matches!(wrong_rhs, Err(SqpError::DimensionMismatch(_))));

        let wrong_bounds = QpBuilder::new()
            .curvature(DMatrix::identity(2, 2))
            .bounds(DVector::zeros(1), DVector::zeros(2))
            .build();
        assert!(matches!(wrong_bounds, Err(SqpError::DimensionMismatch(_))));

        let wrong_f = QpBuilder::new()
            .curvature(DMatrix::identity(2, 2))
            .linear_term(DVector::zeros(4))
            .build();
        assert!(matches!(wrong_f, Err(SqpError::DimensionMismatch(_))));
    }
}
