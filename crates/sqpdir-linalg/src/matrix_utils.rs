use nalgebra::{DMatrix, DVector, SymmetricEigen};
use serde::{Deserialize, Serialize};
use sqpdir_types::{Result, SqpError};

/// Curvature class of a symmetric matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Curvature {
    PositiveDefinite,
    PositiveSemidefinite,
    Indefinite,
}

impl Curvature {
    pub fn is_convex(self) -> bool {
        self != Curvature::Indefinite
    }
}

/// Return (M + M^T) / 2. The quadratic form x^T M x is unchanged.
pub fn symmetrize(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    (matrix + matrix.transpose()) * 0.5
}

/// Check that every off-diagonal entry is below `tolerance` in magnitude
pub fn is_diagonal(matrix: &DMatrix<f64>, tolerance: f64) -> bool {
    if matrix.nrows() != matrix.ncols() {
        return false;
    }
    let n = matrix.ncols();
    matrix.iter().enumerate().all(|(i, &val)| {
        // column-major storage
        let row = i % n;
        let col = i / n;
        row == col || val.abs() <= tolerance
    })
}

pub fn all_finite<'a>(values: impl IntoIterator<Item = &'a f64>) -> bool {
    values.into_iter().all(|v| v.is_finite())
}

/// Evaluate x^T M x
pub fn quadratic_form(matrix: &DMatrix<f64>, x: &DVector<f64>) -> f64 {
    x.dot(&(matrix * x))
}

/// Classify a symmetric matrix by the sign of its spectrum.
///
/// A successful Cholesky factorization is taken as proof of definiteness. Otherwise the
/// eigenvalues are computed and the smallest one is compared against
/// `-rel_tolerance * max(1, max |eigenvalue|)`.
pub fn classify_curvature(matrix: &DMatrix<f64>, rel_tolerance: f64) -> Curvature {
    if matrix.nrows() == 0 || matrix.clone().cholesky().is_some() {
        return Curvature::PositiveDefinite;
    }

    let eigen = SymmetricEigen::new(matrix.clone());
    let scale = eigen.eigenvalues.amax().max(1.0);
    let min_eig = eigen.eigenvalues.min();
    tracing::trace!(min_eig, scale, "cholesky failed, classified by eigenvalues");

    if min_eig < -rel_tolerance * scale {
        Curvature::Indefinite
    } else {
        Curvature::PositiveSemidefinite
    }
}

/// Solve M x = rhs for symmetric positive definite M
pub fn cholesky_solve(matrix: &DMatrix<f64>, rhs: &DVector<f64>) -> Result<DVector<f64>> {
    if matrix.nrows() != rhs.len() {
        return Err(SqpError::DimensionMismatch(format!(
            "matrix has {} rows, right-hand side has {}",
            matrix.nrows(),
            rhs.len()
        )));
    }
    let chol = matrix
        .clone()
        .cholesky()
        .ok_or_else(|| SqpError::Singular("Cholesky factorization broke down".to_string()))?;
    Ok(chol.solve(rhs))
}

/// Minimum-norm least-squares solution of M x = rhs.
///
/// Returns the solution together with the residual norm ||M x - rhs||, which is
/// non-zero when rhs does not lie in the range of M.
pub fn min_norm_solve(
    matrix: &DMatrix<f64>,
    rhs: &DVector<f64>,
    tolerance: f64,
) -> Result<(DVector<f64>, f64)> {
    if matrix.nrows() != rhs.len() {
        return Err(SqpError::DimensionMismatch(format!(
            "matrix has {} rows, right-hand side has {}",
            matrix.nrows(),
            rhs.len()
        )));
    }
    let svd = matrix.clone().svd(true, true);
    let eps = tolerance * svd.singular_values.amax().max(1.0);
    let x = svd
        .solve(rhs, eps)
        .map_err(|e| SqpError::Singular(e.to_string()))?;
    let residual = (matrix * &x - rhs).norm();
    Ok((x, residual))
}
