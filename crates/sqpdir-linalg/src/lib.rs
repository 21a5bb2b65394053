//! Dense linear algebra used to build and solve direction-finding QPs.

mod matrix_utils;

pub use matrix_utils::{
    all_finite, cholesky_solve, classify_curvature, is_diagonal, min_norm_solve,
    quadratic_form, symmetrize, Curvature,
};
