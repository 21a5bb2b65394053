//! Formulation of the per-iteration direction-finding QP and its solve.

mod qp_builder;
mod direction;

pub use qp_builder::QpBuilder;
pub use direction::{Direction, DirectionFinder};
