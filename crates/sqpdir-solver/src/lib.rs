mod qp_model;
mod backend;
mod config;
mod stats;
mod fast_path;
mod active_set_backend;
mod clarabel_backend;
mod solver;

pub use qp_model::{QuadraticProgram, LinearConstraints, InequalityForm, RowOrigin};
pub use backend::{QpBackend, QpSolution, Multipliers};
pub use config::{SolverConfig, BackendKind};
pub use stats::{SolveStats, StatsSnapshot};
pub use active_set_backend::ActiveSetBackend;
pub use clarabel_backend::ClarabelBackend;
pub use solver::QpSolver;
pub use sqpdir_types::QpStatus;

#[cfg(test)]
mod tests;
