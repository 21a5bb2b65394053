use serde::{Deserialize, Serialize};
use sqpdir_types::{Result, SqpError};
use std::fmt;
use std::str::FromStr;

/// Which QP algorithm runs behind the solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Dense dual active-set method (Goldfarb-Idnani)
    #[serde(alias = "dual")]
    ActiveSet,
    /// Clarabel interior-point method
    #[serde(alias = "clarabel")]
    InteriorPoint,
}

impl FromStr for BackendKind {
    type Err = SqpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active-set" | "activeset" | "dual" => Ok(BackendKind::ActiveSet),
            "interior-point" | "interiorpoint" | "clarabel" => Ok(BackendKind::InteriorPoint),
            other => Err(SqpError::Config(format!("unknown QP backend '{}'", other))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::ActiveSet => write!(f, "active-set"),
            BackendKind::InteriorPoint => write!(f, "interior-point"),
        }
    }
}

/// Configuration for the QP solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Backend used for problems with linear rows or non-diagonal curvature
    pub backend: BackendKind,

    /// Feasibility and optimality tolerance
    pub tolerance: f64,

    /// Cap on internal iterations; exceeding it is a numerical failure
    pub max_iterations: usize,

    /// Let the backend report progress. Off by default so nothing reaches the console.
    pub verbose: bool,

    /// Relative eigenvalue threshold below which H is declared non-convex
    pub psd_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            backend: BackendKind::ActiveSet,
            tolerance: 1e-8,
            max_iterations: 1000,
            verbose: false,
            psd_tolerance: 1e-10,
        }
    }
}

impl SolverConfig {
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Parse a configuration from JSON; absent fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SolverConfig =
            serde_json::from_str(json).map_err(|e| SqpError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(SqpError::Config(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if !(self.psd_tolerance >= 0.0 && self.psd_tolerance.is_finite()) {
            return Err(SqpError::Config(format!(
                "psd_tolerance must be non-negative, got {}",
                self.psd_tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(SqpError::Config("max_iterations must be at least 1".to_string()));
        }
        Ok(())
    }
}
