use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqpError {
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Non-convex curvature: {0}")]
    NonConvex(String),

    #[error("Singular system: {0}")]
    Singular(String),

    #[error("Non-finite value: {0}")]
    NonFinite(String),

    #[error("Iteration limit reached after {0} iterations")]
    IterationLimit(usize),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SqpError>;
