mod error;
mod status;

pub use error::{Result, SqpError};
pub use status::QpStatus;
