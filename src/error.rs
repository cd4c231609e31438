//! Error types for simulation, auction and training operations

use thiserror::Error;

/// Errors that can occur during simulation and auction operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("matrix shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("insufficient experience: requested {requested}, stored {stored}")]
    InsufficientExperience { requested: usize, stored: usize },
    #[error("unknown node: {0}")]
    UnknownNode(usize),
}

/// A specialized Result type for simulation operations
pub type Result<T> = std::result::Result<T, Error>;
