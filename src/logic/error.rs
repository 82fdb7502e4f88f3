//! Error Types
//!
//! One enum per concern, plus `GestureError` as the umbrella returned by
//! pipeline stages.

use thiserror::Error;

use super::skeleton::Joint;

/// Errors raised by the HMM engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HmmError {
    /// π, a row of A or a row of B is not a probability distribution
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// Nothing to evaluate yet
    #[error("Observation sequence is empty")]
    EmptySequence,

    /// Symbol outside the emission alphabet
    #[error("Symbol {symbol} at position {position} is outside the alphabet (size {alphabet})")]
    SymbolOutOfRange {
        symbol: usize,
        position: usize,
        alphabet: usize,
    },
}

/// Errors raised by a correction function for a single joint
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CorrectionError {
    #[error("No correction known for joint {0}")]
    UnknownJoint(Joint),

    #[error("Point for joint {joint} is out of range: {reason}")]
    OutOfRange { joint: Joint, reason: String },
}

/// Configuration loading / validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Umbrella error for stage processing
#[derive(Debug, Error)]
pub enum GestureError {
    #[error(transparent)]
    Hmm(#[from] HmmError),

    #[error(transparent)]
    Correction(#[from] CorrectionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Stage '{stage}' failed: {reason}")]
    Stage { stage: String, reason: String },
}

pub type GestureResult<T> = Result<T, GestureError>;
