//! Error types for the shield risk core

use thiserror::Error;

/// Shield core error
#[derive(Debug, Error)]
pub enum ShieldError {
    /// Request rejected at the boundary (e.g. neither text nor transaction)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Field-level validation failure
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<validator::ValidationErrors> for ShieldError {
    fn from(err: validator::ValidationErrors) -> Self {
        ShieldError::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for ShieldError {
    fn from(err: config::ConfigError) -> Self {
        ShieldError::Config(err.to_string())
    }
}

/// Failure reported by an external predictor.
///
/// Never escapes the model adapter: it is folded into a neutral or absent score.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PredictorError {
    /// Predictor not deployed or its artifacts are missing
    #[error("predictor unavailable: {0}")]
    Unavailable(String),

    /// Predictor raised during inference
    #[error("prediction failed: {0}")]
    Failed(String),
}

/// Result type
pub type Result<T> = std::result::Result<T, ShieldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShieldError::InvalidInput("no text".to_string());
        assert_eq!(err.to_string(), "Invalid input: no text");

        let err = PredictorError::Unavailable("model file missing".to_string());
        assert_eq!(err.to_string(), "predictor unavailable: model file missing");
    }
}
