// Error taxonomy for the clustering core.
//
// Application code works with anyhow::Result like everywhere else in the
// crate. The core stages return PipelineError so callers (and tests) can tell
// a schema problem from a misconfiguration or a provider failure.

use thiserror::Error;

/// Errors raised by the core stages.
#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    /// A stage's required field is absent from the input schema.
    #[error("required field '{field}' is missing from the input records")]
    MissingField { field: String },

    /// Data is present but cannot be interpreted by the stage.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The run parameters cannot produce a meaningful result.
    #[error("misconfiguration: {0}")]
    Misconfiguration(String),

    /// The embedding provider could not produce vectors.
    #[error("embedding provider failed: {0}")]
    Provider(String),
}

impl PipelineError {
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn misconfiguration(msg: impl Into<String>) -> Self {
        Self::Misconfiguration(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }
}

/// Result alias for the core stages.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
