//! Errors raised by adapters.
//!
//! [`AdapterError`] is what an adapter implementation reports from `load`,
//! `unload` or one of its operations. The gateway wraps it with adapter and
//! operation names before surfacing it to callers.

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdapterError {
    /// Loading the underlying model or engine failed.
    #[error("load failed: {0}")]
    LoadFailed(String),

    /// Releasing the underlying model or engine failed.
    #[error("unload failed: {0}")]
    UnloadFailed(String),

    /// The parameter bag was missing a key or carried a value of the wrong shape.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// The operation itself failed.
    #[error("execution failed: {0}")]
    Execution(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl AdapterError {
    /// Shorthand for a missing-parameter error.
    pub fn missing_param(key: &str) -> Self {
        Self::InvalidParams(format!("missing required parameter '{}'", key))
    }
}

pub type AdapterResult<T> = Result<T, AdapterError>;
