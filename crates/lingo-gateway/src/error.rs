//! Gateway error types

use lingo_kernel::config::ConfigError;
use lingo_kernel::error::AdapterError;
use lingo_kernel::types::ErrorKind;
use thiserror::Error;

/// Runtime errors raised inside the gateway.
///
/// `invoke` and `execute_task` never return these directly; they are folded
/// into an [`InvocationResult`](lingo_kernel::InvocationResult) using
/// [`GatewayError::kind`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    // ── Registration ────────────────────────────────────────────────────────
    #[error("adapter '{0}' is not registered")]
    NotRegistered(String),

    #[error("adapter '{adapter}' has no operation '{operation}'")]
    UnknownOperation { adapter: String, operation: String },

    #[error("invalid adapter spec: {0}")]
    InvalidSpec(String),

    /// A routed task points at a registered adapter lacking the routed operation.
    #[error("task '{task}' routes to '{adapter}' which has no operation '{operation}'")]
    InvalidRoute {
        task: String,
        adapter: String,
        operation: String,
    },

    // ── Routing ─────────────────────────────────────────────────────────────
    #[error("no route for task '{0}'")]
    UnknownTask(String),

    #[error("task '{task}' routes to unregistered adapter '{adapter}'")]
    UnroutedAdapter { task: String, adapter: String },

    // ── Lifecycle ───────────────────────────────────────────────────────────
    #[error("failed to load adapter '{adapter}': {reason}")]
    LoadFailed { adapter: String, reason: String },

    #[error(
        "memory budget exceeded loading '{adapter}': need {needed_mb}MB with {used_mb}MB of {budget_mb}MB in use"
    )]
    MemoryPressure {
        adapter: String,
        needed_mb: u64,
        used_mb: u64,
        budget_mb: u64,
    },

    // ── Invocation ──────────────────────────────────────────────────────────
    #[error("timeout after {timeout_ms}ms running '{operation}' on adapter '{adapter}'")]
    Timeout {
        adapter: String,
        operation: String,
        timeout_ms: u64,
    },

    #[error("operation '{operation}' failed on adapter '{adapter}': {source}")]
    OperationFailed {
        adapter: String,
        operation: String,
        #[source]
        source: AdapterError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl GatewayError {
    /// Classification reported to gateway callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotRegistered(_)
            | Self::UnknownOperation { .. }
            | Self::InvalidSpec(_)
            | Self::InvalidRoute { .. }
            | Self::Config(_) => ErrorKind::Registration,
            Self::UnknownTask(_) | Self::UnroutedAdapter { .. } => ErrorKind::Routing,
            Self::LoadFailed { .. } => ErrorKind::LoadFailure,
            Self::MemoryPressure { .. } => ErrorKind::MemoryPressure,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::OperationFailed { .. } => ErrorKind::OperationFailure,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
