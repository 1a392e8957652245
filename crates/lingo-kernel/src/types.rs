//! Shared types for the model lifecycle gateway.
//!
//! These types describe adapters (what they are, how much they cost to keep
//! resident, how eagerly they may be evicted) and the uniform result shape
//! returned to gateway callers, independent of the runtime that manages them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Category of computation an adapter performs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdapterKind {
    SpeechToText,
    TextToSpeech,
    Generation,
    Scoring,
    Translation,
    /// Anything not covered above; the tag is free text.
    Other(String),
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpeechToText => write!(f, "speech-to-text"),
            Self::TextToSpeech => write!(f, "text-to-speech"),
            Self::Generation => write!(f, "generation"),
            Self::Scoring => write!(f, "scoring"),
            Self::Translation => write!(f, "translation"),
            Self::Other(tag) => write!(f, "{}", tag),
        }
    }
}

/// Eviction priority of an adapter.
///
/// Ordered so that `Critical < High < Normal < Low`. A higher ordinal means the
/// adapter is given up sooner under memory pressure. `Critical` adapters are
/// never evicted and never idle-swept.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PriorityTier {
    Critical,
    High,
    #[default]
    Normal,
    Low,
}

impl PriorityTier {
    /// Whether the evictor and idle sweeper may unload adapters of this tier.
    pub fn is_evictable(self) -> bool {
        self != Self::Critical
    }
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::High => write!(f, "high"),
            Self::Normal => write!(f, "normal"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Lifecycle state of a registered adapter.
///
/// ```text
/// Unloaded -> Loading -> Ready <-> Busy
///                        Ready -> Unloading -> Unloaded
/// (any) -> Error -> (retried as if Unloaded)
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterStatus {
    #[default]
    Unloaded,
    Loading,
    Ready,
    Busy,
    Unloading,
    Error,
}

impl AdapterStatus {
    /// True when an instance is resident (`Ready` or `Busy`).
    pub fn is_loaded(self) -> bool {
        matches!(self, Self::Ready | Self::Busy)
    }
}

impl fmt::Display for AdapterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Busy => "busy",
            Self::Unloading => "unloading",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

fn default_idle_timeout_secs() -> u64 {
    300
}

/// Static metadata describing one adapter.
///
/// Everything the gateway needs for capacity planning, minus the load/unload
/// behaviour which is supplied separately at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterSpec {
    /// Unique registry key.
    pub name: String,
    pub kind: AdapterKind,
    #[serde(default)]
    pub description: String,
    /// Resident memory estimate used for budget accounting.
    #[serde(default)]
    pub estimated_memory_mb: u64,
    #[serde(default)]
    pub priority: PriorityTier,
    /// Seconds without use after which the idle sweeper unloads the adapter.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Load during `preload` without an explicit name list.
    #[serde(default)]
    pub preload: bool,
}

impl AdapterSpec {
    pub fn new(name: impl Into<String>, kind: AdapterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            estimated_memory_mb: 0,
            priority: PriorityTier::default(),
            idle_timeout_secs: default_idle_timeout_secs(),
            preload: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_memory_mb(mut self, memory_mb: u64) -> Self {
        self.estimated_memory_mb = memory_mb;
        self
    }

    pub fn with_priority(mut self, priority: PriorityTier) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_idle_timeout_secs(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }

    pub fn with_preload(mut self, preload: bool) -> Self {
        self.preload = preload;
        self
    }
}

/// Classification of a failed gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Unregistered adapter or unknown operation.
    Registration,
    /// Unknown task type or a route to an unregistered adapter.
    Routing,
    LoadFailure,
    Timeout,
    OperationFailure,
    /// Load refused because the memory budget could not be met.
    MemoryPressure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Registration => "registration",
            Self::Routing => "routing",
            Self::LoadFailure => "load-failure",
            Self::Timeout => "timeout",
            Self::OperationFailure => "operation-failure",
            Self::MemoryPressure => "memory-pressure",
        };
        f.write_str(s)
    }
}

/// Outcome of an invocation. Failures are values, never panics or `Err`s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub latency_ms: u64,
    pub adapter_name: String,
}

impl InvocationResult {
    pub fn ok(adapter_name: impl Into<String>, data: Value, latency_ms: u64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
            latency_ms,
            adapter_name: adapter_name.into(),
        }
    }

    pub fn failed(
        adapter_name: impl Into<String>,
        kind: ErrorKind,
        error: impl Into<String>,
        latency_ms: u64,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            error_kind: Some(kind),
            latency_ms,
            adapter_name: adapter_name.into(),
        }
    }
}
