//! Gateway configuration.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{ConfigError, ConfigResult, FileFormat};
use crate::routing::RoutingTable;
use crate::types::AdapterSpec;

/// Prefix for environment overrides, e.g. `LINGO__MAX_MEMORY_MB`.
pub const ENV_PREFIX: &str = "LINGO";

/// What to do when eviction cannot free enough memory for a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverBudgetPolicy {
    /// Load anyway and exceed the budget.
    #[default]
    Proceed,
    /// Refuse the load.
    Refuse,
}

fn default_max_memory_mb() -> u64 {
    8192
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Memory budget shared by all resident adapters
    #[serde(default = "default_max_memory_mb")]
    pub max_memory_mb: u64,
    /// Idle sweeper period
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Invocation timeout used when the caller does not pass one
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    #[serde(default)]
    pub over_budget: OverBudgetPolicy,
    #[serde(default)]
    pub routing: RoutingTable,
    /// Adapter metadata, matched to loaders by name at registration
    #[serde(default)]
    pub adapters: Vec<AdapterSpec>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_memory_mb: default_max_memory_mb(),
            sweep_interval_secs: default_sweep_interval_secs(),
            default_timeout_ms: default_timeout_ms(),
            over_budget: OverBudgetPolicy::default(),
            routing: RoutingTable::default(),
            adapters: Vec::new(),
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a file and apply `LINGO__*` environment overrides.
    pub fn from_file(path: &str) -> ConfigResult<Self> {
        let config: Self = super::load_with_env(path, ENV_PREFIX)?;
        config.validate()?;
        Ok(config)
    }

    /// Load several files, later ones overriding earlier ones.
    pub fn from_files(paths: &[&str]) -> ConfigResult<Self> {
        let config: Self = super::load_merged(paths)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_str_with_format(content: &str, format: FileFormat) -> ConfigResult<Self> {
        let config: Self = super::from_str(content, format)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_memory_mb(mut self, mb: u64) -> Self {
        self.max_memory_mb = mb;
        self
    }

    pub fn with_sweep_interval_secs(mut self, secs: u64) -> Self {
        self.sweep_interval_secs = secs;
        self
    }

    pub fn with_default_timeout_ms(mut self, ms: u64) -> Self {
        self.default_timeout_ms = ms;
        self
    }

    pub fn with_over_budget(mut self, policy: OverBudgetPolicy) -> Self {
        self.over_budget = policy;
        self
    }

    pub fn with_routing(mut self, routing: RoutingTable) -> Self {
        self.routing = routing;
        self
    }

    pub fn with_adapter(mut self, spec: AdapterSpec) -> Self {
        self.adapters.push(spec);
        self
    }

    /// Metadata configured for `name`, if any.
    pub fn adapter_spec(&self, name: &str) -> Option<&AdapterSpec> {
        self.adapters.iter().find(|spec| spec.name == name)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_memory_mb == 0 {
            return Err(ConfigError::Invalid("max_memory_mb must be greater than 0".into()));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "sweep_interval_secs must be greater than 0".into(),
            ));
        }
        if self.default_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "default_timeout_ms must be greater than 0".into(),
            ));
        }

        let mut seen = HashSet::new();
        for spec in &self.adapters {
            if spec.name.trim().is_empty() {
                return Err(ConfigError::Invalid("adapter name cannot be empty".into()));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "adapter '{}' is configured more than once",
                    spec.name
                )));
            }
        }
        Ok(())
    }
}
