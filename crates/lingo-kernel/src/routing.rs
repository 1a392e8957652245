//! Static task routing table.
//!
//! Maps abstract task identifiers (`"transcribe"`, `"chat"`, ...) to a
//! concrete adapter name and the operation to run on it. This is
//! configuration, not code: it is normally deserialized alongside the rest
//! of [`GatewayConfig`](crate::config::GatewayConfig).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Operation used when a task has no explicit operation mapping.
pub const DEFAULT_OPERATION: &str = "execute";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTable {
    /// task type → adapter name
    #[serde(default)]
    pub routes: HashMap<String, String>,
    /// task type → operation name
    #[serde(default)]
    pub operations: HashMap<String, String>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: route `task` to `adapter`.
    pub fn with_route(mut self, task: impl Into<String>, adapter: impl Into<String>) -> Self {
        self.routes.insert(task.into(), adapter.into());
        self
    }

    /// Builder: run `operation` for `task` instead of [`DEFAULT_OPERATION`].
    pub fn with_operation(mut self, task: impl Into<String>, operation: impl Into<String>) -> Self {
        self.operations.insert(task.into(), operation.into());
        self
    }

    pub fn adapter_for(&self, task: &str) -> Option<&str> {
        self.routes.get(task).map(String::as_str)
    }

    pub fn operation_for(&self, task: &str) -> &str {
        self.operations
            .get(task)
            .map(String::as_str)
            .unwrap_or(DEFAULT_OPERATION)
    }

    /// Routed task types, sorted.
    pub fn tasks(&self) -> Vec<&str> {
        let mut tasks: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        tasks.sort_unstable();
        tasks
    }
}
