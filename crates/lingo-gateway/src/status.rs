//! Read-only status reporting.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use lingo_kernel::types::{AdapterKind, AdapterStatus, PriorityTier};
use serde::Serialize;

use crate::gateway::Gateway;

/// Per-adapter view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdapterSummary {
    pub status: AdapterStatus,
    pub kind: AdapterKind,
    pub description: String,
    pub memory_mb: u64,
    pub priority: PriorityTier,
    pub request_count: u64,
    pub avg_latency_ms: f64,
    pub error_count: u64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub idle_timeout_secs: u64,
    pub operations: Vec<String>,
}

/// Gateway-wide aggregates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewaySummary {
    pub uptime_secs: u64,
    pub total_requests: u64,
    pub total_errors: u64,
    pub used_memory_mb: u64,
    pub max_memory_mb: u64,
    pub registered_adapters: usize,
    /// Resident adapters, in registration order
    pub loaded_adapters: Vec<String>,
    pub sweeper_running: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayStatus {
    pub gateway: GatewaySummary,
    pub adapters: BTreeMap<String, AdapterSummary>,
}

impl Gateway {
    /// Snapshot of every adapter plus gateway aggregates. Never mutates state.
    pub fn status(&self) -> GatewayStatus {
        let mut adapters = BTreeMap::new();
        let mut loaded_adapters = Vec::new();
        let mut total_requests = 0;
        let mut total_errors = 0;
        let mut used_memory_mb: u64 = 0;

        for record in self.inner.registry.records() {
            let state = record.state();
            if state.status.is_loaded() {
                loaded_adapters.push(record.name().to_string());
                used_memory_mb = used_memory_mb.saturating_add(record.spec.estimated_memory_mb);
            }
            total_requests += state.request_count;
            total_errors += state.error_count;

            let avg_latency_ms = if state.request_count == 0 {
                0.0
            } else {
                state.total_latency_ms as f64 / state.request_count as f64
            };

            adapters.insert(
                record.name().to_string(),
                AdapterSummary {
                    status: state.status,
                    kind: record.spec.kind.clone(),
                    description: record.spec.description.clone(),
                    memory_mb: record.spec.estimated_memory_mb,
                    priority: record.spec.priority,
                    request_count: state.request_count,
                    avg_latency_ms,
                    error_count: state.error_count,
                    last_used_at: state.last_used_at,
                    idle_timeout_secs: record.spec.idle_timeout_secs,
                    operations: record.adapter.operation_names(),
                },
            );
        }

        GatewayStatus {
            gateway: GatewaySummary {
                uptime_secs: self.inner.started_at.elapsed().as_secs(),
                total_requests,
                total_errors,
                used_memory_mb,
                max_memory_mb: self.inner.config.max_memory_mb,
                registered_adapters: self.inner.registry.len(),
                loaded_adapters,
                sweeper_running: self.inner.sweeper.is_running(),
            },
            adapters,
        }
    }

    /// Current lifecycle state of one adapter.
    pub fn adapter_status(&self, name: &str) -> Option<AdapterStatus> {
        self.inner.registry.get(name).map(|record| record.status())
    }
}
