//! Memory-pressure eviction.
//!
//! Victims are `Ready`, non-critical adapters, taken lowest priority first
//! (`Low` before `Normal` before `High`) and least recently used first within
//! a tier. An adapter that was never used counts as the oldest.

use std::cmp::Reverse;
use std::sync::Arc;

use lingo_kernel::types::{AdapterStatus, PriorityTier};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::gateway::Gateway;
use crate::registry::AdapterRecord;

/// Snapshot of one eviction candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub name: String,
    pub priority: PriorityTier,
    pub last_used: Option<Instant>,
    pub memory_mb: u64,
}

/// Sort candidates into eviction order.
pub(crate) fn eviction_order(candidates: &mut [Candidate]) {
    candidates.sort_by_key(|c| (Reverse(c.priority), c.last_used));
}

fn candidate_of(record: &AdapterRecord) -> Option<Candidate> {
    let state = record.state();
    if state.status != AdapterStatus::Ready || !record.spec.priority.is_evictable() {
        return None;
    }
    Some(Candidate {
        name: record.name().to_string(),
        priority: record.spec.priority,
        last_used: state.last_used,
        memory_mb: record.spec.estimated_memory_mb,
    })
}

impl Gateway {
    /// Unload adapters until at least `needed_mb` has been freed or no
    /// candidates remain. Returns the memory actually freed.
    ///
    /// `requester` is never chosen. Candidates whose lifecycle lock is held
    /// are mid-transition and skipped rather than waited on.
    pub(crate) async fn free_memory(&self, needed_mb: u64, requester: &str) -> u64 {
        let records: Vec<Arc<AdapterRecord>> = self
            .inner
            .registry
            .records()
            .into_iter()
            .filter(|r| r.name() != requester)
            .collect();

        let mut candidates: Vec<Candidate> = records.iter().filter_map(|r| candidate_of(r)).collect();
        eviction_order(&mut candidates);
        debug!(
            needed_mb,
            candidates = ?candidates.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            "eviction candidates"
        );

        let mut freed_mb = 0;
        for candidate in candidates {
            if freed_mb >= needed_mb {
                break;
            }
            let Some(record) = self.inner.registry.get(&candidate.name) else {
                continue;
            };
            let Ok(_lifecycle) = record.lifecycle.clone().try_lock_owned() else {
                warn!(adapter = %candidate.name, "eviction victim is mid-transition, skipping");
                continue;
            };
            if self.unload_locked(&record).await {
                freed_mb = freed_mb.saturating_add(candidate.memory_mb);
                info!(
                    adapter = %candidate.name,
                    priority = %candidate.priority,
                    freed_mb = candidate.memory_mb,
                    "evicted adapter"
                );
            }
        }

        if freed_mb < needed_mb {
            warn!(needed_mb, freed_mb, "eviction could not free the requested memory");
        }
        freed_mb
    }
}
