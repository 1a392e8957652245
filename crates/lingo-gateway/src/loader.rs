//! Lazy loading and unloading.
//!
//! Every load/unload of a given adapter runs under that adapter's lifecycle
//! mutex, so transitions for one name are totally ordered while different
//! names proceed concurrently. Concurrent `ensure_loaded` calls for the same
//! unloaded adapter collapse into a single `load()`.

use std::sync::Arc;

use lingo_kernel::config::OverBudgetPolicy;
use lingo_kernel::types::AdapterStatus;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::Gateway;
use crate::invoker::duration_ms;
use crate::registry::AdapterRecord;

impl Gateway {
    /// Make sure `name` is resident, loading it if needed.
    ///
    /// Returns immediately when the adapter is already `Ready` or `Busy`.
    /// Otherwise waits for the lifecycle lock; if another caller completed a
    /// load attempt meanwhile, its outcome is returned instead of loading again.
    pub async fn ensure_loaded(&self, name: &str) -> GatewayResult<()> {
        let record = self
            .inner
            .registry
            .get(name)
            .ok_or_else(|| GatewayError::NotRegistered(name.to_string()))?;
        self.ensure_record_loaded(&record).await
    }

    pub(crate) async fn ensure_record_loaded(&self, record: &Arc<AdapterRecord>) -> GatewayResult<()> {
        let generation = {
            let state = record.state();
            if state.status.is_loaded() {
                debug!(adapter = %record.name(), "adapter already loaded");
                return Ok(());
            }
            state.load_generation
        };

        let _lifecycle = record.lifecycle.lock().await;

        {
            let state = record.state();
            if state.status.is_loaded() {
                debug!(adapter = %record.name(), "adapter loaded by a concurrent caller");
                return Ok(());
            }
            if state.load_generation != generation {
                if let Some(reason) = &state.last_load_error {
                    return Err(GatewayError::LoadFailed {
                        adapter: record.name().to_string(),
                        reason: reason.clone(),
                    });
                }
            }
        }

        self.make_room_for(record).await?;
        self.load_locked(record).await
    }

    /// Evict if the budget would be exceeded, then apply the over-budget policy.
    async fn make_room_for(&self, record: &AdapterRecord) -> GatewayResult<()> {
        let budget_mb = self.inner.config.max_memory_mb;
        let needed_mb = record.spec.estimated_memory_mb;
        let used_mb = self.inner.registry.used_memory_mb();

        if used_mb.saturating_add(needed_mb) <= budget_mb {
            return Ok(());
        }

        info!(
            adapter = %record.name(),
            needed_mb,
            used_mb,
            budget_mb,
            "memory budget would be exceeded, evicting"
        );
        self.free_memory(needed_mb, record.name()).await;

        let used_mb = self.inner.registry.used_memory_mb();
        if used_mb.saturating_add(needed_mb) <= budget_mb {
            return Ok(());
        }

        match self.inner.config.over_budget {
            OverBudgetPolicy::Proceed => {
                warn!(
                    adapter = %record.name(),
                    needed_mb,
                    used_mb,
                    budget_mb,
                    "could not free enough memory, loading over budget"
                );
                Ok(())
            }
            OverBudgetPolicy::Refuse => {
                // a refused load leaves no instance behind, even after a failed one
                let mut state = record.state();
                if state.status == AdapterStatus::Error {
                    state.status = AdapterStatus::Unloaded;
                }
                drop(state);
                warn!(
                    adapter = %record.name(),
                    needed_mb,
                    used_mb,
                    budget_mb,
                    "could not free enough memory, refusing load"
                );
                Err(GatewayError::MemoryPressure {
                    adapter: record.name().to_string(),
                    needed_mb,
                    used_mb,
                    budget_mb,
                })
            }
        }
    }

    /// Caller must hold the record's lifecycle lock.
    async fn load_locked(&self, record: &AdapterRecord) -> GatewayResult<()> {
        record.state().status = AdapterStatus::Loading;
        info!(
            adapter = %record.name(),
            kind = %record.spec.kind,
            memory_mb = record.spec.estimated_memory_mb,
            "loading adapter"
        );

        let started = Instant::now();
        let outcome = record.adapter.load().await;
        let elapsed_ms = duration_ms(started.elapsed());

        let mut state = record.state();
        state.load_generation += 1;
        match outcome {
            Ok(instance) => {
                state.instance = Some(instance);
                state.status = AdapterStatus::Ready;
                state.last_load_error = None;
                state.touch();
                info!(adapter = %record.name(), elapsed_ms, "adapter ready");
                Ok(())
            }
            Err(e) => {
                let reason = e.to_string();
                state.instance = None;
                state.status = AdapterStatus::Error;
                state.last_load_error = Some(reason.clone());
                error!(adapter = %record.name(), elapsed_ms, error = %reason, "adapter load failed");
                Err(GatewayError::LoadFailed {
                    adapter: record.name().to_string(),
                    reason,
                })
            }
        }
    }

    /// Unload `name` if it is `Ready`.
    ///
    /// Returns `false` when the adapter is unknown, not `Ready` (including
    /// `Busy`), or when its unloader failed; unloader failures are logged and
    /// leave the adapter in `Error`.
    pub async fn unload(&self, name: &str) -> bool {
        let Some(record) = self.inner.registry.get(name) else {
            debug!(adapter = %name, "unload requested for unregistered adapter");
            return false;
        };
        if record.status() != AdapterStatus::Ready {
            return false;
        }

        let _lifecycle = record.lifecycle.lock().await;
        self.unload_locked(&record).await
    }

    /// Caller must hold the record's lifecycle lock.
    pub(crate) async fn unload_locked(&self, record: &AdapterRecord) -> bool {
        let instance = {
            let mut state = record.state();
            if state.status != AdapterStatus::Ready {
                return false;
            }
            state.status = AdapterStatus::Unloading;
            state.instance.take()
        };
        let Some(instance) = instance else {
            record.state().status = AdapterStatus::Unloaded;
            return true;
        };

        info!(
            adapter = %record.name(),
            memory_mb = record.spec.estimated_memory_mb,
            "unloading adapter"
        );
        match record.adapter.unload(instance).await {
            Ok(()) => {
                record.state().status = AdapterStatus::Unloaded;
                true
            }
            Err(e) => {
                record.state().status = AdapterStatus::Error;
                error!(adapter = %record.name(), error = %e, "adapter unload failed");
                false
            }
        }
    }
}
