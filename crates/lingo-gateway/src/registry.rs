//! Adapter registry.
//!
//! One [`AdapterRecord`] per adapter name: immutable metadata, the
//! type-erased loader and operation table, the mutable runtime state, and the
//! per-adapter lifecycle mutex that serializes load/unload transitions.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::FutureExt;
use lingo_kernel::adapter::{AdapterLoader, OperationFuture, OperationTable, Params};
use lingo_kernel::error::{AdapterError, AdapterResult};
use lingo_kernel::types::{AdapterSpec, AdapterStatus};
use parking_lot::{Mutex, MutexGuard, RwLock};
use serde_json::Value;
use tokio::time::Instant;
use tracing::warn;

/// Opaque handle to a loaded instance.
pub(crate) type ErasedInstance = Arc<dyn Any + Send + Sync>;

/// Loader + operation table with the instance type erased.
#[async_trait]
pub(crate) trait ErasedAdapter: Send + Sync {
    async fn load(&self) -> AdapterResult<ErasedInstance>;
    async fn unload(&self, instance: ErasedInstance) -> AdapterResult<()>;
    fn has_operation(&self, name: &str) -> bool;
    fn operation_names(&self) -> Vec<String>;
    fn call(&self, name: &str, instance: ErasedInstance, params: Params) -> Option<OperationFuture>;
}

struct TypedAdapter<L: AdapterLoader> {
    loader: L,
    operations: OperationTable<L::Instance>,
}

fn type_mismatch() -> AdapterError {
    AdapterError::Execution("instance does not belong to this adapter".into())
}

#[async_trait]
impl<L: AdapterLoader> ErasedAdapter for TypedAdapter<L> {
    async fn load(&self) -> AdapterResult<ErasedInstance> {
        let instance: ErasedInstance = Arc::new(self.loader.load().await?);
        Ok(instance)
    }

    async fn unload(&self, instance: ErasedInstance) -> AdapterResult<()> {
        let typed = instance
            .downcast::<L::Instance>()
            .map_err(|_| type_mismatch())?;
        self.loader.unload(typed).await
    }

    fn has_operation(&self, name: &str) -> bool {
        self.operations.contains(name)
    }

    fn operation_names(&self) -> Vec<String> {
        self.operations.names()
    }

    fn call(&self, name: &str, instance: ErasedInstance, params: Params) -> Option<OperationFuture> {
        if !self.operations.contains(name) {
            return None;
        }
        match instance.downcast::<L::Instance>() {
            Ok(typed) => self.operations.call(name, typed, params),
            Err(_) => Some(async { Err::<Value, _>(type_mismatch()) }.boxed()),
        }
    }
}

/// Mutable runtime state of one adapter.
///
/// `instance.is_some()` holds exactly when `status` is `Ready` or `Busy`.
#[derive(Default)]
pub(crate) struct RecordState {
    pub status: AdapterStatus,
    pub instance: Option<ErasedInstance>,
    /// Invocations currently running; `status` is `Busy` while non-zero.
    pub in_flight: usize,
    /// Monotonic time of last use, drives idle sweeping and eviction order.
    pub last_used: Option<Instant>,
    /// Wall-clock time of last use, for reporting.
    pub last_used_at: Option<DateTime<Utc>>,
    pub request_count: u64,
    pub total_latency_ms: u64,
    pub error_count: u64,
    /// Bumped on every completed load attempt.
    pub load_generation: u64,
    pub last_load_error: Option<String>,
}

impl RecordState {
    pub fn touch(&mut self) {
        self.last_used = Some(Instant::now());
        self.last_used_at = Some(Utc::now());
    }
}

pub(crate) struct AdapterRecord {
    pub spec: AdapterSpec,
    pub adapter: Box<dyn ErasedAdapter>,
    state: Mutex<RecordState>,
    /// Per-adapter lifecycle lock; held across load and unload.
    pub lifecycle: Arc<tokio::sync::Mutex<()>>,
}

impl AdapterRecord {
    fn new(spec: AdapterSpec, adapter: Box<dyn ErasedAdapter>) -> Self {
        Self {
            spec,
            adapter,
            state: Mutex::new(RecordState::default()),
            lifecycle: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn state(&self) -> MutexGuard<'_, RecordState> {
        self.state.lock()
    }

    pub fn status(&self) -> AdapterStatus {
        self.state.lock().status
    }
}

/// Name → record map, remembering registration order.
#[derive(Default)]
pub(crate) struct AdapterRegistry {
    records: DashMap<String, Arc<AdapterRecord>>,
    order: RwLock<Vec<String>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Returns `true` when an existing record was replaced.
    pub fn register<L: AdapterLoader>(
        &self,
        spec: AdapterSpec,
        loader: L,
        operations: OperationTable<L::Instance>,
    ) -> bool {
        let name = spec.name.clone();
        let adapter = Box::new(TypedAdapter { loader, operations });
        let record = Arc::new(AdapterRecord::new(spec, adapter));

        match self.records.insert(name.clone(), record) {
            Some(previous) => {
                if previous.status().is_loaded() {
                    warn!(
                        adapter = %name,
                        "re-registration drops a loaded instance without calling its unloader"
                    );
                }
                true
            }
            None => {
                self.order.write().push(name);
                false
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<AdapterRecord>> {
        self.records.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Adapter names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.read().clone()
    }

    /// Records in registration order.
    pub fn records(&self) -> Vec<Arc<AdapterRecord>> {
        self.order
            .read()
            .iter()
            .filter_map(|name| self.get(name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Σ estimated memory of every `Ready`/`Busy` record.
    pub fn used_memory_mb(&self) -> u64 {
        self.records
            .iter()
            .filter(|entry| entry.value().status().is_loaded())
            .map(|entry| entry.value().spec.estimated_memory_mb)
            .fold(0, u64::saturating_add)
    }
}
