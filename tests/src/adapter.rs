use async_trait::async_trait;
use lingo_gateway::{Gateway, GatewayResult};
use lingo_kernel::adapter::{AdapterLoader, OperationTable, Params};
use lingo_kernel::error::{AdapterError, AdapterResult};
use lingo_kernel::types::AdapterSpec;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Instance handed out by [`MockAdapter`].
#[derive(Debug)]
pub struct MockModel {
    pub adapter: String,
    /// Which load produced this instance, starting at 1
    pub generation: usize,
}

/// A scriptable adapter for exercising the gateway without real models.
///
/// Counts loads and unloads, records every operation call, and can be told
/// to fail loading or unloading. Clones share all counters.
///
/// Operations exposed by [`MockAdapter::operations`]:
///
/// - `execute` / `echo`: returns `{"adapter", "generation", "params"}`
/// - `sleep`: waits `ms` milliseconds (param, default 1000) then returns `null`
/// - `fail`: always fails with an execution error
#[derive(Clone)]
pub struct MockAdapter {
    name: String,
    load_delay: Duration,
    fail_loads: Arc<AtomicBool>,
    fail_unloads: Arc<AtomicBool>,
    loads: Arc<AtomicUsize>,
    unloads: Arc<AtomicUsize>,
    /// Track all (operation, params) pairs passed to this adapter
    pub call_history: Arc<RwLock<Vec<(String, Params)>>>,
}

impl MockAdapter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            load_delay: Duration::ZERO,
            fail_loads: Arc::new(AtomicBool::new(false)),
            fail_unloads: Arc::new(AtomicBool::new(false)),
            loads: Arc::new(AtomicUsize::new(0)),
            unloads: Arc::new(AtomicUsize::new(0)),
            call_history: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Make every `load()` take `delay`.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_unloads(&self, fail: bool) {
        self.fail_unloads.store(fail, Ordering::SeqCst);
    }

    /// Number of times `load()` was entered.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn unload_count(&self) -> usize {
        self.unloads.load(Ordering::SeqCst)
    }

    pub async fn history(&self) -> Vec<(String, Params)> {
        self.call_history.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.call_history.read().await.len()
    }

    pub fn operations(&self) -> OperationTable<MockModel> {
        let history = self.call_history.clone();
        let echo = move |model: Arc<MockModel>, params: Params| {
            let history = history.clone();
            async move {
                history.write().await.push(("echo".to_string(), params.clone()));
                Ok(json!({
                    "adapter": model.adapter,
                    "generation": model.generation,
                    "params": Value::Object(params),
                }))
            }
        };

        let history = self.call_history.clone();
        let sleep = move |_model: Arc<MockModel>, params: Params| {
            let history = history.clone();
            async move {
                let ms = params.get("ms").and_then(Value::as_u64).unwrap_or(1000);
                history.write().await.push(("sleep".to_string(), params));
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(Value::Null)
            }
        };

        let history = self.call_history.clone();
        let fail = move |model: Arc<MockModel>, params: Params| {
            let history = history.clone();
            async move {
                history.write().await.push(("fail".to_string(), params));
                Err(AdapterError::Execution(format!("{} was told to fail", model.adapter)))
            }
        };

        OperationTable::new()
            .with_operation("execute", echo.clone())
            .with_operation("echo", echo)
            .with_operation("sleep", sleep)
            .with_operation("fail", fail)
    }

    /// Register this adapter under `spec` with its full operation table.
    pub fn register(&self, gateway: &Gateway, spec: AdapterSpec) -> GatewayResult<()> {
        gateway.register(spec, self.clone(), self.operations())
    }
}

#[async_trait]
impl AdapterLoader for MockAdapter {
    type Instance = MockModel;

    async fn load(&self) -> AdapterResult<MockModel> {
        let generation = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(adapter = %self.name, generation, "mock load");
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(AdapterError::LoadFailed(format!("{} refused to load", self.name)));
        }
        Ok(MockModel {
            adapter: self.name.clone(),
            generation,
        })
    }

    async fn unload(&self, instance: Arc<MockModel>) -> AdapterResult<()> {
        self.unloads.fetch_add(1, Ordering::SeqCst);
        debug!(adapter = %instance.adapter, generation = instance.generation, "mock unload");
        if self.fail_unloads.load(Ordering::SeqCst) {
            return Err(AdapterError::UnloadFailed(format!("{} refused to unload", self.name)));
        }
        Ok(())
    }
}

#[macro_export]
macro_rules! assert_loaded_times {
    ($adapter:expr, $expected:expr) => {
        let count = $adapter.load_count();
        assert_eq!(
            count, $expected,
            "Expected adapter '{}' to be loaded {} times, but was loaded {} times",
            $adapter.name(),
            $expected,
            count
        );
    };
}
