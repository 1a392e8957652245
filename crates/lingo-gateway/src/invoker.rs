//! Operation invocation.
//!
//! The invoker never fails with an `Err`: every outcome, including routing
//! and load failures, is folded into an [`InvocationResult`].
//!
//! Timeouts are best-effort. On expiry the operation future is dropped,
//! which cancels it at its next suspension point; work an adapter pushed
//! onto its own threads keeps running until it finishes on its own.

use std::sync::Arc;
use std::time::Duration;

use lingo_kernel::adapter::Params;
use lingo_kernel::types::{AdapterStatus, InvocationResult};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::Gateway;
use crate::registry::{AdapterRecord, ErasedInstance};

/// Attempts to pin a loaded instance before giving up; an adapter can be
/// evicted between `ensure_loaded` returning and the call starting.
const MAX_ACQUIRE_ATTEMPTS: usize = 3;

/// Marks an adapter `Busy` for the duration of one call.
///
/// Dropping the guard (normally, on error, or because the caller's future
/// was cancelled) decrements the in-flight count and flips the adapter back
/// to `Ready` once no call remains.
struct BusyGuard {
    record: Arc<AdapterRecord>,
    instance: ErasedInstance,
}

impl BusyGuard {
    fn acquire(record: &Arc<AdapterRecord>) -> Option<Self> {
        let mut state = record.state();
        if !state.status.is_loaded() {
            return None;
        }
        let instance = state.instance.clone()?;
        state.in_flight += 1;
        state.status = AdapterStatus::Busy;
        Some(Self {
            record: Arc::clone(record),
            instance,
        })
    }

    fn record_success(&self, latency_ms: u64) {
        let mut state = self.record.state();
        state.request_count += 1;
        state.total_latency_ms = state.total_latency_ms.saturating_add(latency_ms);
        state.touch();
    }

    fn record_failure(&self) {
        self.record.state().error_count += 1;
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let mut state = self.record.state();
        state.in_flight = state.in_flight.saturating_sub(1);
        if state.in_flight == 0 && state.status == AdapterStatus::Busy {
            state.status = AdapterStatus::Ready;
        }
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn elapsed_ms(started: Instant) -> u64 {
    duration_ms(started.elapsed())
}

impl Gateway {
    /// Run `operation` on adapter `name`, loading it first if necessary.
    ///
    /// `timeout` falls back to the configured default when `None`.
    pub async fn invoke(
        &self,
        name: &str,
        operation: &str,
        params: Params,
        timeout: Option<Duration>,
    ) -> InvocationResult {
        let started = Instant::now();
        match self.try_invoke(name, operation, params, timeout).await {
            Ok(data) => InvocationResult::ok(name, data, elapsed_ms(started)),
            Err(err) => {
                debug!(adapter = %name, operation, error = %err, "invocation failed");
                InvocationResult::failed(name, err.kind(), err.to_string(), elapsed_ms(started))
            }
        }
    }

    async fn try_invoke(
        &self,
        name: &str,
        operation: &str,
        params: Params,
        timeout: Option<Duration>,
    ) -> GatewayResult<Value> {
        let record = self
            .inner
            .registry
            .get(name)
            .ok_or_else(|| GatewayError::NotRegistered(name.to_string()))?;

        // Operation tables are fixed at registration, so an unknown
        // operation is rejected before paying for a load.
        if !record.adapter.has_operation(operation) {
            return Err(GatewayError::UnknownOperation {
                adapter: name.to_string(),
                operation: operation.to_string(),
            });
        }

        let call = self.begin_call(&record).await?;
        let future = record
            .adapter
            .call(operation, Arc::clone(&call.instance), params)
            .ok_or_else(|| GatewayError::UnknownOperation {
                adapter: name.to_string(),
                operation: operation.to_string(),
            })?;

        let timeout = timeout
            .unwrap_or_else(|| Duration::from_millis(self.inner.config.default_timeout_ms));
        let started = Instant::now();

        match tokio::time::timeout(timeout, future).await {
            Ok(Ok(value)) => {
                call.record_success(elapsed_ms(started));
                Ok(value)
            }
            Ok(Err(source)) => {
                call.record_failure();
                Err(GatewayError::OperationFailed {
                    adapter: name.to_string(),
                    operation: operation.to_string(),
                    source,
                })
            }
            Err(_) => {
                call.record_failure();
                let timeout_ms = duration_ms(timeout);
                warn!(adapter = %name, operation, timeout_ms, "invocation timed out");
                Err(GatewayError::Timeout {
                    adapter: name.to_string(),
                    operation: operation.to_string(),
                    timeout_ms,
                })
            }
        }
    }

    async fn begin_call(&self, record: &Arc<AdapterRecord>) -> GatewayResult<BusyGuard> {
        for _ in 0..MAX_ACQUIRE_ATTEMPTS {
            self.ensure_record_loaded(record).await?;
            if let Some(guard) = BusyGuard::acquire(record) {
                return Ok(guard);
            }
            debug!(adapter = %record.name(), "adapter unloaded before the call started, retrying");
        }
        Err(GatewayError::LoadFailed {
            adapter: record.name().to_string(),
            reason: "adapter kept being unloaded before it could be used".into(),
        })
    }
}
