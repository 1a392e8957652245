//! Idle sweeper.
//!
//! A background task that periodically unloads adapters left unused past
//! their idle timeout. Critical adapters and adapters that were never used
//! are left alone.

use std::sync::{Arc, Weak};
use std::time::Duration;

use lingo_kernel::types::AdapterStatus;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::gateway::{Gateway, GatewayInner};
use crate::registry::AdapterRecord;

struct Running {
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Handle to the background sweep task.
#[derive(Default)]
pub(crate) struct IdleSweeper {
    running: Mutex<Option<Running>>,
}

impl IdleSweeper {
    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    /// Spawn the sweep loop. Must be called inside a tokio runtime.
    pub fn start(&self, gateway: Weak<GatewayInner>, period: Duration) {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|r| !r.task.is_finished()) {
            warn!("idle sweeper is already running");
            return;
        }

        let token = CancellationToken::new();
        let task = tokio::spawn(sweep_loop(gateway, period, token.clone()));
        *running = Some(Running { token, task });
        info!(period_secs = period.as_secs(), "idle sweeper started");
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn stop(&self) {
        let running = self.running.lock().take();
        let Some(Running { token, task }) = running else {
            return;
        };
        token.cancel();
        if let Err(e) = task.await {
            error!(error = %e, "idle sweeper task ended abnormally");
        }
        info!("idle sweeper stopped");
    }
}

async fn sweep_loop(gateway: Weak<GatewayInner>, period: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(inner) = gateway.upgrade() else {
            debug!("gateway dropped, idle sweeper exiting");
            break;
        };
        let unloaded = Gateway::from_inner(inner).sweep_idle().await;
        debug!(unloaded = unloaded.len(), "idle sweep tick");
    }
}

fn is_idle_expired(record: &AdapterRecord, now: Instant) -> bool {
    if !record.spec.priority.is_evictable() {
        return false;
    }
    let state = record.state();
    if state.status != AdapterStatus::Ready {
        return false;
    }
    let Some(last_used) = state.last_used else {
        return false;
    };
    now.saturating_duration_since(last_used) > Duration::from_secs(record.spec.idle_timeout_secs)
}

impl Gateway {
    /// Run one sweep pass now. Returns the adapters that were unloaded.
    pub async fn sweep_idle(&self) -> Vec<String> {
        let now = Instant::now();
        let expired: Vec<Arc<AdapterRecord>> = self
            .inner
            .registry
            .records()
            .into_iter()
            .filter(|record| is_idle_expired(record, now))
            .collect();

        let mut unloaded = Vec::new();
        for record in expired {
            let _lifecycle = record.lifecycle.lock().await;
            // it may have been used while we waited for the lock
            if !is_idle_expired(&record, Instant::now()) {
                continue;
            }
            info!(
                adapter = %record.name(),
                idle_timeout_secs = record.spec.idle_timeout_secs,
                "unloading idle adapter"
            );
            if self.unload_locked(&record).await {
                unloaded.push(record.name().to_string());
            }
        }
        unloaded
    }

    /// Start the background idle sweeper using the configured period.
    pub fn start(&self) {
        let period = Duration::from_secs(self.inner.config.sweep_interval_secs.max(1));
        self.inner.sweeper.start(Arc::downgrade(&self.inner), period);
    }

    pub fn is_sweeper_running(&self) -> bool {
        self.inner.sweeper.is_running()
    }
}
