//! The gateway facade.
//!
//! [`Gateway`] is cheaply cloneable; all clones share the same registry,
//! router and idle sweeper. Construct it once and hand clones to callers.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use lingo_gateway::Gateway;
//! use lingo_kernel::{AdapterKind, AdapterLoader, AdapterResult, AdapterSpec, GatewayConfig, OperationTable, Params, RoutingTable};
//! use serde_json::json;
//!
//! struct Whisper;
//! struct WhisperLoader;
//!
//! #[async_trait]
//! impl AdapterLoader for WhisperLoader {
//!     type Instance = Whisper;
//!     async fn load(&self) -> AdapterResult<Whisper> { Ok(Whisper) }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::default()
//!     .with_max_memory_mb(6000)
//!     .with_routing(RoutingTable::new().with_route("transcribe", "whisper").with_operation("transcribe", "transcribe"));
//!
//! let gateway = Gateway::new(config)?;
//! gateway.register(
//!     AdapterSpec::new("whisper", AdapterKind::SpeechToText).with_memory_mb(1500),
//!     WhisperLoader,
//!     OperationTable::new().with_operation("transcribe", |_w: Arc<Whisper>, _p: Params| async { Ok(json!({"text": "bonjour"})) }),
//! )?;
//! gateway.start();
//!
//! let result = gateway.execute_task("transcribe", Params::new(), None).await;
//! assert!(result.success);
//! gateway.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use lingo_kernel::adapter::{AdapterLoader, OperationTable};
use lingo_kernel::config::GatewayConfig;
use lingo_kernel::types::{AdapterSpec, AdapterStatus};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::registry::AdapterRegistry;
use crate::router::Router;
use crate::sweeper::IdleSweeper;

pub(crate) struct GatewayInner {
    pub config: GatewayConfig,
    pub registry: AdapterRegistry,
    pub router: Router,
    pub sweeper: IdleSweeper,
    pub started_at: Instant,
}

/// Model lifecycle gateway.
#[derive(Clone)]
pub struct Gateway {
    pub(crate) inner: Arc<GatewayInner>,
}

/// Outcome of [`Gateway::preload`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreloadReport {
    /// True when every requested adapter loaded
    pub success: bool,
    pub preloaded: Vec<String>,
    pub failed: Vec<String>,
}

/// Outcome of [`Gateway::shutdown`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    pub unloaded: Vec<String>,
    /// Adapters whose unloader failed or that were still busy
    pub failed: Vec<String>,
}

impl Gateway {
    /// Build a gateway from a validated configuration. Does not start the
    /// idle sweeper; call [`Gateway::start`] for that.
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        config.validate()?;
        info!(
            max_memory_mb = config.max_memory_mb,
            sweep_interval_secs = config.sweep_interval_secs,
            over_budget = ?config.over_budget,
            routes = config.routing.routes.len(),
            "gateway created"
        );

        let router = Router::new(config.routing.clone());
        Ok(Self {
            inner: Arc::new(GatewayInner {
                config,
                registry: AdapterRegistry::new(),
                router,
                sweeper: IdleSweeper::default(),
                started_at: Instant::now(),
            }),
        })
    }

    pub(crate) fn from_inner(inner: Arc<GatewayInner>) -> Self {
        Self { inner }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    /// Register (or re-register) an adapter. Nothing is loaded.
    ///
    /// Fails if `spec.name` is empty, or if the routing table sends a
    /// task to this adapter with an operation the table does not declare.
    pub fn register<L: AdapterLoader>(
        &self,
        spec: AdapterSpec,
        loader: L,
        operations: OperationTable<L::Instance>,
    ) -> GatewayResult<()> {
        if spec.name.trim().is_empty() {
            return Err(GatewayError::InvalidSpec("adapter name cannot be empty".into()));
        }
        self.inner
            .router
            .check_adapter(&spec.name, |op| operations.contains(op))?;

        let name = spec.name.clone();
        let memory_mb = spec.estimated_memory_mb;
        let priority = spec.priority;
        if self.inner.registry.register(spec, loader, operations) {
            warn!(adapter = %name, "adapter re-registered, previous record overwritten");
        } else {
            info!(adapter = %name, memory_mb, priority = %priority, "adapter registered");
        }
        Ok(())
    }

    /// Register using the metadata configured under `name` in
    /// [`GatewayConfig::adapters`].
    pub fn register_configured<L: AdapterLoader>(
        &self,
        name: &str,
        loader: L,
        operations: OperationTable<L::Instance>,
    ) -> GatewayResult<()> {
        let spec = self
            .inner
            .config
            .adapter_spec(name)
            .cloned()
            .ok_or_else(|| {
                GatewayError::InvalidSpec(format!("no adapter metadata configured for '{}'", name))
            })?;
        self.register(spec, loader, operations)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.inner.registry.contains(name)
    }

    /// Registered adapter names, in registration order.
    pub fn adapter_names(&self) -> Vec<String> {
        self.inner.registry.names()
    }

    pub fn adapter_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Operations declared by `name`, sorted.
    pub fn operations(&self, name: &str) -> Option<Vec<String>> {
        self.inner
            .registry
            .get(name)
            .map(|record| record.adapter.operation_names())
    }

    /// Load adapters sequentially. With `None`, every adapter flagged
    /// `preload` is loaded in registration order; otherwise exactly `names`.
    /// A failure is logged and does not stop the remaining loads.
    pub async fn preload(&self, names: Option<&[String]>) -> PreloadReport {
        let targets: Vec<String> = match names {
            Some(names) => names.to_vec(),
            None => self
                .inner
                .registry
                .records()
                .into_iter()
                .filter(|record| record.spec.preload)
                .map(|record| record.name().to_string())
                .collect(),
        };

        let mut report = PreloadReport::default();
        for name in targets {
            match self.ensure_loaded(&name).await {
                Ok(()) => report.preloaded.push(name),
                Err(e) => {
                    error!(adapter = %name, error = %e, "preload failed");
                    report.failed.push(name);
                }
            }
        }
        report.success = report.failed.is_empty();
        info!(
            preloaded = report.preloaded.len(),
            failed = report.failed.len(),
            "preload finished"
        );
        report
    }

    /// Preload every adapter flagged `preload`.
    pub async fn preload_all(&self) -> PreloadReport {
        self.preload(None).await
    }

    /// Stop the idle sweeper, then unload every resident adapter.
    ///
    /// Best-effort: unloader failures are logged and the loop continues.
    /// Adapters still `Busy` are skipped. The gateway stays usable; a later
    /// call reloads lazily.
    pub async fn shutdown(&self) -> ShutdownReport {
        info!("gateway shutting down");
        self.inner.sweeper.stop().await;

        let mut report = ShutdownReport::default();
        for record in self.inner.registry.records() {
            match record.status() {
                AdapterStatus::Ready => {}
                AdapterStatus::Busy => {
                    warn!(adapter = %record.name(), "adapter busy at shutdown, leaving it loaded");
                    report.failed.push(record.name().to_string());
                    continue;
                }
                _ => continue,
            }

            let _lifecycle = record.lifecycle.lock().await;
            if self.unload_locked(&record).await {
                report.unloaded.push(record.name().to_string());
            } else if record.status() == AdapterStatus::Error {
                report.failed.push(record.name().to_string());
            }
        }

        info!(
            unloaded = report.unloaded.len(),
            failed = report.failed.len(),
            "gateway shutdown complete"
        );
        report
    }
}
