//! Task router.
//!
//! Resolves abstract task types to `(adapter, operation)` through the static
//! [`RoutingTable`]. Routes to adapters that are not registered yet are
//! accepted and reported at call time; routes to a registered adapter that
//! lacks the routed operation are rejected when that adapter registers.

use lingo_kernel::adapter::Params;
use lingo_kernel::routing::RoutingTable;
use lingo_kernel::types::{ErrorKind, InvocationResult};
use std::time::Duration;
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::Gateway;
use crate::registry::AdapterRegistry;

/// A resolved task: which adapter to call and with what operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTask {
    pub adapter: String,
    pub operation: String,
}

#[derive(Debug, Clone, Default)]
pub struct Router {
    table: RoutingTable,
}

impl Router {
    pub fn new(table: RoutingTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    pub(crate) fn resolve(&self, task: &str, registry: &AdapterRegistry) -> GatewayResult<ResolvedTask> {
        let adapter = self
            .table
            .adapter_for(task)
            .ok_or_else(|| GatewayError::UnknownTask(task.to_string()))?;

        if !registry.contains(adapter) {
            return Err(GatewayError::UnroutedAdapter {
                task: task.to_string(),
                adapter: adapter.to_string(),
            });
        }

        Ok(ResolvedTask {
            adapter: adapter.to_string(),
            operation: self.table.operation_for(task).to_string(),
        })
    }

    /// Check every task routed to `adapter` against the operations it declares.
    pub(crate) fn check_adapter(
        &self,
        adapter: &str,
        has_operation: impl Fn(&str) -> bool,
    ) -> GatewayResult<()> {
        for task in self.table.tasks() {
            if self.table.adapter_for(task) != Some(adapter) {
                continue;
            }
            let operation = self.table.operation_for(task);
            if !has_operation(operation) {
                return Err(GatewayError::InvalidRoute {
                    task: task.to_string(),
                    adapter: adapter.to_string(),
                    operation: operation.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Gateway {
    /// Adapter name a task type is routed to.
    pub fn route(&self, task: &str) -> GatewayResult<String> {
        self.inner
            .router
            .resolve(task, &self.inner.registry)
            .map(|resolved| resolved.adapter)
    }

    pub fn resolve_task(&self, task: &str) -> GatewayResult<ResolvedTask> {
        self.inner.router.resolve(task, &self.inner.registry)
    }

    /// Route `task` and invoke the resolved operation.
    ///
    /// Routing failures are returned as values without touching any adapter.
    pub async fn execute_task(
        &self,
        task: &str,
        params: Params,
        timeout: Option<Duration>,
    ) -> InvocationResult {
        match self.resolve_task(task) {
            Ok(ResolvedTask { adapter, operation }) => {
                debug!(task, adapter = %adapter, operation = %operation, "task routed");
                self.invoke(&adapter, &operation, params, timeout).await
            }
            Err(err) => {
                debug!(task, error = %err, "task routing failed");
                let adapter = self.inner.router.table().adapter_for(task).unwrap_or_default();
                InvocationResult::failed(adapter, ErrorKind::Routing, err.to_string(), 0)
            }
        }
    }
}
