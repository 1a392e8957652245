//! `lingo-kernel`: contracts and shared types for the Lingo model lifecycle gateway.
//!
//! This crate holds everything that does not own runtime state:
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`adapter`] | [`AdapterLoader`](adapter::AdapterLoader), [`OperationTable`](adapter::OperationTable) |
//! | [`types`] | [`AdapterSpec`](types::AdapterSpec), [`PriorityTier`](types::PriorityTier), [`InvocationResult`](types::InvocationResult) |
//! | [`routing`] | [`RoutingTable`](routing::RoutingTable) |
//! | [`config`] | [`GatewayConfig`](config::GatewayConfig) and the multi-format loader |
//! | [`error`] | [`AdapterError`](error::AdapterError) |
//!
//! The runtime that loads, evicts and invokes adapters lives in `lingo-gateway`.

pub mod adapter;
pub mod config;
pub mod error;
pub mod routing;
pub mod types;

pub use adapter::{AdapterLoader, OperationTable, Params};
pub use config::{GatewayConfig, OverBudgetPolicy};
pub use error::{AdapterError, AdapterResult};
pub use routing::RoutingTable;
pub use types::{
    AdapterKind, AdapterSpec, AdapterStatus, ErrorKind, InvocationResult, PriorityTier,
};
