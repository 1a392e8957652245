//! `lingo-gateway`: runtime for the Lingo model lifecycle gateway.
//!
//! Owns every registered computation adapter and decides when each one is
//! resident in memory. Callers never hold adapter instances; they name an
//! adapter (or a task type) and get back an
//! [`InvocationResult`](lingo_kernel::InvocationResult).
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | `registry` | adapter records, runtime state, lifecycle locks |
//! | `loader` | lazy single-flight loading, unloading |
//! | `eviction` | freeing memory under budget pressure |
//! | `invoker` | running operations with timeouts and metrics |
//! | [`router`] | task type → adapter resolution |
//! | `sweeper` | background idle unloading |
//! | [`status`] | read-only reporting |
//!
//! See [`Gateway`] for a complete example.

mod eviction;
mod invoker;
mod loader;
mod registry;
mod sweeper;

pub mod error;
pub mod gateway;
pub mod router;
pub mod status;

pub use error::{GatewayError, GatewayResult};
pub use gateway::{Gateway, PreloadReport, ShutdownReport};
pub use router::{ResolvedTask, Router};
pub use status::{AdapterSummary, GatewayStatus, GatewaySummary};

pub use lingo_kernel;
