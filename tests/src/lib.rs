//! Lingo Testing Utilities
//!
//! Mock adapters and helpers for exercising the gateway's lifecycle,
//! eviction and routing behavior without loading real models.

pub mod adapter;

pub use adapter::{MockAdapter, MockModel};

use lingo_kernel::adapter::Params;
use serde_json::Value;

/// Install a test-friendly tracing subscriber. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lingo_gateway=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Build a [`Params`] bag from `(key, value)` pairs.
pub fn params<const N: usize>(pairs: [(&str, Value); N]) -> Params {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}
