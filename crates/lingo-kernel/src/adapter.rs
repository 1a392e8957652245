//! The adapter contract.
//!
//! An adapter is split in two halves:
//!
//! - an [`AdapterLoader`], owned by the gateway for the whole process
//!   lifetime, which knows how to build and tear down the expensive instance;
//! - an [`OperationTable`], built once at registration, mapping operation
//!   names to typed async functions over that instance.
//!
//! The gateway never looks inside an instance: it only hands it back to the
//! loader on unload and to operation functions on invoke.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use lingo_kernel::adapter::{AdapterLoader, OperationTable, Params};
//! use lingo_kernel::error::AdapterResult;
//! use serde_json::json;
//!
//! struct Recognizer;
//! struct RecognizerLoader;
//!
//! #[async_trait]
//! impl AdapterLoader for RecognizerLoader {
//!     type Instance = Recognizer;
//!
//!     async fn load(&self) -> AdapterResult<Recognizer> {
//!         Ok(Recognizer)
//!     }
//! }
//!
//! let ops = OperationTable::<Recognizer>::new()
//!     .with_operation("transcribe", |_model: Arc<Recognizer>, _params: Params| async move {
//!         Ok(json!({ "text": "hola" }))
//!     });
//! assert!(ops.contains("transcribe"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::error::{AdapterError, AdapterResult};

/// Keyed parameter bag passed to every operation.
pub type Params = serde_json::Map<String, Value>;

/// Boxed future returned by an operation.
pub type OperationFuture = BoxFuture<'static, AdapterResult<Value>>;

/// A single typed operation over instances of `I`.
pub type OperationFn<I> = Arc<dyn Fn(Arc<I>, Params) -> OperationFuture + Send + Sync>;

/// Builds and tears down adapter instances.
///
/// `load` may take seconds and allocate gigabytes; it must be safe to call
/// again after a previous failure.
#[async_trait]
pub trait AdapterLoader: Send + Sync + 'static {
    type Instance: Send + Sync + 'static;

    async fn load(&self) -> AdapterResult<Self::Instance>;

    /// Release the instance. The default simply drops it.
    async fn unload(&self, instance: Arc<Self::Instance>) -> AdapterResult<()> {
        drop(instance);
        Ok(())
    }
}

/// Name → operation map for one adapter type.
pub struct OperationTable<I> {
    ops: HashMap<String, OperationFn<I>>,
}

impl<I> Default for OperationTable<I> {
    fn default() -> Self {
        Self {
            ops: HashMap::new(),
        }
    }
}

impl<I> Clone for OperationTable<I> {
    fn clone(&self) -> Self {
        Self {
            ops: self.ops.clone(),
        }
    }
}

impl<I: Send + Sync + 'static> OperationTable<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: register an operation. A later registration under the same
    /// name replaces the earlier one.
    pub fn with_operation<F, Fut>(mut self, name: impl Into<String>, op: F) -> Self
    where
        F: Fn(Arc<I>, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AdapterResult<Value>> + Send + 'static,
    {
        let op: OperationFn<I> = Arc::new(move |instance, params| op(instance, params).boxed());
        self.ops.insert(name.into(), op);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    /// Start `name` against `instance`, or `None` if no such operation exists.
    pub fn call(&self, name: &str, instance: Arc<I>, params: Params) -> Option<OperationFuture> {
        self.ops.get(name).map(|op| op(instance, params))
    }

    /// Operation names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.ops.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl<I> fmt::Debug for OperationTable<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.ops.keys()).finish()
    }
}

/// Fetch a required string parameter.
pub fn require_str<'a>(params: &'a Params, key: &str) -> AdapterResult<&'a str> {
    params
        .get(key)
        .ok_or_else(|| AdapterError::missing_param(key))?
        .as_str()
        .ok_or_else(|| AdapterError::InvalidParams(format!("parameter '{}' must be a string", key)))
}
