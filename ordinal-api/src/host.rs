//! # Host Primitives
//!
//! The runtime sits on two primitives supplied by the host platform:
//!
//! - an addressable, single-threaded compute unit reached through a stable
//!   name ([`InstanceNamespace`] / [`InstanceHandle`]). The host serializes
//!   calls per destination instance and never retries a call on its own.
//! - a durable key-value store scoped to one instance ([`DurableStore`]).
//!   No instance can see another instance's keys.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{CallError, StorageError};
use crate::protocol::{ActivationRequest, ActivationResponse};

/// Per-instance durable key-value store.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    async fn put(&self, key: &str, value: Value) -> Result<(), StorageError>;

    /// Deletes `key`, returning whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// All entries whose key starts with `prefix`, in key order.
    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<(String, Value)>, StorageError>;
}

/// Handle to one addressable instance.
#[async_trait]
pub trait InstanceHandle: Send + Sync {
    async fn call(&self, request: ActivationRequest) -> Result<ActivationResponse, CallError>;
}

/// Stable name-to-instance mapping.
pub trait InstanceNamespace: Send + Sync {
    /// Resolves `name` to its instance, activating it if needed.
    fn resolve(&self, name: &str) -> Arc<dyn InstanceHandle>;
}
