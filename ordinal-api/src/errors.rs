//! # Error Types
//!
//! This module defines the error types shared by the Router, the actor
//! activation wrapper and the host primitives they run on.
//!
//! ## Error Layers
//!
//! - `RouteError`: what a caller of `route` sees. Every variant maps to a
//!   machine-readable [`ErrorKind`] and an HTTP-equivalent status code.
//! - `ActorError`: failures raised while an activation runs a handler.
//! - `StorageError`: failures of the per-instance durable store.
//! - `CallError`: failures of an addressed call to another instance.
//! - `RegistryError`: problems building the handler registry at startup.
//!
//! Business-level failures reported by a handler are *not* errors at this
//! layer: they travel inside a successful envelope's `result`.
//!
//! ## Usage Example
//!
//! ```rust
//! use ordinal_api::errors::{ErrorKind, RouteError};
//!
//! fn should_retry(error: &RouteError) -> bool {
//!     match error.kind() {
//!         ErrorKind::QueueFull | ErrorKind::Timeout => true,
//!         _ => error.is_retriable(),
//!     }
//! }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable category of a failed route call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Validation,
    PayloadTooLarge,
    QueueFull,
    Timeout,
    DispatchFailure,
    Rejected,
}

impl ErrorKind {
    /// HTTP-equivalent status code for the front door.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::PayloadTooLarge => 413,
            ErrorKind::QueueFull => 429,
            ErrorKind::Timeout => 504,
            ErrorKind::DispatchFailure => 502,
            ErrorKind::Rejected => 409,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::PayloadTooLarge => "payload-too-large",
            ErrorKind::QueueFull => "queue-full",
            ErrorKind::Timeout => "timeout",
            ErrorKind::DispatchFailure => "dispatch-failure",
            ErrorKind::Rejected => "rejected",
        }
    }
}

/// Transport-level failure of a `route` call.
///
/// Admission failures (`Validation`, `PayloadTooLarge`, `QueueFull`) are
/// returned before anything is enqueued. The remaining variants are delivered
/// through the caller's pending correlation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The request is malformed (missing actor type or id).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The serialized payload exceeds the key's `maxPayloadBytes`.
    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    /// The key's queue is already at `queueLimit`.
    #[error("Queue full for {key} (limit: {limit})")]
    QueueFull { key: String, limit: usize },

    /// No resolution arrived within the key's `timeoutMs`.
    ///
    /// The message itself may still be processed later; its result is discarded.
    #[error("Processing timed out after {0:?}")]
    Timeout(Duration),

    /// The addressed call to the actor activation failed.
    #[error("Dispatch to {key} failed: {reason}")]
    DispatchFailure { key: String, reason: String },

    /// The message was dropped from the queue by a `reject` continuation or a reset.
    #[error("Rejected: {0}")]
    Rejected(String),
}

impl RouteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RouteError::Validation(_) => ErrorKind::Validation,
            RouteError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            RouteError::QueueFull { .. } => ErrorKind::QueueFull,
            RouteError::Timeout(_) => ErrorKind::Timeout,
            RouteError::DispatchFailure { .. } => ErrorKind::DispatchFailure,
            RouteError::Rejected(_) => ErrorKind::Rejected,
        }
    }

    /// Whether resubmitting the same request can succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::QueueFull | ErrorKind::Timeout | ErrorKind::DispatchFailure
        )
    }
}

/// Failure of the per-instance durable store.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backing store cannot serve requests right now.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be encoded or decoded.
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure raised while an activation runs a handler.
#[derive(Error, Debug)]
pub enum ActorError {
    /// The handler itself failed before producing an envelope.
    #[error("Handler failed: {0}")]
    HandlerFailed(String),

    /// No handler is registered for the requested actor type.
    #[error("Unknown actor type: {0}")]
    UnknownActorType(String),

    /// A cross-actor `send` issued from a handler failed.
    #[error("Send failed: {0}")]
    Send(#[from] RouteError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure of an addressed call to another instance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// The instance answered with a non-success status.
    #[error("Instance call failed with status {status}: {message}")]
    Failed { status: u16, message: String },

    /// The instance could not be reached or did not answer in time.
    #[error("Instance unreachable: {0}")]
    Unreachable(String),
}

impl CallError {
    pub fn internal(message: impl Into<String>) -> Self {
        CallError::Failed {
            status: 500,
            message: message.into(),
        }
    }
}

impl From<ActorError> for CallError {
    fn from(error: ActorError) -> Self {
        CallError::internal(error.to_string())
    }
}

/// Problems building the handler registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Actor type registered twice: {0}")]
    DuplicateActorType(String),

    #[error("Actor type tag must not be empty")]
    EmptyActorType,
}
