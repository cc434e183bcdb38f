//! # Ordinal Actor Runtime API
//!
//! Ordinal delivers messages to logical actors, identified by a type and an
//! id, through a per-type Router that guarantees strict in-order,
//! non-overlapping delivery to each actor and rejects work it cannot admit.
//! This crate holds the vocabulary shared by the Router, the actor activation
//! wrapper and the host they run on.
//!
//! ## Delivery Guarantees
//!
//! - **Per-key FIFO**: messages for one actor key reach the handler in
//!   enqueue order, one at a time.
//! - **At-least-once**: a caller that times out may see its message processed
//!   later; handlers are expected to be idempotent.
//! - **Immediate backpressure**: full queues and oversized payloads are
//!   rejected at admission instead of being buffered.
//!
//! ## Module Organization
//!
//! - [`types`]: actor keys, ids and common aliases
//! - [`policy`]: admission policy and continuation directives
//! - [`envelope`]: handler replies and normalized envelopes
//! - [`protocol`]: request/response shapes on the wire
//! - [`handler`]: the handler capability and its context
//! - [`host`]: durable store and addressable-instance primitives
//! - [`errors`]: error types

pub mod envelope;
pub mod errors;
pub mod handler;
pub mod host;
pub mod policy;
pub mod protocol;
pub mod types;

pub use envelope::{Envelope, InvokeRequest, Reply};
pub use errors::{ActorError, CallError, ErrorKind, RegistryError, RouteError, StorageError};
pub use handler::{ActorHandler, HandlerContext, MessageSender};
pub use host::{DurableStore, InstanceHandle, InstanceNamespace};
pub use policy::{NextMode, NextPolicy, Policy, PolicyOverride};
pub use protocol::{
    ActivationRequest, ActivationResponse, MetadataSnapshot, ResetRequest, ResetResponse, RouteRequest,
    RouteResponse, StatusEntry, StatusSnapshot,
};
pub use types::{ActorKey, ActorResult, Memory, MessageId, Payload, RouteResult};

// The derive macro shares its name with the trait it implements.
pub use handler::ActorType;
pub use ordinal_api_derive::ActorType;
