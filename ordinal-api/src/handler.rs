//! # Handler Capability
//!
//! Business logic for one actor type plugs into the runtime through
//! [`ActorHandler`]. A handler never holds references to other handlers;
//! when it needs another actor it goes through the [`MessageSender`]
//! capability carried by its [`HandlerContext`], which routes the message
//! through the same Router abstraction as any external caller.
//!
//! ## Usage Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use ordinal_api::envelope::Reply;
//! use ordinal_api::handler::{ActorHandler, HandlerContext};
//! use ordinal_api::types::{ActorResult, Payload};
//! use ordinal_api::ActorType;
//! use serde_json::json;
//!
//! #[derive(ActorType)]
//! #[actor(name = "counter")]
//! struct CounterHandler;
//!
//! #[async_trait]
//! impl ActorHandler for CounterHandler {
//!     async fn handle(&self, _payload: Payload, ctx: &mut HandlerContext<'_>) -> ActorResult<Reply> {
//!         let count = ctx.memory.get("count").and_then(|v| v.as_u64()).unwrap_or(0) + 1;
//!         ctx.memory.insert("count".to_string(), json!(count));
//!         Ok(Reply::ok(json!({ "count": count })))
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::envelope::Reply;
use crate::errors::RouteError;
use crate::types::{ActorResult, Memory, Payload, RouteResult};

/// Business logic for one actor type.
#[async_trait]
pub trait ActorHandler: Send + Sync + 'static {
    /// Handles one message against the actor's loaded memory.
    ///
    /// Domain failures belong in the returned reply (see [`Reply::failure`]).
    /// Returning `Err` means the invocation itself failed: memory is not
    /// persisted and the Router reports a dispatch failure to the caller.
    async fn handle(&self, payload: Payload, ctx: &mut HandlerContext<'_>) -> ActorResult<Reply>;
}

/// Static type tag of a handler, usually implemented with `#[derive(ActorType)]`.
pub trait ActorType {
    const ACTOR_TYPE: &'static str;
}

/// Capability to address another actor through the Router layer.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, actor_type: &str, actor_id: &str, payload: Payload) -> RouteResult<Value>;
}

/// Everything a handler sees while processing one message.
pub struct HandlerContext<'a> {
    pub actor_type: &'a str,
    pub actor_id: &'a str,
    /// The activation's memory, persisted in full after the handler returns.
    pub memory: &'a mut Memory,
    /// Invocation time in milliseconds since the Unix epoch.
    pub now: u64,
    sender: Option<Arc<dyn MessageSender>>,
}

impl<'a> HandlerContext<'a> {
    pub fn new(
        actor_type: &'a str,
        actor_id: &'a str,
        memory: &'a mut Memory,
        now: u64,
        sender: Option<Arc<dyn MessageSender>>,
    ) -> Self {
        Self {
            actor_type,
            actor_id,
            memory,
            now,
            sender,
        }
    }

    /// Routes a message to another actor and waits for its result.
    pub async fn send(&self, actor_type: &str, actor_id: &str, payload: Payload) -> RouteResult<Value> {
        tracing::trace!(
            from_type = self.actor_type,
            from_id = self.actor_id,
            to_type = actor_type,
            to_id = actor_id,
            "Sending to actor"
        );
        match &self.sender {
            Some(sender) => sender.send(actor_type, actor_id, payload).await,
            None => Err(RouteError::DispatchFailure {
                key: format!("{}:{}", actor_type, actor_id),
                reason: "no message sender attached to this activation".to_string(),
            }),
        }
    }

    pub fn can_send(&self) -> bool {
        self.sender.is_some()
    }
}

impl fmt::Debug for HandlerContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerContext")
            .field("actor_type", &self.actor_type)
            .field("actor_id", &self.actor_id)
            .field("memory", &self.memory)
            .field("now", &self.now)
            .field("sender", &self.sender.as_ref().map(|_| "<dyn MessageSender>"))
            .finish()
    }
}
