//! Request/response correlation for routed messages.
//!
//! Every admitted message gets one entry keyed by its `MessageId`. The entry
//! is removed exactly once, by whichever happens first:
//!
//! ```text
//!   resolve(id, result)  drain loop got an envelope for the message
//!   reject(id, error)    dispatch failed, actor rejected, or reset
//!   cancel(id)           the caller's timer fired first
//! ```
//!
//! Completing an id with no entry is a no-op: the caller already gave up and
//! the result is discarded.

use std::collections::HashMap;
use std::time::Instant;

use ordinal_api::errors::RouteError;
use ordinal_api::types::{MessageId, RouteResult};
use serde_json::Value;
use tokio::sync::oneshot;

pub(crate) type Outcome = RouteResult<Value>;

struct PendingRequest {
    sender: oneshot::Sender<Outcome>,
    registered_at: Instant,
}

#[derive(Default)]
pub(crate) struct PendingTable {
    entries: HashMap<MessageId, PendingRequest>,
}

impl PendingTable {
    /// Registers `id` and returns the receiving end its caller waits on.
    pub(crate) fn insert(&mut self, id: MessageId) -> oneshot::Receiver<Outcome> {
        let (sender, receiver) = oneshot::channel();
        self.entries.insert(
            id,
            PendingRequest {
                sender,
                registered_at: Instant::now(),
            },
        );
        receiver
    }

    pub(crate) fn resolve(&mut self, id: &MessageId, result: Value) -> bool {
        self.complete(id, Ok(result))
    }

    pub(crate) fn reject(&mut self, id: &MessageId, error: RouteError) -> bool {
        self.complete(id, Err(error))
    }

    /// Drops the entry without answering it.
    pub(crate) fn cancel(&mut self, id: &MessageId) -> bool {
        self.entries.remove(id).is_some()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: &MessageId) -> bool {
        self.entries.contains_key(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn complete(&mut self, id: &MessageId, outcome: Outcome) -> bool {
        let Some(pending) = self.entries.remove(id) else {
            tracing::debug!(message_id = %id, "No pending caller, result discarded");
            return false;
        };
        tracing::trace!(
            message_id = %id,
            waited_ms = pending.registered_at.elapsed().as_millis() as u64,
            "Completing pending request"
        );
        // The receiver may have been dropped with its caller.
        let _ = pending.sender.send(outcome);
        true
    }
}
