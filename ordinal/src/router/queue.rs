use std::collections::VecDeque;

use ordinal_api::policy::Policy;
use ordinal_api::protocol::{MetadataSnapshot, StatusEntry};
use ordinal_api::types::{unix_millis, ActorKey, MessageId, Payload};

/// One admitted message waiting for its actor.
#[derive(Debug, Clone)]
pub(crate) struct QueueEntry {
    pub(crate) id: MessageId,
    pub(crate) payload: Payload,
    pub(crate) enqueued_at: u64,
}

impl QueueEntry {
    pub(crate) fn new(id: MessageId, payload: Payload) -> Self {
        Self {
            id,
            payload,
            enqueued_at: unix_millis(),
        }
    }
}

/// Live, volatile state of one actor key.
#[derive(Debug)]
pub(crate) struct ActorQueueState {
    pub(crate) key: ActorKey,
    pub(crate) policy: Policy,
    pub(crate) busy: bool,
    queue: VecDeque<QueueEntry>,
}

impl ActorQueueState {
    pub(crate) fn new(key: ActorKey, policy: Policy) -> Self {
        Self {
            key,
            policy,
            busy: false,
            queue: VecDeque::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.queue.len() >= self.policy.queue_limit
    }

    /// Idle with work queued: eligible for the next drain cycle.
    pub(crate) fn is_ready(&self) -> bool {
        !self.busy && !self.queue.is_empty()
    }

    pub(crate) fn push(&mut self, entry: QueueEntry) {
        self.queue.push_back(entry);
    }

    pub(crate) fn head(&self) -> Option<&QueueEntry> {
        self.queue.front()
    }

    /// Removes the head, provided it is still the message `id`.
    pub(crate) fn pop_head(&mut self, id: &MessageId) -> Option<QueueEntry> {
        match self.queue.front() {
            Some(head) if head.id == *id => self.queue.pop_front(),
            _ => None,
        }
    }

    /// Removes every queued message.
    pub(crate) fn take_all(&mut self) -> Vec<QueueEntry> {
        self.queue.drain(..).collect()
    }

    /// Removes every message except the one in flight, if any.
    pub(crate) fn take_waiting(&mut self) -> Vec<QueueEntry> {
        let keep = usize::from(self.busy).min(self.queue.len());
        self.queue.drain(keep..).collect()
    }

    pub(crate) fn snapshot(&self) -> MetadataSnapshot {
        MetadataSnapshot {
            actor_type: self.key.actor_type().to_string(),
            actor_id: self.key.actor_id().to_string(),
            busy: false,
            queue_length: self.queue.len(),
            updated_at: unix_millis(),
        }
    }

    pub(crate) fn status_entry(&self) -> StatusEntry {
        StatusEntry {
            actor_key: self.key.to_string(),
            actor_type: self.key.actor_type().to_string(),
            actor_id: self.key.actor_id().to_string(),
            busy: self.busy,
            queue_length: self.queue.len(),
            policy: Some(self.policy.clone()),
            meta_updated_at: None,
            from_storage: false,
            from_memory: true,
        }
    }
}
