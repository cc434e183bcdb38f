//! # Router
//!
//! One Router serves one actor type. It owns a FIFO queue per actor key and
//! delivers each key's messages to the key's activation strictly in order,
//! one at a time.
//!
//! ## Message Flow
//!
//! ```text
//! route() ──admit──> queue[key] ──drain cycle──> activation.invoke
//!    │                                                  │
//!    └──── waits on pending[id] <──resolve/reject───────┘
//! ```
//!
//! ## Scheduling
//!
//! A drain runs as a spawned task; at most one is active per Router. One
//! cycle visits every known key in insertion order and, for each idle key
//! with queued work, keeps invoking the head message until the queue is
//! empty or the handler asks to pause. Keys are served one after another,
//! never concurrently. When a cycle ends with work still queued on some idle
//! key, the next cycle starts right away.
//!
//! Admission never waits: oversized payloads and full queues are rejected on
//! the spot, and callers are expected to retry.
//!
//! ## Spawned Children
//!
//! Children named in a reply are pre-registered in the Router serving the
//! child's type, found through an attached [`RouterDirectory`]. They inherit
//! the parent's policy. A Router without a directory keeps them itself.

mod pending;
mod queue;

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

use futures::FutureExt;
use ordinal_api::envelope::{Envelope, InvokeRequest};
use ordinal_api::errors::{CallError, RouteError, StorageError};
use ordinal_api::host::{DurableStore, InstanceHandle, InstanceNamespace};
use ordinal_api::policy::{NextMode, Policy};
use ordinal_api::protocol::{
    ActivationRequest, ActivationResponse, MetadataSnapshot, ResetRequest, ResetResponse, RouteRequest,
    RouteResponse, StatusEntry, StatusSnapshot,
};
use ordinal_api::types::{unix_millis, ActorKey, MessageId, Payload, RouteResult, KEY_SEPARATOR};
use serde_json::Value;
use tracing::{debug, trace, warn, Instrument};
use uuid::Uuid;

use crate::config::{ResetPolicy, RouterConfig, METADATA_KEY_PREFIX};
use crate::{log_dispatch, log_error, log_lifecycle};

use self::pending::PendingTable;
use self::queue::{ActorQueueState, QueueEntry};

const REJECTED_BY_ACTOR: &str = "rejected by actor";
const REJECTED_BY_RESET: &str = "actor reset";

/// Finds the Router in charge of an actor type.
pub trait RouterDirectory: Send + Sync {
    fn router_for(&self, actor_type: &str) -> Router;
}

/// Per-type dispatch front for actor keys.
///
/// Cheap to clone; clones share the same queues.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    name: String,
    config: RouterConfig,
    store: Arc<dyn DurableStore>,
    instances: Arc<dyn InstanceNamespace>,
    directory: OnceLock<Weak<dyn RouterDirectory>>,
    state: Mutex<RouterState>,
}

#[derive(Default)]
struct RouterState {
    /// Keys in first-seen order, the visiting order of a drain cycle.
    order: Vec<ActorKey>,
    queues: HashMap<ActorKey, ActorQueueState>,
    pending: PendingTable,
    draining: bool,
}

impl RouterState {
    fn ensure_queue(&mut self, key: &ActorKey, policy: impl FnOnce() -> Policy) -> &mut ActorQueueState {
        let order = &mut self.order;
        self.queues.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            ActorQueueState::new(key.clone(), policy())
        })
    }

    fn has_ready_work(&self) -> bool {
        self.queues.values().any(ActorQueueState::is_ready)
    }
}

impl RouterInner {
    fn lock(&self) -> MutexGuard<'_, RouterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears a key's busy flag when processing of the key ends, however it ends.
struct BusyGuard<'a> {
    inner: &'a RouterInner,
    key: &'a ActorKey,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if let Some(queue) = self.inner.lock().queues.get_mut(self.key) {
            queue.busy = false;
        }
    }
}

/// Releases the drain flag if a drain task ends without finishing its
/// last cycle, so the next `route` can start a new one.
struct DrainGuard<'a> {
    inner: &'a RouterInner,
    armed: bool,
}

impl DrainGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.lock().draining = false;
            warn!(router = %self.inner.name, "Drain ended abnormally");
        }
    }
}

impl Router {
    /// Creates a Router named `name`, persisting metadata to `store` and
    /// reaching activations through `instances` by their `type:id` name.
    pub fn new(
        name: impl Into<String>,
        config: RouterConfig,
        store: Arc<dyn DurableStore>,
        instances: Arc<dyn InstanceNamespace>,
    ) -> Self {
        let name = name.into();
        log_lifecycle!("router", name.as_str(), "created");
        Self {
            inner: Arc::new(RouterInner {
                name,
                config,
                store,
                instances,
                directory: OnceLock::new(),
                state: Mutex::new(RouterState::default()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config(&self) -> &RouterConfig {
        &self.inner.config
    }

    /// Directory used to place spawned children of other types.
    /// Only the first attachment takes effect.
    pub fn attach_directory(&self, directory: Weak<dyn RouterDirectory>) {
        let _ = self.inner.directory.set(directory);
    }

    /// Callers currently waiting for a result.
    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Wire entry point: decodes the request and encodes the outcome.
    pub async fn handle_request(&self, request: RouteRequest) -> RouteResponse {
        let actor_type = request.actor_type.unwrap_or_default();
        let actor_id = request.actor_id.unwrap_or_default();
        self.route(&actor_type, &actor_id, request.payload).await.into()
    }

    /// Enqueues `payload` for `actor_type:actor_id` and waits for the
    /// handler's result.
    ///
    /// A `Timeout` only means this caller stopped waiting. The message stays
    /// queued and is still processed later; its result is discarded.
    pub async fn route(&self, actor_type: &str, actor_id: &str, payload: Payload) -> RouteResult<Value> {
        let key = ActorKey::new(actor_type, actor_id)?;
        let size = serde_json::to_vec(&payload)
            .map(|bytes| bytes.len())
            .map_err(|err| RouteError::Validation(format!("payload is not serializable: {}", err)))?;

        let (message_id, mut receiver, timeout) = self.admit(&key, payload, size)?;
        self.schedule_drain();

        match tokio::time::timeout(timeout, &mut receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(RouteError::DispatchFailure {
                key: key.to_string(),
                reason: "request dropped by router".to_string(),
            }),
            Err(_) => {
                if !self.inner.lock().pending.cancel(&message_id) {
                    // Completed between the timer firing and the cancel.
                    if let Ok(outcome) = receiver.try_recv() {
                        return outcome;
                    }
                }
                debug!(router = %self.inner.name, actor_key = %key, message_id = %message_id, "Caller timed out");
                Err(RouteError::Timeout(timeout))
            }
        }
    }

    /// Merged view of durable metadata and live queue state for keys
    /// starting with `actor_type_prefix`. Live state wins where both exist.
    pub async fn status(&self, actor_type_prefix: &str) -> Result<StatusSnapshot, StorageError> {
        let stored = self
            .inner
            .store
            .list_by_prefix(&metadata_key(actor_type_prefix))
            .await?;

        let mut actors: Vec<StatusEntry> = Vec::with_capacity(stored.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(stored.len());

        for (record_key, value) in stored {
            let actor_key = record_key
                .strip_prefix(METADATA_KEY_PREFIX)
                .unwrap_or(&record_key)
                .to_string();
            let meta = match serde_json::from_value::<MetadataSnapshot>(value) {
                Ok(meta) => meta,
                Err(err) => {
                    log_error!(err, router = %self.inner.name, record = %record_key, "Skipping malformed metadata");
                    continue;
                }
            };
            index.insert(actor_key.clone(), actors.len());
            actors.push(StatusEntry {
                actor_key,
                actor_type: meta.actor_type,
                actor_id: meta.actor_id,
                busy: meta.busy,
                queue_length: meta.queue_length,
                policy: None,
                meta_updated_at: Some(meta.updated_at),
                from_storage: true,
                from_memory: false,
            });
        }

        for live in self.live_entries(actor_type_prefix) {
            match index.get(&live.actor_key) {
                Some(&position) => {
                    let entry = &mut actors[position];
                    entry.busy = live.busy;
                    entry.queue_length = live.queue_length;
                    entry.policy = live.policy;
                    entry.from_memory = true;
                }
                None => actors.push(live),
            }
        }

        Ok(StatusSnapshot { actors })
    }

    /// Wipes every actor with durable metadata under `actor_type_prefix`.
    ///
    /// Keys whose activation refuses the reset keep their metadata and are
    /// left out of `cleared`. With [`ResetPolicy::RejectQueued`], messages
    /// queued behind an in-flight one are rejected first.
    pub async fn admin_reset(&self, request: ResetRequest) -> Result<ResetResponse, StorageError> {
        let prefix = request.actor_type_prefix;

        if self.inner.config.reset_policy == ResetPolicy::RejectQueued {
            let rejected = self.reject_waiting(&prefix);
            if rejected > 0 {
                debug!(router = %self.inner.name, prefix = %prefix, rejected, "Rejected queued messages on reset");
            }
        }

        let stored = self.inner.store.list_by_prefix(&metadata_key(&prefix)).await?;
        let mut cleared = Vec::with_capacity(stored.len());

        for (record_key, _) in stored {
            let Some(actor_key) = record_key.strip_prefix(METADATA_KEY_PREFIX) else {
                continue;
            };
            let handle = self.inner.instances.resolve(actor_key);
            match self.call(handle.as_ref(), ActivationRequest::Reset).await {
                Ok(_) => {
                    self.inner.store.delete(&record_key).await?;
                    cleared.push(actor_key.to_string());
                }
                Err(err) => {
                    log_error!(err, router = %self.inner.name, actor_key = %actor_key, "Reset failed, metadata kept");
                }
            }
        }

        log_lifecycle!("router", self.inner.name.as_str(), "reset", prefix = %prefix, cleared = cleared.len());
        Ok(ResetResponse { ok: true, cleared })
    }

    fn admit(
        &self,
        key: &ActorKey,
        payload: Payload,
        size: usize,
    ) -> RouteResult<(MessageId, tokio::sync::oneshot::Receiver<pending::Outcome>, std::time::Duration)> {
        let mut state = self.inner.lock();

        let policy = match state.queues.get(key) {
            Some(queue) => queue.policy.clone(),
            None => self.inner.config.policy_for(key.actor_type()),
        };
        if size > policy.max_payload_bytes {
            debug!(router = %self.inner.name, actor_key = %key, size, "Payload rejected");
            return Err(RouteError::PayloadTooLarge {
                size,
                limit: policy.max_payload_bytes,
            });
        }

        let queue = state.ensure_queue(key, || policy.clone());
        if queue.is_full() {
            debug!(router = %self.inner.name, actor_key = %key, length = queue.len(), "Queue full");
            return Err(RouteError::QueueFull {
                key: key.to_string(),
                limit: queue.policy.queue_limit,
            });
        }

        let message_id = Uuid::new_v4();
        queue.push(QueueEntry::new(message_id, payload));
        log_dispatch!(key, "enqueued", message_id = %message_id, queue_length = queue.len());

        let receiver = state.pending.insert(message_id);
        Ok((message_id, receiver, policy.timeout()))
    }

    /// Starts a drain task unless one is already running.
    fn schedule_drain(&self) {
        {
            let mut state = self.inner.lock();
            if state.draining {
                return;
            }
            state.draining = true;
        }

        let router = self.clone();
        let span = tracing::debug_span!("drain", router = %self.inner.name);
        tokio::spawn(async move { router.drain().await }.instrument(span));
    }

    async fn drain(&self) {
        let mut guard = DrainGuard {
            inner: &self.inner,
            armed: true,
        };
        let mut cycle: u64 = 0;
        loop {
            cycle += 1;
            let keys = self.inner.lock().order.clone();
            trace!(cycle, keys = keys.len(), "Drain cycle started");

            for key in &keys {
                self.process_key(key).await;
            }

            if self.finish_cycle() {
                guard.disarm();
                trace!(cycle, "Drain idle");
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    /// Ends the drain if no idle key has work left. Checked and cleared under
    /// one lock so that a concurrent `route` either sees the flag still set
    /// with its message counted here, or starts a new drain itself.
    fn finish_cycle(&self) -> bool {
        let mut state = self.inner.lock();
        if state.has_ready_work() {
            return false;
        }
        state.draining = false;
        true
    }

    async fn process_key(&self, key: &ActorKey) {
        if !self.claim(key) {
            return;
        }
        let guard = BusyGuard { inner: &self.inner, key };
        let handle = self.inner.instances.resolve(&key.to_string());

        while let Some(entry) = self.head(key) {
            match self.invoke(handle.as_ref(), key, &entry).await {
                Ok(envelope) => {
                    self.register_spawned(key, &envelope.spawn).await;
                    if !self.complete_head(key, &entry.id, envelope) {
                        break;
                    }
                }
                Err(err) => {
                    log_error!(err, actor_key = %key, message_id = %entry.id, "Dispatch failed");
                    self.fail_head(key, &entry.id, err);
                    break;
                }
            }
        }

        drop(guard);
        self.persist_metadata(key).await;
    }

    fn claim(&self, key: &ActorKey) -> bool {
        match self.inner.lock().queues.get_mut(key) {
            Some(queue) if queue.is_ready() => {
                queue.busy = true;
                true
            }
            _ => false,
        }
    }

    fn head(&self, key: &ActorKey) -> Option<QueueEntry> {
        self.inner.lock().queues.get(key).and_then(|queue| queue.head().cloned())
    }

    async fn invoke(&self, handle: &dyn InstanceHandle, key: &ActorKey, entry: &QueueEntry) -> Result<Envelope, CallError> {
        log_dispatch!(
            key,
            "dispatching",
            message_id = %entry.id,
            queued_ms = unix_millis().saturating_sub(entry.enqueued_at)
        );
        let request = ActivationRequest::Invoke(InvokeRequest {
            payload: entry.payload.clone(),
            actor_type: key.actor_type().to_string(),
            actor_id: key.actor_id().to_string(),
        });
        match self.call(handle, request).await? {
            ActivationResponse::Invoked(envelope) => Ok(envelope),
            other => Err(CallError::internal(format!("unexpected activation response: {:?}", other))),
        }
    }

    /// One addressed call, bounded by the configured call timeout. A panic
    /// inside the instance fails the call instead of the drain.
    async fn call(&self, handle: &dyn InstanceHandle, request: ActivationRequest) -> Result<ActivationResponse, CallError> {
        let call = AssertUnwindSafe(handle.call(request))
            .catch_unwind()
            .map(|outcome| outcome.unwrap_or_else(|panic| Err(CallError::internal(panic_message(panic)))));
        match self.inner.config.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or_else(|_| Err(CallError::Unreachable(format!("no answer within {:?}", limit)))),
            None => call.await,
        }
    }

    /// Resolves and removes the head, then applies the continuation.
    /// Returns whether processing of the key goes on in this cycle.
    fn complete_head(&self, key: &ActorKey, message_id: &MessageId, envelope: Envelope) -> bool {
        let mut state = self.inner.lock();
        let state = &mut *state;

        if let Some(queue) = state.queues.get_mut(key) {
            queue.pop_head(message_id);
        }
        state.pending.resolve(message_id, envelope.result);

        let mode = envelope.next_policy.mode;
        log_dispatch!(key, "resolved", message_id = %message_id, mode = ?mode);

        match mode {
            NextMode::Immediate => true,
            NextMode::Wait => false,
            NextMode::Reject => {
                let dropped = state
                    .queues
                    .get_mut(key)
                    .map(ActorQueueState::take_all)
                    .unwrap_or_default();
                for entry in &dropped {
                    state
                        .pending
                        .reject(&entry.id, RouteError::Rejected(REJECTED_BY_ACTOR.to_string()));
                }
                debug!(actor_key = %key, rejected = dropped.len(), "Queue rejected by actor");
                false
            }
        }
    }

    fn fail_head(&self, key: &ActorKey, message_id: &MessageId, error: CallError) {
        let mut state = self.inner.lock();
        if let Some(queue) = state.queues.get_mut(key) {
            queue.pop_head(message_id);
        }
        state.pending.reject(
            message_id,
            RouteError::DispatchFailure {
                key: key.to_string(),
                reason: error.to_string(),
            },
        );
    }

    /// Pre-registers idle, empty queues for spawned children that are not
    /// known yet, each in the Router serving its type, and records their
    /// metadata there. No message is sent to them.
    async fn register_spawned(&self, parent: &ActorKey, spawn: &[String]) {
        if spawn.is_empty() {
            return;
        }
        let policy = self.policy_of(parent);

        for hint in spawn {
            let child = match self.child_key(parent, hint) {
                Ok(child) => child,
                Err(err) => {
                    log_error!(err, parent = %parent, hint = %hint, "Ignoring spawn hint");
                    continue;
                }
            };
            let owner = self.owner_of(child.actor_type());
            if let Some(snapshot) = owner.preregister(&child, &policy) {
                log_lifecycle!("router", owner.name(), "child registered", parent = %parent, child = %child);
                owner.write_metadata(&child, snapshot).await;
            }
        }
    }

    fn policy_of(&self, key: &ActorKey) -> Policy {
        match self.inner.lock().queues.get(key) {
            Some(queue) => queue.policy.clone(),
            None => self.inner.config.policy_for(key.actor_type()),
        }
    }

    fn owner_of(&self, actor_type: &str) -> Router {
        match self.inner.directory.get().and_then(Weak::upgrade) {
            Some(directory) => directory.router_for(actor_type),
            None => self.clone(),
        }
    }

    /// Registers `child` with `policy` unless the key is already known.
    fn preregister(&self, child: &ActorKey, policy: &Policy) -> Option<MetadataSnapshot> {
        let mut state = self.inner.lock();
        if state.queues.contains_key(child) {
            return None;
        }
        Some(state.ensure_queue(child, || policy.clone()).snapshot())
    }

    /// `type:id` hints name the child directly; bare ids take the configured
    /// child type of the parent.
    fn child_key(&self, parent: &ActorKey, hint: &str) -> RouteResult<ActorKey> {
        if hint.contains(KEY_SEPARATOR) {
            hint.parse()
        } else {
            ActorKey::new(self.inner.config.spawn_type_for(parent.actor_type()), hint)
        }
    }

    async fn persist_metadata(&self, key: &ActorKey) {
        let snapshot = self.inner.lock().queues.get(key).map(ActorQueueState::snapshot);
        if let Some(snapshot) = snapshot {
            self.write_metadata(key, snapshot).await;
        }
    }

    async fn write_metadata(&self, key: &ActorKey, snapshot: MetadataSnapshot) {
        let value = match serde_json::to_value(&snapshot) {
            Ok(value) => value,
            Err(err) => {
                log_error!(err, actor_key = %key, "Failed to encode metadata");
                return;
            }
        };
        if let Err(err) = self.inner.store.put(&metadata_key(&key.to_string()), value).await {
            log_error!(err, actor_key = %key, "Failed to persist metadata");
        }
    }

    fn live_entries(&self, prefix: &str) -> Vec<StatusEntry> {
        let state = self.inner.lock();
        state
            .order
            .iter()
            .filter(|key| key.matches_prefix(prefix))
            .filter_map(|key| state.queues.get(key))
            .map(ActorQueueState::status_entry)
            .collect()
    }

    fn reject_waiting(&self, prefix: &str) -> usize {
        let mut state = self.inner.lock();
        let state = &mut *state;

        let mut dropped = Vec::new();
        for (key, queue) in state.queues.iter_mut() {
            if key.matches_prefix(prefix) {
                dropped.extend(queue.take_waiting());
            }
        }
        for entry in &dropped {
            state
                .pending
                .reject(&entry.id, RouteError::Rejected(REJECTED_BY_RESET.to_string()));
        }
        dropped.len()
    }
}

fn metadata_key(actor_key: &str) -> String {
    format!("{}{}", METADATA_KEY_PREFIX, actor_key)
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("instance panicked: {}", detail)
}
