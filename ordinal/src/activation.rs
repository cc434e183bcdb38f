use std::fmt;
use std::sync::{Arc, Weak};

use ordinal_api::envelope::{Envelope, InvokeRequest, Reply};
use ordinal_api::errors::{ActorError, CallError};
use ordinal_api::handler::{HandlerContext, MessageSender};
use ordinal_api::host::DurableStore;
use ordinal_api::protocol::{ActivationRequest, ActivationResponse};
use ordinal_api::types::{unix_millis, ActorResult, Memory};
use serde_json::Value;
use tracing::{debug, warn, Instrument};

use crate::registry::HandlerRegistry;

/// Durable record holding an activation's memory.
pub const MEMORY_KEY: &str = "memory";

/// One live activation of an actor key.
///
/// Bridges the host's single-threaded instance to the handler registry and
/// owns the memory lifecycle:
///
/// 1. The first call of the activation loads memory from durable storage
///    (an empty object when nothing was stored) and caches it.
/// 2. Every invoke runs the handler against the cached memory, then persists
///    the whole object, whether the reply reports success or a domain error.
/// 3. A handler that fails outright skips persistence; the caller sees a
///    failed call.
///
/// Callers must serialize access (`&mut self`), mirroring the host's
/// one-call-at-a-time guarantee per instance.
pub struct ActorActivation {
    name: String,
    store: Arc<dyn DurableStore>,
    registry: Arc<HandlerRegistry>,
    sender: Option<Weak<dyn MessageSender>>,
    memory: Option<Memory>,
    invocations: u64,
}

impl ActorActivation {
    pub fn new(name: impl Into<String>, store: Arc<dyn DurableStore>, registry: Arc<HandlerRegistry>) -> Self {
        Self {
            name: name.into(),
            store,
            registry,
            sender: None,
            memory: None,
            invocations: 0,
        }
    }

    /// Attaches the capability handlers use to message other actors.
    pub fn with_sender(mut self, sender: Weak<dyn MessageSender>) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether memory has been loaded since activation or the last reset.
    pub fn is_initialized(&self) -> bool {
        self.memory.is_some()
    }

    /// Handler invocations served by this activation.
    pub fn invocations(&self) -> u64 {
        self.invocations
    }

    /// Dispatches one addressed call.
    pub async fn handle(&mut self, request: ActivationRequest) -> Result<ActivationResponse, CallError> {
        let response = match request {
            ActivationRequest::Invoke(invoke) => self.invoke(invoke).await.map(ActivationResponse::Invoked),
            ActivationRequest::Status => self.status().await.map(ActivationResponse::Memory),
            ActivationRequest::Reset => self.admin_reset().await.map(|_| ActivationResponse::Reset),
        };
        response.map_err(|err| {
            warn!(instance = %self.name, error = %err, "Activation call failed");
            CallError::from(err)
        })
    }

    pub async fn invoke(&mut self, request: InvokeRequest) -> ActorResult<Envelope> {
        let InvokeRequest {
            payload,
            actor_type,
            actor_id,
        } = request;

        self.ensure_loaded().await?;

        let Some(handler) = self.registry.get(&actor_type) else {
            warn!(instance = %self.name, actor_type = %actor_type, "No handler registered for actor type");
            return Ok(Reply::failure(ActorError::UnknownActorType(actor_type).to_string()).normalize());
        };

        let sender = self.sender.as_ref().and_then(Weak::upgrade);
        let span = crate::actor_span!(actor_type.as_str(), actor_id.as_str());
        let memory = self.memory.get_or_insert_with(Memory::new);
        let reply = {
            let mut ctx = HandlerContext::new(&actor_type, &actor_id, memory, unix_millis(), sender);
            handler.handle(payload, &mut ctx).instrument(span).await?
        };
        self.invocations += 1;

        self.persist().await?;
        Ok(reply.normalize())
    }

    /// Read-only view of the loaded memory.
    pub async fn status(&mut self) -> ActorResult<Memory> {
        Ok(self.ensure_loaded().await?.clone())
    }

    /// Deletes the durable memory and forgets the cached copy.
    pub async fn admin_reset(&mut self) -> ActorResult<()> {
        self.store.delete(MEMORY_KEY).await?;
        self.memory = None;
        crate::log_lifecycle!("activation", self.name.as_str(), "reset");
        Ok(())
    }

    async fn ensure_loaded(&mut self) -> ActorResult<&mut Memory> {
        if self.memory.is_none() {
            let loaded = match self.store.get(MEMORY_KEY).await? {
                Some(Value::Object(map)) => map,
                Some(other) => {
                    warn!(instance = %self.name, stored = %other, "Stored memory is not an object, starting empty");
                    Memory::new()
                }
                None => Memory::new(),
            };
            debug!(instance = %self.name, keys = loaded.len(), "Memory loaded");
            self.memory = Some(loaded);
        }
        Ok(self.memory.get_or_insert_with(Memory::new))
    }

    async fn persist(&self) -> ActorResult<()> {
        let snapshot = Value::Object(self.memory.clone().unwrap_or_default());
        self.store.put(MEMORY_KEY, snapshot).await?;
        debug!(instance = %self.name, "Memory persisted");
        Ok(())
    }
}

impl fmt::Debug for ActorActivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorActivation")
            .field("name", &self.name)
            .field("initialized", &self.is_initialized())
            .field("invocations", &self.invocations)
            .finish()
    }
}
