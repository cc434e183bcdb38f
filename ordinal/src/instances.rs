use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};

use async_trait::async_trait;
use ordinal_api::errors::CallError;
use ordinal_api::handler::MessageSender;
use ordinal_api::host::{InstanceHandle, InstanceNamespace};
use ordinal_api::protocol::{ActivationRequest, ActivationResponse};
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use crate::activation::ActorActivation;
use crate::registry::HandlerRegistry;
use crate::storage::MemoryBackend;

type SharedActivation = Arc<AsyncMutex<ActorActivation>>;

/// In-process instance namespace hosting actor activations.
///
/// Names resolve lazily: the first call to a name creates its activation with
/// a store scoped to that name. Each activation sits behind its own async
/// mutex, so calls to one instance run one at a time while different
/// instances proceed independently.
pub struct LocalInstances {
    backend: MemoryBackend,
    registry: Arc<HandlerRegistry>,
    activations: Mutex<HashMap<String, SharedActivation>>,
    sender: OnceLock<Weak<dyn MessageSender>>,
}

impl LocalInstances {
    pub fn new(backend: MemoryBackend, registry: Arc<HandlerRegistry>) -> Self {
        Self {
            backend,
            registry,
            activations: Mutex::new(HashMap::new()),
            sender: OnceLock::new(),
        }
    }

    /// Sender handed to every activation created from now on.
    /// Only the first attachment takes effect.
    pub fn attach_sender(&self, sender: Weak<dyn MessageSender>) {
        let _ = self.sender.set(sender);
    }

    /// Drops the live activation behind `name`, keeping its durable data.
    ///
    /// The next call re-creates the activation, which reloads memory from storage.
    pub fn evict(&self, name: &str) -> bool {
        let evicted = self.lock().remove(name).is_some();
        if evicted {
            debug!(instance = %name, "Activation evicted");
        }
        evicted
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// Names of live activations, sorted.
    pub fn active_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn backend(&self) -> &MemoryBackend {
        &self.backend
    }

    fn activation(&self, name: &str) -> SharedActivation {
        let mut activations = self.lock();
        if let Some(existing) = activations.get(name) {
            return Arc::clone(existing);
        }

        let mut activation = ActorActivation::new(
            name,
            Arc::new(self.backend.scoped(name)),
            Arc::clone(&self.registry),
        );
        if let Some(sender) = self.sender.get() {
            activation = activation.with_sender(Weak::clone(sender));
        }
        crate::log_lifecycle!("activation", name, "created");

        let shared = Arc::new(AsyncMutex::new(activation));
        activations.insert(name.to_string(), Arc::clone(&shared));
        shared
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SharedActivation>> {
        self.activations.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl InstanceNamespace for LocalInstances {
    fn resolve(&self, name: &str) -> Arc<dyn InstanceHandle> {
        Arc::new(LocalHandle {
            activation: self.activation(name),
        })
    }
}

/// Addressed-call handle to one local activation.
pub struct LocalHandle {
    activation: SharedActivation,
}

#[async_trait]
impl InstanceHandle for LocalHandle {
    async fn call(&self, request: ActivationRequest) -> Result<ActivationResponse, CallError> {
        let mut activation = self.activation.lock().await;
        activation.handle(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ordinal_api::envelope::{InvokeRequest, Reply};
    use ordinal_api::handler::{ActorHandler, HandlerContext};
    use ordinal_api::types::{ActorResult, Payload};
    use serde_json::{json, Value};

    struct Tally;

    #[async_trait]
    impl ActorHandler for Tally {
        async fn handle(&self, _payload: Payload, ctx: &mut HandlerContext<'_>) -> ActorResult<Reply> {
            let n = ctx.memory.get("n").and_then(Value::as_u64).unwrap_or(0) + 1;
            ctx.memory.insert("n".to_string(), json!(n));
            Ok(Reply::ok(json!(n)))
        }
    }

    fn instances() -> LocalInstances {
        let registry = HandlerRegistry::builder().register("tally", Tally).build().unwrap();
        LocalInstances::new(MemoryBackend::new(), Arc::new(registry))
    }

    async fn bump(instances: &LocalInstances, name: &str) -> Value {
        let request = ActivationRequest::Invoke(InvokeRequest {
            payload: json!({}),
            actor_type: "tally".to_string(),
            actor_id: name.trim_start_matches("tally:").to_string(),
        });
        match instances.resolve(name).call(request).await.unwrap() {
            ActivationResponse::Invoked(envelope) => envelope.result,
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resolve_reuses_activation() {
        let instances = instances();
        assert_eq!(bump(&instances, "tally:a").await, json!(1));
        assert_eq!(bump(&instances, "tally:a").await, json!(2));
        assert_eq!(bump(&instances, "tally:b").await, json!(1));
        assert_eq!(instances.active_names(), vec!["tally:a", "tally:b"]);
    }

    #[tokio::test]
    async fn test_evicted_activation_reloads_memory() {
        let instances = instances();
        bump(&instances, "tally:a").await;

        assert!(instances.evict("tally:a"));
        assert!(!instances.is_active("tally:a"));
        assert!(!instances.evict("tally:a"));

        assert_eq!(bump(&instances, "tally:a").await, json!(2));
    }

    #[tokio::test]
    async fn test_status_and_reset_calls() {
        let instances = instances();
        bump(&instances, "tally:a").await;

        let handle = instances.resolve("tally:a");
        let memory = handle.call(ActivationRequest::Status).await.unwrap();
        assert_eq!(memory, ActivationResponse::Memory(json!({"n": 1}).as_object().cloned().unwrap()));

        assert_eq!(handle.call(ActivationRequest::Reset).await.unwrap(), ActivationResponse::Reset);
        assert!(instances.backend().is_empty("tally:a"));
    }
}
