use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use async_trait::async_trait;
use ordinal_api::errors::{RouteError, StorageError};
use ordinal_api::handler::MessageSender;
use ordinal_api::host::InstanceNamespace;
use ordinal_api::protocol::{ResetRequest, ResetResponse, RouteRequest, RouteResponse, StatusSnapshot};
use ordinal_api::types::{ActorKey, Payload, RouteResult, KEY_SEPARATOR};
use serde_json::Value;

use crate::config::{RouterConfig, ROUTER_INSTANCE_PREFIX};
use crate::instances::LocalInstances;
use crate::registry::HandlerRegistry;
use crate::router::{Router, RouterDirectory};
use crate::storage::MemoryBackend;

/// In-process runtime: one Router per actor type in front of locally hosted
/// activations, all backed by one [`MemoryBackend`].
///
/// Routers are created on first use of their type. Handlers reach other
/// actors through the runtime itself, which is attached to every activation
/// as its [`MessageSender`] and to every Router as its [`RouterDirectory`].
pub struct ActorRuntime {
    this: Weak<ActorRuntime>,
    config: RouterConfig,
    backend: MemoryBackend,
    instances: Arc<LocalInstances>,
    routers: RwLock<HashMap<String, Router>>,
}

impl ActorRuntime {
    pub fn new(registry: HandlerRegistry, config: RouterConfig) -> Arc<Self> {
        Self::with_backend(registry, config, MemoryBackend::new())
    }

    /// Builds a runtime over existing durable data, e.g. to simulate a
    /// restart of the dispatch layer.
    pub fn with_backend(registry: HandlerRegistry, config: RouterConfig, backend: MemoryBackend) -> Arc<Self> {
        Arc::new_cyclic(|runtime: &Weak<ActorRuntime>| {
            let instances = Arc::new(LocalInstances::new(backend.clone(), Arc::new(registry)));
            let sender: Weak<dyn MessageSender> = runtime.clone();
            instances.attach_sender(sender);

            crate::log_lifecycle!("runtime", "local", "started");
            Self {
                this: runtime.clone(),
                config,
                backend,
                instances,
                routers: RwLock::new(HashMap::new()),
            }
        })
    }

    /// Router in charge of `actor_type`, created on first request.
    pub fn router(&self, actor_type: &str) -> Router {
        if let Some(router) = self.routers.read().unwrap_or_else(PoisonError::into_inner).get(actor_type) {
            return router.clone();
        }

        let mut routers = self.routers.write().unwrap_or_else(PoisonError::into_inner);
        routers
            .entry(actor_type.to_string())
            .or_insert_with(|| {
                let name = format!("{}{}", ROUTER_INSTANCE_PREFIX, actor_type);
                let store = Arc::new(self.backend.scoped(name.as_str()));
                let instances: Arc<dyn InstanceNamespace> = self.instances.clone();
                let router = Router::new(name, self.config.clone(), store, instances);
                let directory: Weak<dyn RouterDirectory> = self.this.clone();
                router.attach_directory(directory);
                router
            })
            .clone()
    }

    /// Actor types that have a Router, sorted.
    pub fn router_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .routers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        types.sort_unstable();
        types
    }

    pub async fn route(&self, actor_type: &str, actor_id: &str, payload: Payload) -> RouteResult<Value> {
        // Validate before a Router gets created for a bogus type.
        ActorKey::new(actor_type, actor_id)?;
        self.router(actor_type).route(actor_type, actor_id, payload).await
    }

    /// Status of every actor under `actor_type_prefix`, asked of the Routers
    /// that own those keys. A prefix naming a full type (`question:`) always
    /// reaches that type's Router; a bare prefix covers the Routers started
    /// so far.
    pub async fn status(&self, actor_type_prefix: &str) -> Result<StatusSnapshot, StorageError> {
        let mut actors = Vec::new();
        for router in self.routers_for(actor_type_prefix) {
            actors.extend(router.status(actor_type_prefix).await?.actors);
        }
        Ok(StatusSnapshot { actors })
    }

    /// Resets every actor under `actor_type_prefix` through its owning Router.
    pub async fn admin_reset(&self, request: ResetRequest) -> Result<ResetResponse, StorageError> {
        let mut cleared = Vec::new();
        for router in self.routers_for(&request.actor_type_prefix) {
            cleared.extend(router.admin_reset(request.clone()).await?.cleared);
        }
        Ok(ResetResponse { ok: true, cleared })
    }

    fn routers_for(&self, actor_type_prefix: &str) -> Vec<Router> {
        match actor_type_prefix.split_once(KEY_SEPARATOR) {
            Some((actor_type, _)) if !actor_type.is_empty() => vec![self.router(actor_type)],
            _ => self
                .router_types()
                .into_iter()
                .filter(|actor_type| actor_type.starts_with(actor_type_prefix))
                .map(|actor_type| self.router(&actor_type))
                .collect(),
        }
    }

    pub async fn handle_request(&self, request: RouteRequest) -> RouteResponse {
        let router = match request.actor_type.as_deref() {
            Some(actor_type) if !actor_type.trim().is_empty() => self.router(actor_type),
            _ => return RouteError::Validation("actorType is required".to_string()).into(),
        };
        router.handle_request(request).await
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn instances(&self) -> &Arc<LocalInstances> {
        &self.instances
    }

    pub fn backend(&self) -> &MemoryBackend {
        &self.backend
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        self.instances.registry()
    }
}

impl RouterDirectory for ActorRuntime {
    fn router_for(&self, actor_type: &str) -> Router {
        self.router(actor_type)
    }
}

#[async_trait]
impl MessageSender for ActorRuntime {
    async fn send(&self, actor_type: &str, actor_id: &str, payload: Payload) -> RouteResult<Value> {
        self.route(actor_type, actor_id, payload).await
    }
}
