use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ordinal_api::errors::RegistryError;
use ordinal_api::handler::{ActorHandler, ActorType};

/// Fixed mapping from actor type tags to their handlers.
///
/// Built once at startup through [`HandlerRegistryBuilder`] and immutable
/// afterwards; activations look handlers up by the `actorType` of each call.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ActorHandler>>,
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    pub fn get(&self, actor_type: &str) -> Option<Arc<dyn ActorHandler>> {
        self.handlers.get(actor_type).cloned()
    }

    pub fn contains(&self, actor_type: &str) -> bool {
        self.handlers.contains_key(actor_type)
    }

    /// Registered type tags, sorted.
    pub fn actor_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("actor_types", &self.actor_types())
            .finish()
    }
}

/// Collects handlers and validates the tag set before freezing it.
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: Vec<(String, Arc<dyn ActorHandler>)>,
}

impl HandlerRegistryBuilder {
    /// Registers a handler under its derived [`ActorType`] tag.
    pub fn handler<H>(self, handler: H) -> Self
    where
        H: ActorHandler + ActorType,
    {
        self.register(H::ACTOR_TYPE, handler)
    }

    /// Registers a handler under an explicit tag.
    pub fn register<H>(mut self, actor_type: impl Into<String>, handler: H) -> Self
    where
        H: ActorHandler,
    {
        self.handlers.push((actor_type.into(), Arc::new(handler)));
        self
    }

    pub fn register_shared(mut self, actor_type: impl Into<String>, handler: Arc<dyn ActorHandler>) -> Self {
        self.handlers.push((actor_type.into(), handler));
        self
    }

    pub fn build(self) -> Result<HandlerRegistry, RegistryError> {
        let mut handlers = HashMap::with_capacity(self.handlers.len());
        for (actor_type, handler) in self.handlers {
            if actor_type.trim().is_empty() {
                return Err(RegistryError::EmptyActorType);
            }
            if handlers.contains_key(&actor_type) {
                return Err(RegistryError::DuplicateActorType(actor_type));
            }
            handlers.insert(actor_type, handler);
        }
        Ok(HandlerRegistry { handlers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ordinal_api::envelope::Reply;
    use ordinal_api::handler::HandlerContext;
    use ordinal_api::types::{ActorResult, Payload};

    struct Noop;

    #[async_trait]
    impl ActorHandler for Noop {
        async fn handle(&self, payload: Payload, _ctx: &mut HandlerContext<'_>) -> ActorResult<Reply> {
            Ok(Reply::ok(payload))
        }
    }

    #[test]
    fn test_build_and_lookup() {
        let registry = HandlerRegistry::builder()
            .register("room", Noop)
            .register("lobby", Noop)
            .build()
            .unwrap();

        assert!(registry.contains("room"));
        assert!(registry.get("lobby").is_some());
        assert!(registry.get("teacher").is_none());
        assert_eq!(registry.actor_types(), vec!["lobby", "room"]);
    }

    #[test]
    fn test_duplicate_tag_is_rejected() {
        let result = HandlerRegistry::builder()
            .register("room", Noop)
            .register("room", Noop)
            .build();
        assert_eq!(result.unwrap_err(), RegistryError::DuplicateActorType("room".to_string()));
    }

    #[test]
    fn test_empty_tag_is_rejected() {
        let result = HandlerRegistry::builder().register(" ", Noop).build();
        assert_eq!(result.unwrap_err(), RegistryError::EmptyActorType);
    }
}
