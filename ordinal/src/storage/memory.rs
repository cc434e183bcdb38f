use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use ordinal_api::errors::StorageError;
use ordinal_api::host::DurableStore;
use serde_json::Value;

type Namespaces = HashMap<String, BTreeMap<String, Value>>;

/// Shared backing memory for every instance namespace.
///
/// Data outlives the activations that wrote it: dropping an activation and
/// resolving it again sees the same records, which is what the host's
/// durable storage guarantees. Cloning yields another handle to the same data.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    namespaces: Arc<RwLock<Namespaces>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store scoped to one instance namespace.
    pub fn scoped(&self, namespace: impl Into<String>) -> MemoryStore {
        MemoryStore {
            namespace: namespace.into(),
            backend: self.clone(),
        }
    }

    /// Makes every store operation fail with `StorageError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of records held in `namespace`.
    pub fn len(&self, namespace: &str) -> usize {
        self.read().get(namespace).map(BTreeMap::len).unwrap_or(0)
    }

    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("memory backend switched off".to_string()));
        }
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Namespaces> {
        self.namespaces.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Namespaces> {
        self.namespaces.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("namespaces", &self.read().len())
            .field("unavailable", &self.unavailable.load(Ordering::SeqCst))
            .finish()
    }
}

/// Durable store view limited to a single namespace.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    namespace: String,
    backend: MemoryBackend,
}

impl MemoryStore {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        self.backend.check_available()?;
        Ok(self
            .backend
            .read()
            .get(&self.namespace)
            .and_then(|records| records.get(key))
            .cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.backend.check_available()?;
        self.backend
            .write()
            .entry(self.namespace.clone())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.backend.check_available()?;
        let mut namespaces = self.backend.write();
        let removed = namespaces
            .get_mut(&self.namespace)
            .map(|records| records.remove(key).is_some())
            .unwrap_or(false);
        if namespaces.get(&self.namespace).is_some_and(BTreeMap::is_empty) {
            namespaces.remove(&self.namespace);
        }
        Ok(removed)
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<(String, Value)>, StorageError> {
        self.backend.check_available()?;
        let namespaces = self.backend.read();
        let Some(records) = namespaces.get(&self.namespace) else {
            return Ok(Vec::new());
        };
        Ok(records
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_get_delete() {
        let backend = MemoryBackend::new();
        let store = backend.scoped("room:r1");

        store.put("memory", json!({"seats": 3})).await.unwrap();
        assert_eq!(store.get("memory").await.unwrap(), Some(json!({"seats": 3})));

        assert!(store.delete("memory").await.unwrap());
        assert!(!store.delete("memory").await.unwrap());
        assert_eq!(store.get("memory").await.unwrap(), None);
        assert!(backend.is_empty("room:r1"));
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let backend = MemoryBackend::new();
        let a = backend.scoped("room:a");
        let b = backend.scoped("room:b");

        a.put("memory", json!(1)).await.unwrap();
        assert_eq!(b.get("memory").await.unwrap(), None);
        assert_eq!(backend.len("room:a"), 1);
    }

    #[tokio::test]
    async fn test_list_by_prefix_is_ordered() {
        let store = MemoryBackend::new().scoped("router:room");
        store.put("meta:room:b", json!(2)).await.unwrap();
        store.put("meta:lobby:x", json!(0)).await.unwrap();
        store.put("meta:room:a", json!(1)).await.unwrap();

        let listed = store.list_by_prefix("meta:room:").await.unwrap();
        let keys: Vec<&str> = listed.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["meta:room:a", "meta:room:b"]);

        assert_eq!(store.list_by_prefix("meta:").await.unwrap().len(), 3);
        assert!(store.list_by_prefix("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_data_survives_new_scope_handles() {
        let backend = MemoryBackend::new();
        backend.scoped("room:r1").put("memory", json!({"n": 1})).await.unwrap();

        let reopened = backend.scoped("room:r1");
        assert_eq!(reopened.get("memory").await.unwrap(), Some(json!({"n": 1})));
    }

    #[tokio::test]
    async fn test_unavailable_backend() {
        let backend = MemoryBackend::new();
        let store = backend.scoped("room:r1");
        backend.set_unavailable(true);

        assert!(matches!(store.get("memory").await, Err(StorageError::Unavailable(_))));
        assert!(matches!(store.put("memory", json!(1)).await, Err(StorageError::Unavailable(_))));

        backend.set_unavailable(false);
        assert!(store.put("memory", json!(1)).await.is_ok());
    }
}
