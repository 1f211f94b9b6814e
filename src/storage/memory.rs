//! In-memory backing stores.
//!
//! Both stores can be switched offline to model a backing store that
//! disappears, e.g. a native key-value module that failed to load.

use super::{KeyValueStore, LocalStorage, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Debug)]
struct Shared {
    data: RwLock<HashMap<String, String>>,
    reachable: AtomicBool,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            reachable: AtomicBool::new(true),
        }
    }
}

impl Shared {
    fn check(&self, name: &str) -> Result<(), StoreError> {
        if self.reachable.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!("{name} is offline")))
        }
    }

    fn get(&self, name: &str, key: &str) -> Result<Option<String>, StoreError> {
        self.check(name)?;
        let data = self
            .data
            .read()
            .map_err(|_| StoreError::Unavailable("poisoned lock".to_owned()))?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, name: &str, key: &str, value: &str) -> Result<(), StoreError> {
        self.check(name)?;
        let mut data = self
            .data
            .write()
            .map_err(|_| StoreError::Unavailable("poisoned lock".to_owned()))?;
        data.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, name: &str, key: &str) -> Result<(), StoreError> {
        self.check(name)?;
        let mut data = self
            .data
            .write()
            .map_err(|_| StoreError::Unavailable("poisoned lock".to_owned()))?;
        data.remove(key);
        Ok(())
    }
}

/// Browser local storage kept in process memory.
///
/// Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLocalStorage {
    inner: Arc<Shared>,
}

impl InMemoryLocalStorage {
    /// Creates an empty, reachable store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches the store online or offline.
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.reachable.store(reachable, Ordering::Release);
    }
}

impl LocalStorage for InMemoryLocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get("local storage", key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set("local storage", key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove("local storage", key)
    }
}

/// Async key-value store kept in process memory.
///
/// Clones share the same contents, so a clone handed to a second connection
/// sees tokens written through the first.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKeyValueStore {
    inner: Arc<Shared>,
}

impl InMemoryKeyValueStore {
    /// Creates an empty, reachable store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that is offline from the start.
    #[must_use]
    pub fn unreachable() -> Self {
        let store = Self::default();
        store.set_reachable(false);
        store
    }

    /// Switches the store online or offline.
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.reachable.store(reachable, Ordering::Release);
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get("key-value store", key)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set("key-value store", key, value)
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove("key-value store", key)
    }
}
