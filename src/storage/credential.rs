//! Credential store adapters.
//!
//! [`CredentialStore`] is the single capability the auth SDK binds to:
//! persist, load, and remove the session token. Which variant is bound depends
//! on the platform; the in-memory variant is the degraded fallback.

use super::{KeyValueStore, LocalStorage, StoreError};
use crate::platform::PlatformKind;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Key read once when binding a store to check it is reachable.
const PROBE_KEY: &str = "garage-connect:probe";

/// Which kind of credential store is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialStoreKind {
    /// Browser durable local storage.
    Browser,
    /// External async key-value store.
    AsyncKeyValue,
    /// Process memory; the session does not survive a restart.
    InMemory,
}

impl CredentialStoreKind {
    /// Returns the store kind name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::AsyncKeyValue => "async_key_value",
            Self::InMemory => "in_memory",
        }
    }

    /// Returns true if tokens survive a process restart.
    #[must_use]
    pub const fn is_durable(&self) -> bool {
        !matches!(self, Self::InMemory)
    }

    /// Returns the durable store kind used on `platform`.
    #[must_use]
    pub const fn preferred_for(platform: PlatformKind) -> Self {
        match platform {
            PlatformKind::Web => Self::Browser,
            PlatformKind::NativeMobile => Self::AsyncKeyValue,
        }
    }
}

impl fmt::Display for CredentialStoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credential persistence backed by browser local storage.
#[derive(Clone)]
pub struct BrowserPersistence {
    storage: Arc<dyn LocalStorage>,
}

impl BrowserPersistence {
    /// Binds to the browser's local storage.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if no storage was provided or it
    /// cannot be read.
    pub fn bind(storage: Option<Arc<dyn LocalStorage>>) -> Result<Self, StoreError> {
        let storage = storage
            .ok_or_else(|| StoreError::Unavailable("browser local storage not present".into()))?;
        storage.get_item(PROBE_KEY)?;
        Ok(Self { storage })
    }
}

/// Credential persistence backed by an external async key-value store.
#[derive(Clone)]
pub struct AsyncKeyValuePersistence {
    store: Arc<dyn KeyValueStore>,
}

impl AsyncKeyValuePersistence {
    /// Binds to the key-value store, probing it once.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the store cannot be reached.
    pub async fn bind(store: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        store.get(PROBE_KEY).await.map_err(|e| match e {
            StoreError::Unavailable(_) => e,
            StoreError::Corrupt(cause) => StoreError::Unavailable(cause),
        })?;
        Ok(Self { store })
    }

    /// Returns the backing store's name.
    #[must_use]
    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }
}

/// Non-durable credential persistence.
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    tokens: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryPersistence {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// The credential store bound to an auth handle.
#[derive(Clone)]
pub enum CredentialStore {
    /// Browser local storage.
    Browser(BrowserPersistence),
    /// External async key-value store.
    AsyncKeyValue(AsyncKeyValuePersistence),
    /// Process memory.
    InMemory(InMemoryPersistence),
}

impl CredentialStore {
    /// Creates a fresh in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::InMemory(InMemoryPersistence::new())
    }

    /// Returns which kind of store this is.
    #[must_use]
    pub const fn kind(&self) -> CredentialStoreKind {
        match self {
            Self::Browser(_) => CredentialStoreKind::Browser,
            Self::AsyncKeyValue(_) => CredentialStoreKind::AsyncKeyValue,
            Self::InMemory(_) => CredentialStoreKind::InMemory,
        }
    }

    /// Returns true if tokens survive a process restart.
    #[must_use]
    pub const fn is_durable(&self) -> bool {
        self.kind().is_durable()
    }

    /// Persists a token under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backing store rejects the write.
    pub async fn persist_token(&self, key: &str, value: &str) -> Result<(), StoreError> {
        match self {
            Self::Browser(p) => p.storage.set_item(key, value),
            Self::AsyncKeyValue(p) => p.store.set(key, value).await,
            Self::InMemory(p) => {
                let mut tokens = p
                    .tokens
                    .write()
                    .map_err(|_| StoreError::Unavailable("poisoned lock".to_owned()))?;
                tokens.insert(key.to_owned(), value.to_owned());
                Ok(())
            },
        }
    }

    /// Loads the token stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backing store cannot be read.
    pub async fn load_token(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            Self::Browser(p) => p.storage.get_item(key),
            Self::AsyncKeyValue(p) => p.store.get(key).await,
            Self::InMemory(p) => {
                let tokens = p
                    .tokens
                    .read()
                    .map_err(|_| StoreError::Unavailable("poisoned lock".to_owned()))?;
                Ok(tokens.get(key).cloned())
            },
        }
    }

    /// Removes the token stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backing store rejects the removal.
    pub async fn remove_token(&self, key: &str) -> Result<(), StoreError> {
        match self {
            Self::Browser(p) => p.storage.remove_item(key),
            Self::AsyncKeyValue(p) => p.store.remove(key).await,
            Self::InMemory(p) => {
                let mut tokens = p
                    .tokens
                    .write()
                    .map_err(|_| StoreError::Unavailable("poisoned lock".to_owned()))?;
                tokens.remove(key);
                Ok(())
            },
        }
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CredentialStore").field(&self.kind()).finish()
    }
}

/// Backing stores the host makes available to the connection builder.
#[derive(Clone, Default)]
pub struct CredentialBackends {
    /// Browser local storage, present on web builds.
    pub local_storage: Option<Arc<dyn LocalStorage>>,
    /// Async key-value store, present on native builds.
    pub key_value: Option<Arc<dyn KeyValueStore>>,
}

impl CredentialBackends {
    /// No backing stores; every session is in-memory.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Web builds: browser local storage only.
    #[must_use]
    pub fn web(local_storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            local_storage: Some(local_storage),
            key_value: None,
        }
    }

    /// Native builds: async key-value store only.
    #[must_use]
    pub fn native(key_value: Arc<dyn KeyValueStore>) -> Self {
        Self {
            local_storage: None,
            key_value: Some(key_value),
        }
    }

    /// Binds the durable store preferred on `platform`.
    ///
    /// Web always binds [`BrowserPersistence`] and native always binds
    /// [`AsyncKeyValuePersistence`]; a store offered for the other platform is
    /// never used.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the preferred store is missing or
    /// unreachable.
    pub async fn bind_preferred(&self, platform: PlatformKind) -> Result<CredentialStore, StoreError> {
        match platform {
            PlatformKind::Web => {
                BrowserPersistence::bind(self.local_storage.clone()).map(CredentialStore::Browser)
            },
            PlatformKind::NativeMobile => {
                let store = self.key_value.clone().ok_or_else(|| {
                    StoreError::Unavailable("async key-value store not present".into())
                })?;
                AsyncKeyValuePersistence::bind(store)
                    .await
                    .map(CredentialStore::AsyncKeyValue)
            },
        }
    }
}

impl fmt::Debug for CredentialBackends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBackends")
            .field("local_storage", &self.local_storage.is_some())
            .field("key_value", &self.key_value.as_ref().map(|s| s.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryKeyValueStore, InMemoryLocalStorage};

    fn both() -> CredentialBackends {
        CredentialBackends {
            local_storage: Some(Arc::new(InMemoryLocalStorage::new())),
            key_value: Some(Arc::new(InMemoryKeyValueStore::new())),
        }
    }

    #[tokio::test]
    async fn test_web_binds_browser() {
        let store = both()
            .bind_preferred(PlatformKind::Web)
            .await
            .expect("bind");
        assert_eq!(store.kind(), CredentialStoreKind::Browser);
        assert!(store.is_durable());
    }

    #[tokio::test]
    async fn test_native_binds_key_value() {
        let store = both()
            .bind_preferred(PlatformKind::NativeMobile)
            .await
            .expect("bind");
        assert_eq!(store.kind(), CredentialStoreKind::AsyncKeyValue);
    }

    #[tokio::test]
    async fn test_web_never_uses_key_value() {
        let backends = CredentialBackends::native(Arc::new(InMemoryKeyValueStore::new()));
        let err = backends
            .bind_preferred(PlatformKind::Web)
            .await
            .expect_err("no local storage on web");
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_native_unreachable_store() {
        let backends = CredentialBackends::native(Arc::new(InMemoryKeyValueStore::unreachable()));
        let err = backends
            .bind_preferred(PlatformKind::NativeMobile)
            .await
            .expect_err("offline store");
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_token_lifecycle_per_variant() {
        let stores = vec![
            both().bind_preferred(PlatformKind::Web).await.expect("web"),
            both()
                .bind_preferred(PlatformKind::NativeMobile)
                .await
                .expect("native"),
            CredentialStore::in_memory(),
        ];

        for store in stores {
            assert_eq!(store.load_token("k").await.expect("load"), None);
            store.persist_token("k", "v").await.expect("persist");
            assert_eq!(store.load_token("k").await.expect("load"), Some("v".into()));
            store.remove_token("k").await.expect("remove");
            assert_eq!(store.load_token("k").await.expect("load"), None);
        }
    }

    #[test]
    fn test_preferred_kind() {
        assert_eq!(
            CredentialStoreKind::preferred_for(PlatformKind::Web),
            CredentialStoreKind::Browser
        );
        assert_eq!(
            CredentialStoreKind::preferred_for(PlatformKind::NativeMobile),
            CredentialStoreKind::AsyncKeyValue
        );
        assert!(!CredentialStoreKind::InMemory.is_durable());
    }
}
