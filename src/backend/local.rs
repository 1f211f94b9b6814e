//! In-process reference SDK.
//!
//! `LocalBackend` behaves like the hosted SDK where the connection builder can
//! observe it: an app registry keyed by app name, one auth instance per app,
//! and session tokens written through whatever credential store auth is bound
//! to. Documents and blobs live in memory. It backs the diagnostic CLI and the
//! test suite.

use super::{AuthInitError, BackendSdk, SdkError};
use crate::config::BackendConfig;
use crate::storage::{CredentialStore, CredentialStoreKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

fn internal(what: &str) -> SdkError {
    SdkError::new("app/internal-error", format!("{what} lock poisoned"))
}

/// Registered app handle.
#[derive(Debug, Clone)]
pub struct LocalApp {
    inner: Arc<AppInner>,
}

#[derive(Debug)]
struct AppInner {
    instance_id: Uuid,
    config: BackendConfig,
    documents: LocalDocuments,
    blobs: LocalBlobs,
}

impl LocalApp {
    /// Returns the registry name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.config.app_name
    }

    /// Returns the project identifier.
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.inner.config.project_id
    }

    /// Returns the unique id of this registration.
    #[must_use]
    pub fn instance_id(&self) -> Uuid {
        self.inner.instance_id
    }

    /// Returns true if both handles refer to the same registration.
    #[must_use]
    pub fn same_app(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Document store handle: JSON documents addressed by collection and id.
#[derive(Debug, Clone, Default)]
pub struct LocalDocuments {
    docs: Arc<RwLock<HashMap<(String, String), serde_json::Value>>>,
}

impl LocalDocuments {
    /// Writes a document, replacing any previous version.
    ///
    /// # Errors
    ///
    /// Returns an [`SdkError`] if the store is in an inconsistent state.
    pub fn set(&self, collection: &str, id: &str, doc: serde_json::Value) -> Result<(), SdkError> {
        let mut docs = self.docs.write().map_err(|_| internal("documents"))?;
        docs.insert((collection.to_owned(), id.to_owned()), doc);
        Ok(())
    }

    /// Reads a document.
    ///
    /// # Errors
    ///
    /// Returns an [`SdkError`] if the store is in an inconsistent state.
    pub fn get(&self, collection: &str, id: &str) -> Result<Option<serde_json::Value>, SdkError> {
        let docs = self.docs.read().map_err(|_| internal("documents"))?;
        Ok(docs.get(&(collection.to_owned(), id.to_owned())).cloned())
    }

    /// Deletes a document; returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an [`SdkError`] if the store is in an inconsistent state.
    pub fn delete(&self, collection: &str, id: &str) -> Result<bool, SdkError> {
        let mut docs = self.docs.write().map_err(|_| internal("documents"))?;
        Ok(docs.remove(&(collection.to_owned(), id.to_owned())).is_some())
    }
}

/// Blob store handle: byte objects addressed by path.
#[derive(Debug, Clone, Default)]
pub struct LocalBlobs {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl LocalBlobs {
    /// Uploads an object.
    ///
    /// # Errors
    ///
    /// Returns an [`SdkError`] if the store is in an inconsistent state.
    pub fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), SdkError> {
        let mut objects = self.objects.write().map_err(|_| internal("blobs"))?;
        objects.insert(path.to_owned(), bytes);
        Ok(())
    }

    /// Downloads an object.
    ///
    /// # Errors
    ///
    /// Returns `storage/object-not-found` if nothing is stored at `path`.
    pub fn get(&self, path: &str) -> Result<Vec<u8>, SdkError> {
        let objects = self.objects.read().map_err(|_| internal("blobs"))?;
        objects.get(path).cloned().ok_or_else(|| {
            SdkError::new("storage/object-not-found", format!("no object at '{path}'"))
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    uid: String,
    session_id: Uuid,
}

/// Auth handle bound to one credential store.
#[derive(Debug, Clone)]
pub struct LocalAuth {
    inner: Arc<AuthInner>,
}

#[derive(Debug)]
struct AuthInner {
    app: LocalApp,
    store: CredentialStore,
    current: RwLock<Option<String>>,
}

impl LocalAuth {
    /// Returns the app this auth instance belongs to.
    #[must_use]
    pub fn app(&self) -> &LocalApp {
        &self.inner.app
    }

    /// Returns the kind of store the session is persisted in.
    #[must_use]
    pub fn persistence(&self) -> CredentialStoreKind {
        self.inner.store.kind()
    }

    /// Key the session token is stored under.
    #[must_use]
    pub fn token_key(&self) -> String {
        format!(
            "auth_user:{}:{}",
            self.inner.app.project_id(),
            self.inner.app.name()
        )
    }

    /// Signs a user in and persists the session.
    ///
    /// A failing credential store does not fail the sign-in; the session just
    /// won't survive a restart.
    ///
    /// # Errors
    ///
    /// Returns `auth/invalid-credential` for a blank user id.
    pub async fn sign_in(&self, uid: &str) -> Result<(), SdkError> {
        if uid.trim().is_empty() {
            return Err(SdkError::new("auth/invalid-credential", "empty user id"));
        }

        let session = StoredSession {
            uid: uid.to_owned(),
            session_id: Uuid::now_v7(),
        };
        let token = serde_json::to_string(&session)
            .map_err(|e| SdkError::new("auth/internal-error", e.to_string()))?;
        if let Err(e) = self.inner.store.persist_token(&self.token_key(), &token).await {
            tracing::warn!(error = %e, "Failed to persist auth session");
        }

        self.set_current(Some(uid.to_owned()))
    }

    /// Returns the signed-in user, restoring it from the credential store on
    /// first call after a restart.
    ///
    /// # Errors
    ///
    /// Returns an [`SdkError`] if the auth state is inconsistent.
    pub async fn current_user(&self) -> Result<Option<String>, SdkError> {
        {
            let current = self.inner.current.read().map_err(|_| internal("auth"))?;
            if current.is_some() {
                return Ok(current.clone());
            }
        }

        let restored = match self.inner.store.load_token(&self.token_key()).await {
            Ok(Some(token)) => match serde_json::from_str::<StoredSession>(&token) {
                Ok(session) => Some(session.uid),
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding unreadable auth session");
                    None
                },
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to restore auth session");
                None
            },
        };

        if restored.is_some() {
            self.set_current(restored.clone())?;
        }
        Ok(restored)
    }

    /// Signs the current user out and forgets the persisted session.
    ///
    /// # Errors
    ///
    /// Returns an [`SdkError`] if the auth state is inconsistent.
    pub async fn sign_out(&self) -> Result<(), SdkError> {
        self.set_current(None)?;
        if let Err(e) = self.inner.store.remove_token(&self.token_key()).await {
            tracing::warn!(error = %e, "Failed to remove persisted auth session");
        }
        Ok(())
    }

    fn set_current(&self, uid: Option<String>) -> Result<(), SdkError> {
        let mut current = self.inner.current.write().map_err(|_| internal("auth"))?;
        *current = uid;
        Ok(())
    }
}

/// In-process implementation of [`BackendSdk`].
#[derive(Debug, Default)]
pub struct LocalBackend {
    apps: Mutex<HashMap<String, LocalApp>>,
    auths: Mutex<HashMap<Uuid, LocalAuth>>,
    registrations: AtomicUsize,
}

impl LocalBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of apps registered so far.
    #[must_use]
    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::Acquire)
    }

    fn has_auth(&self, app: &LocalApp) -> Result<bool, SdkError> {
        let auths = self.auths.lock().map_err(|_| internal("auth registry"))?;
        Ok(auths.contains_key(&app.instance_id()))
    }
}

#[async_trait]
impl BackendSdk for LocalBackend {
    type App = LocalApp;
    type Auth = LocalAuth;
    type Documents = LocalDocuments;
    type Blobs = LocalBlobs;

    /// Returns the app registered under `config.app_name` only if it was
    /// registered with the same options; a conflicting registration is left
    /// for `initialize_app` to reject.
    fn existing_app(&self, config: &BackendConfig) -> Option<LocalApp> {
        let apps = self.apps.lock().ok()?;
        apps.get(&config.app_name)
            .filter(|app| app.inner.config.same_options(config))
            .cloned()
    }

    async fn initialize_app(&self, config: &BackendConfig) -> Result<LocalApp, SdkError> {
        config
            .validate()
            .map_err(|e| SdkError::new("app/invalid-app-argument", e.to_string()))?;

        let mut apps = self.apps.lock().map_err(|_| internal("app registry"))?;
        if let Some(existing) = apps.get(&config.app_name) {
            if existing.inner.config.same_options(config) {
                return Ok(existing.clone());
            }
            return Err(SdkError::new(
                "app/duplicate-app",
                format!(
                    "app '{}' already exists with different options",
                    config.app_name
                ),
            ));
        }

        let app = LocalApp {
            inner: Arc::new(AppInner {
                instance_id: Uuid::new_v4(),
                config: config.clone(),
                documents: LocalDocuments::default(),
                blobs: LocalBlobs::default(),
            }),
        };
        apps.insert(config.app_name.clone(), app.clone());
        self.registrations.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(
            app = %config.app_name,
            project_id = %config.project_id,
            "Registered app"
        );
        Ok(app)
    }

    async fn document_store(&self, app: &LocalApp) -> Result<LocalDocuments, SdkError> {
        Ok(app.inner.documents.clone())
    }

    async fn blob_store(&self, app: &LocalApp) -> Result<LocalBlobs, SdkError> {
        Ok(app.inner.blobs.clone())
    }

    async fn initialize_auth(
        &self,
        app: &LocalApp,
        store: CredentialStore,
    ) -> Result<LocalAuth, AuthInitError> {
        let already = || AuthInitError::AlreadyInitialized {
            app_name: app.name().to_owned(),
        };
        if self.has_auth(app)? {
            return Err(already());
        }

        let auth = LocalAuth {
            inner: Arc::new(AuthInner {
                app: app.clone(),
                store,
                current: RwLock::new(None),
            }),
        };
        // Binding reads the persisted session once; an unreachable store fails here.
        auth.inner.store.load_token(&auth.token_key()).await?;

        let mut auths = self.auths.lock().map_err(|_| internal("auth registry"))?;
        if auths.contains_key(&app.instance_id()) {
            return Err(already());
        }
        auths.insert(app.instance_id(), auth.clone());
        drop(auths);

        tracing::debug!(
            app = %app.name(),
            persistence = %auth.persistence(),
            "Initialized auth"
        );
        Ok(auth)
    }

    fn existing_auth(&self, app: &LocalApp) -> Option<LocalAuth> {
        let auths = self.auths.lock().ok()?;
        auths.get(&app.instance_id()).cloned()
    }

    fn auth_persistence(&self, auth: &LocalAuth) -> CredentialStoreKind {
        auth.persistence()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{CredentialBackends, InMemoryKeyValueStore};
    use crate::PlatformKind;

    fn config() -> BackendConfig {
        BackendConfig::new("garage-test", "key", "1:1:web:1")
    }

    #[tokio::test]
    async fn test_app_registry_is_idempotent() {
        let sdk = LocalBackend::new();
        assert!(sdk.existing_app(&config()).is_none());

        let first = sdk.initialize_app(&config()).await.expect("register");
        let second = sdk.initialize_app(&config()).await.expect("re-register");
        assert!(first.same_app(&second));
        assert_eq!(sdk.registrations(), 1);
        assert!(sdk.existing_app(&config()).is_some());
    }

    #[tokio::test]
    async fn test_duplicate_app_with_different_options() {
        let sdk = LocalBackend::new();
        sdk.initialize_app(&config()).await.expect("register");

        let err = sdk
            .initialize_app(&config().with_api_key("other"))
            .await
            .expect_err("different options");
        assert_eq!(err.code, "app/duplicate-app");
        assert!(sdk.existing_app(&config().with_api_key("other")).is_none());
        assert!(sdk.existing_app(&config()).is_some());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let sdk = LocalBackend::new();
        let err = sdk
            .initialize_app(&config().with_api_key(""))
            .await
            .expect_err("empty key");
        assert_eq!(err.code, "app/invalid-app-argument");
    }

    #[tokio::test]
    async fn test_auth_initializes_once_per_app() {
        let sdk = LocalBackend::new();
        let app = sdk.initialize_app(&config()).await.expect("register");

        let auth = sdk
            .initialize_auth(&app, CredentialStore::in_memory())
            .await
            .expect("auth");
        assert_eq!(auth.persistence(), CredentialStoreKind::InMemory);

        let err = sdk
            .initialize_auth(&app, CredentialStore::in_memory())
            .await
            .expect_err("second auth");
        assert!(matches!(err, AuthInitError::AlreadyInitialized { .. }));
        assert!(sdk.existing_auth(&app).is_some());
    }

    #[tokio::test]
    async fn test_session_survives_restart_with_durable_store() {
        let kv = InMemoryKeyValueStore::new();
        let backends = CredentialBackends::native(Arc::new(kv.clone()));

        let sdk = LocalBackend::new();
        let app = sdk.initialize_app(&config()).await.expect("register");
        let store = backends
            .bind_preferred(PlatformKind::NativeMobile)
            .await
            .expect("bind");
        let auth = sdk.initialize_auth(&app, store).await.expect("auth");
        auth.sign_in("mechanic-42").await.expect("sign in");

        // A fresh SDK over the same key-value store restores the session.
        let restarted = LocalBackend::new();
        let app = restarted.initialize_app(&config()).await.expect("register");
        let store = backends
            .bind_preferred(PlatformKind::NativeMobile)
            .await
            .expect("bind");
        let auth = restarted.initialize_auth(&app, store).await.expect("auth");
        assert_eq!(
            auth.current_user().await.expect("current user"),
            Some("mechanic-42".to_string())
        );

        auth.sign_out().await.expect("sign out");
        assert_eq!(auth.current_user().await.expect("current user"), None);
    }

    #[tokio::test]
    async fn test_persisted_session_is_json_with_session_id() {
        let sdk = LocalBackend::new();
        let app = sdk.initialize_app(&config()).await.expect("register");
        let store = CredentialBackends::native(Arc::new(InMemoryKeyValueStore::new()))
            .bind_preferred(PlatformKind::NativeMobile)
            .await
            .expect("bind");
        let auth = sdk.initialize_auth(&app, store).await.expect("auth");
        auth.sign_in("mechanic-7").await.expect("sign in");

        let token = auth
            .inner
            .store
            .load_token(&auth.token_key())
            .await
            .expect("load")
            .expect("persisted");
        let raw: serde_json::Value = serde_json::from_str(&token).expect("json");
        assert_eq!(raw["uid"], "mechanic-7");
        let session_id = raw["session_id"].as_str().expect("session id string");
        assert!(Uuid::parse_str(session_id).is_ok());
    }

    #[tokio::test]
    async fn test_blob_not_found_code() {
        let sdk = LocalBackend::new();
        let app = sdk.initialize_app(&config()).await.expect("register");
        let blobs = sdk.blob_store(&app).await.expect("blobs");

        let err = blobs.get("invoices/1.pdf").expect_err("missing");
        assert_eq!(err.code, "storage/object-not-found");

        blobs.put("invoices/1.pdf", vec![1, 2, 3]).expect("put");
        assert_eq!(blobs.get("invoices/1.pdf").expect("get"), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_documents_are_shared_per_app() {
        let sdk = LocalBackend::new();
        let app = sdk.initialize_app(&config()).await.expect("register");
        let a = sdk.document_store(&app).await.expect("documents");
        let b = sdk.document_store(&app).await.expect("documents");

        a.set("vehicles", "AB123CD", serde_json::json!({"make": "Fiat"}))
            .expect("set");
        assert_eq!(
            b.get("vehicles", "AB123CD").expect("get"),
            Some(serde_json::json!({"make": "Fiat"}))
        );
        assert!(b.delete("vehicles", "AB123CD").expect("delete"));
    }
}
