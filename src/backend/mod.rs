//! Backend SDK seam.
//!
//! The hosted auth, document and blob services are reached through an SDK this
//! crate treats as opaque. [`BackendSdk`] names the handful of calls the
//! connection builder makes; the handles it returns are threaded through
//! untouched.
//!
//! ```text
//! BackendSdk
//!   ├── existing_app / initialize_app  → App
//!   ├── document_store(&App)           → Documents
//!   ├── blob_store(&App)               → Blobs
//!   └── initialize_auth / existing_auth → Auth (bound to a CredentialStore)
//! ```

mod local;

pub use local::{LocalApp, LocalAuth, LocalBackend, LocalBlobs, LocalDocuments};

use crate::config::BackendConfig;
use crate::storage::{CredentialStore, CredentialStoreKind, StoreError};
use async_trait::async_trait;
use thiserror::Error;

/// An error reported by the backend SDK, carrying its namespaced error code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct SdkError {
    /// Namespaced code, e.g. `auth/wrong-password` or `app/duplicate-app`.
    pub code: String,
    /// Raw message from the SDK.
    pub message: String,
}

impl SdkError {
    /// Creates an SDK error.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Why the SDK refused to construct an auth handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthInitError {
    /// Auth was already initialized for this app, possibly with a different store.
    #[error("auth already initialized for app '{app_name}'")]
    AlreadyInitialized {
        /// The app the auth instance belongs to.
        app_name: String,
    },
    /// The credential store failed while the SDK bound it.
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
    /// Any other SDK failure.
    #[error(transparent)]
    Sdk(#[from] SdkError),
}

/// The backend SDK surface used to build a connection.
///
/// Handle types are owned by the SDK. They must be cheap to clone (typically
/// an `Arc` inside) because every consumer of the connection holds a copy.
#[async_trait]
pub trait BackendSdk: Send + Sync + 'static {
    /// Top-level app registration.
    type App: Clone + Send + Sync + 'static;
    /// Authentication handle.
    type Auth: Clone + Send + Sync + 'static;
    /// Document store handle.
    type Documents: Clone + Send + Sync + 'static;
    /// Blob store handle.
    type Blobs: Clone + Send + Sync + 'static;

    /// Returns the app already registered for `config`, if any.
    fn existing_app(&self, config: &BackendConfig) -> Option<Self::App>;

    /// Registers an app for `config`.
    async fn initialize_app(&self, config: &BackendConfig) -> Result<Self::App, SdkError>;

    /// Constructs the document store handle.
    async fn document_store(&self, app: &Self::App) -> Result<Self::Documents, SdkError>;

    /// Constructs the blob store handle.
    async fn blob_store(&self, app: &Self::App) -> Result<Self::Blobs, SdkError>;

    /// Constructs the auth handle with `store` bound for session persistence.
    async fn initialize_auth(
        &self,
        app: &Self::App,
        store: CredentialStore,
    ) -> Result<Self::Auth, AuthInitError>;

    /// Returns the auth handle already bound to `app`, if any.
    fn existing_auth(&self, app: &Self::App) -> Option<Self::Auth>;

    /// Returns the kind of credential store `auth` persists its session in.
    fn auth_persistence(&self, auth: &Self::Auth) -> CredentialStoreKind;
}
