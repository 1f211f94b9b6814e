//! # garage-connect
//!
//! Cross-platform backend connection facade for the garage vehicle-management app.
//!
//! The app talks to a hosted authentication, document and blob backend from both
//! browser builds and native mobile builds. This crate owns the one piece of that
//! plumbing with rules of its own: deciding, per platform, how to construct a single
//! shared connection to the backend, where the auth session token is persisted, and
//! how backend error codes are shown to users.
//!
//! ## Components
//!
//! - [`platform`]: reports whether the process runs as `Web` or `NativeMobile`
//! - [`storage`]: credential store adapters (browser storage, async key-value store, in-memory)
//! - [`backend`]: the backend SDK seam plus an in-process reference SDK
//! - [`services`]: the connection builder, the connection manager, and the error translator
//! - [`observability`]: logging setup and connection events
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use garage_connect::{BackendConfig, ConnectionManager, CredentialBackends, LocalBackend};
//! use garage_connect::storage::InMemoryKeyValueStore;
//!
//! let config = BackendConfig::new("garage-prod", "api-key", "1:123:android:abc");
//! let stores = CredentialBackends::native(Arc::new(InMemoryKeyValueStore::new()));
//! let manager = Arc::new(ConnectionManager::new(
//!     Arc::new(LocalBackend::new()),
//!     config,
//!     stores,
//! ));
//!
//! let handle = manager.initialize().await?;
//! assert!(Arc::ptr_eq(&handle, &manager.initialize().await?));
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use std::fmt;
use thiserror::Error as ThisError;

// Module declarations
pub mod backend;
pub mod config;
pub mod observability;
pub mod platform;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use backend::{AuthInitError, BackendSdk, LocalBackend, SdkError};
pub use config::{BackendConfig, GarageConfig};
pub use platform::{PlatformKind, current_platform};
pub use services::{
    BackendErrorInfo, ConnectionBuilder, ConnectionHandle, ConnectionManager, ConnectionStatus,
    handle_auth_error, handle_storage_error, translate,
};
pub use storage::{CredentialBackends, CredentialStore, CredentialStoreKind, StoreError};

/// Stage of connection construction at which a fatal failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitStage {
    /// Configuration validation, before any SDK call.
    Config,
    /// Application registration with the SDK.
    App,
    /// Document store handle construction.
    Documents,
    /// Blob store handle construction.
    Blobs,
    /// Authentication handle construction, after every fallback was exhausted.
    Auth,
}

impl InitStage {
    /// Returns the stage name used in logs and error messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::App => "app",
            Self::Documents => "documents",
            Self::Blobs => "blobs",
            Self::Auth => "auth",
        }
    }
}

impl fmt::Display for InitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for garage-connect operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Unparsable platform names, malformed config values |
/// | `BackendInit` | App, document store, blob store or auth construction fails |
/// | `OperationFailed` | Config file I/O, file key-value store I/O, logging setup |
///
/// The enum is `Clone` so a failed connection can hand the same error to every
/// later caller.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Fatal failure while constructing the backend connection.
    ///
    /// Raised when:
    /// - Required configuration fields are empty
    /// - The SDK refuses to register the app
    /// - The document or blob store handle cannot be created
    /// - Auth construction fails even without durable persistence
    #[error("backend initialization failed at {stage}: {cause}")]
    BackendInit {
        /// The construction stage that failed.
        stage: InitStage,
        /// Namespaced backend error code, when the SDK supplied one.
        code: Option<String>,
        /// The underlying cause.
        cause: String,
    },

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Creates a `BackendInit` error from an SDK failure.
    #[must_use]
    pub fn backend_init(stage: InitStage, err: &SdkError) -> Self {
        Self::BackendInit {
            stage,
            code: Some(err.code.clone()),
            cause: err.message.clone(),
        }
    }

    /// Renders the error as a user-facing display string.
    ///
    /// Backend failures go through the error translator so users never see a raw
    /// error code.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::BackendInit { code, cause, .. } => translate(&BackendErrorInfo {
                code: code.clone(),
                message: Some(cause.clone()),
            }),
            Self::InvalidInput(message) | Self::OperationFailed { cause: message, .. } => {
                translate(&BackendErrorInfo {
                    code: None,
                    message: Some(message.clone()),
                })
            },
        }
    }
}

/// Result type alias for garage-connect operations.
pub type Result<T> = std::result::Result<T, Error>;
