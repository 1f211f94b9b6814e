//! Credential storage.
//!
//! The auth session token lives in one of three places:
//! - **Browser**: the browser's durable local storage (web builds only)
//! - **`AsyncKeyValue`**: an external async key-value store (native builds only)
//! - **`InMemory`**: process memory, used when neither durable store can be bound
//!
//! The host hands the available backing stores to the connection builder as
//! [`CredentialBackends`]; the builder binds the one matching the platform.

mod credential;
mod file;
mod memory;
mod traits;

pub use credential::{
    AsyncKeyValuePersistence, BrowserPersistence, CredentialBackends, CredentialStore,
    CredentialStoreKind, InMemoryPersistence,
};
pub use file::FileKeyValueStore;
pub use memory::{InMemoryKeyValueStore, InMemoryLocalStorage};
pub use traits::{KeyValueStore, LocalStorage};

use thiserror::Error;

/// Errors raised by credential stores.
///
/// Store errors are recoverable: the connection builder answers them by
/// degrading to an in-memory session, never by failing the connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store cannot be reached or was never provided.
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
    /// The backing store returned data it cannot decode.
    #[error("credential store data is corrupt: {0}")]
    Corrupt(String),
}
