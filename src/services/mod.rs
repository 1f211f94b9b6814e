//! Connection services.
//!
//! The builder constructs backend handles, the manager owns the one shared
//! connection, and the translator turns backend error codes into display strings.

mod builder;
mod connection;
mod translate;

pub use builder::ConnectionBuilder;
pub use connection::{ConnectionHandle, ConnectionManager, ConnectionStatus};
pub use translate::{
    AUTH_FALLBACK, BackendErrorInfo, GENERIC_FALLBACK, STORAGE_FALLBACK, handle_auth_error,
    handle_storage_error, translate,
};
