//! Connection manager.
//!
//! Owns the single [`ConnectionHandle`] of a process. The composition root
//! constructs one manager and shares it via `Arc`; nothing else builds
//! connections.
//!
//! # State machine
//!
//! ```text
//! Uninitialized ──initialize()──▶ Initializing ──ok──▶ Ready
//!                                              └─err─▶ Failed
//! ```
//!
//! Ready and Failed are terminal. Concurrent `initialize()` calls are
//! serialized by an async mutex, so exactly one build runs and every caller
//! receives its result.

use crate::backend::BackendSdk;
use crate::config::BackendConfig;
use crate::observability::ConnectionEvent;
use crate::platform::PlatformKind;
use crate::services::ConnectionBuilder;
use crate::storage::{CredentialBackends, CredentialStoreKind};
use crate::{Error, Result};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Mutex, broadcast};

/// The backend handles shared by the whole application.
pub struct ConnectionHandle<S: BackendSdk> {
    pub(crate) app: S::App,
    pub(crate) auth: S::Auth,
    pub(crate) documents: S::Documents,
    pub(crate) blobs: S::Blobs,
    pub(crate) platform: PlatformKind,
    pub(crate) persistence: CredentialStoreKind,
}

impl<S: BackendSdk> ConnectionHandle<S> {
    /// Returns the app handle.
    #[must_use]
    pub const fn app(&self) -> &S::App {
        &self.app
    }

    /// Returns the auth handle.
    #[must_use]
    pub const fn auth(&self) -> &S::Auth {
        &self.auth
    }

    /// Returns the document store handle.
    #[must_use]
    pub const fn documents(&self) -> &S::Documents {
        &self.documents
    }

    /// Returns the blob store handle.
    #[must_use]
    pub const fn blobs(&self) -> &S::Blobs {
        &self.blobs
    }

    /// Returns the platform the connection was built for.
    #[must_use]
    pub const fn platform(&self) -> PlatformKind {
        self.platform
    }

    /// Returns where the auth session is persisted.
    #[must_use]
    pub const fn persistence(&self) -> CredentialStoreKind {
        self.persistence
    }

    /// Returns true if the auth session will not survive a restart.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        !self.persistence.is_durable()
    }
}

impl<S: BackendSdk> Clone for ConnectionHandle<S> {
    fn clone(&self) -> Self {
        Self {
            app: self.app.clone(),
            auth: self.auth.clone(),
            documents: self.documents.clone(),
            blobs: self.blobs.clone(),
            platform: self.platform,
            persistence: self.persistence,
        }
    }
}

impl<S: BackendSdk> fmt::Debug for ConnectionHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("platform", &self.platform)
            .field("persistence", &self.persistence)
            .finish_non_exhaustive()
    }
}

/// Observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    /// No build has started.
    Uninitialized,
    /// A build is in progress.
    Initializing,
    /// The connection is built; handles are available.
    Ready,
    /// The build failed; the process must restart to retry.
    Failed,
}

impl ConnectionStatus {
    /// Returns the status name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum State<S: BackendSdk> {
    Uninitialized,
    Initializing,
    Ready(Arc<ConnectionHandle<S>>),
    Failed(Error),
}

impl<S: BackendSdk> State<S> {
    const fn status(&self) -> ConnectionStatus {
        match self {
            Self::Uninitialized => ConnectionStatus::Uninitialized,
            Self::Initializing => ConnectionStatus::Initializing,
            Self::Ready(_) => ConnectionStatus::Ready,
            Self::Failed(_) => ConnectionStatus::Failed,
        }
    }
}

/// Process-wide owner of the backend connection.
pub struct ConnectionManager<S: BackendSdk> {
    builder: ConnectionBuilder<S>,
    state: RwLock<State<S>>,
    init_lock: Mutex<()>,
}

impl<S: BackendSdk> ConnectionManager<S> {
    /// Creates a manager for the platform this process runs on.
    #[must_use]
    pub fn new(sdk: Arc<S>, config: BackendConfig, stores: CredentialBackends) -> Self {
        Self::from_builder(ConnectionBuilder::new(sdk, config, stores))
    }

    /// Creates a manager around a configured builder.
    #[must_use]
    pub fn from_builder(builder: ConnectionBuilder<S>) -> Self {
        Self {
            builder,
            state: RwLock::new(State::Uninitialized),
            init_lock: Mutex::new(()),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.read_state().status()
    }

    /// Returns the platform connections are built for.
    #[must_use]
    pub const fn platform(&self) -> PlatformKind {
        self.builder.platform()
    }

    /// Subscribes to state changes and degradation events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.builder.events().subscribe()
    }

    /// Returns the error a failed build ended with.
    #[must_use]
    pub fn failure(&self) -> Option<Error> {
        match &*self.read_state() {
            State::Failed(e) => Some(e.clone()),
            _ => None,
        }
    }

    /// Returns the handle if the connection is ready.
    ///
    /// Never blocks and never starts a build.
    #[must_use]
    pub fn handle(&self) -> Option<Arc<ConnectionHandle<S>>> {
        match &*self.read_state() {
            State::Ready(handle) => Some(Arc::clone(handle)),
            _ => None,
        }
    }

    /// Builds the connection, or returns the one already built.
    ///
    /// At most one build runs per manager. Callers arriving while a build is
    /// in flight wait for it and share its result. Once the build has failed,
    /// every call returns the same error.
    ///
    /// Dropping the returned future mid-build leaves the manager
    /// `Initializing` with nothing in flight; the next call builds again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackendInit`] if the build fails.
    pub async fn initialize(&self) -> Result<Arc<ConnectionHandle<S>>> {
        if let Some(settled) = self.settled() {
            return settled;
        }

        let _guard = self.init_lock.lock().await;
        if let Some(settled) = self.settled() {
            return settled;
        }

        self.set_state(State::Initializing);
        tracing::debug!(
            platform = %self.builder.platform(),
            app = %self.builder.config().app_name,
            "Initializing backend connection"
        );

        match self.builder.build().await {
            Ok(handle) => {
                let handle = Arc::new(handle);
                metrics::counter!("connection_init_total", "status" => "ready").increment(1);
                tracing::info!(
                    platform = %handle.platform(),
                    persistence = %handle.persistence(),
                    "Backend connection ready"
                );
                self.set_state(State::Ready(Arc::clone(&handle)));
                Ok(handle)
            },
            Err(e) => {
                metrics::counter!("connection_init_total", "status" => "failed").increment(1);
                tracing::error!(error = %e, "Backend connection failed");
                self.set_state(State::Failed(e.clone()));
                Err(e)
            },
        }
    }

    /// Returns the auth handle, starting a background build if none exists yet.
    #[must_use]
    pub fn auth(self: &Arc<Self>) -> Option<S::Auth> {
        self.ready_or_start().map(|h| h.auth.clone())
    }

    /// Returns the document store handle, starting a background build if none exists yet.
    #[must_use]
    pub fn documents(self: &Arc<Self>) -> Option<S::Documents> {
        self.ready_or_start().map(|h| h.documents.clone())
    }

    /// Returns the blob store handle, starting a background build if none exists yet.
    #[must_use]
    pub fn blobs(self: &Arc<Self>) -> Option<S::Blobs> {
        self.ready_or_start().map(|h| h.blobs.clone())
    }

    /// Returns the ready handle, or spawns `initialize()` on the current Tokio
    /// runtime and returns `None`.
    ///
    /// A build is spawned whenever the state is not settled and no build holds
    /// the init lock, which includes an `Initializing` state left behind by a
    /// dropped `initialize()` future.
    fn ready_or_start(self: &Arc<Self>) -> Option<Arc<ConnectionHandle<S>>> {
        if let Some(handle) = self.handle() {
            return Some(handle);
        }
        if self.status() == ConnectionStatus::Failed {
            return None;
        }
        if self.init_lock.try_lock().is_err() {
            // A build is in flight and will publish its result.
            return None;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let manager = Arc::clone(self);
                runtime.spawn(async move {
                    if let Err(e) = manager.initialize().await {
                        tracing::debug!(error = %e, "Background connection build failed");
                    }
                });
            },
            Err(_) => {
                tracing::debug!("No async runtime; backend connection not started");
            },
        }
        None
    }

    fn settled(&self) -> Option<Result<Arc<ConnectionHandle<S>>>> {
        match &*self.read_state() {
            State::Ready(handle) => Some(Ok(Arc::clone(handle))),
            State::Failed(e) => Some(Err(e.clone())),
            State::Uninitialized | State::Initializing => None,
        }
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, State<S>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: State<S>) {
        let status = next.status();
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            *state = next;
        }
        self.builder
            .events()
            .publish(ConnectionEvent::StateChanged { status });
    }
}

impl<S: BackendSdk> fmt::Debug for ConnectionManager<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("platform", &self.platform())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
