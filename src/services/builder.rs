//! Connection builder.
//!
//! Constructs the four backend handles for one configuration:
//!
//! ```text
//! ConnectionBuilder::build()
//!   ├── validate config                    (fatal)
//!   ├── existing_app() or initialize_app() (fatal)
//!   ├── document_store()                   (fatal)
//!   ├── blob_store()                       (fatal)
//!   └── auth                               (degrades)
//!         1. preferred durable store for the platform
//!         2. AlreadyInitialized → reuse existing_auth()
//!         3. otherwise → in-memory session, warn
//! ```
//!
//! # Graceful Degradation
//!
//! Only auth persistence may degrade. Losing the durable credential store
//! costs the user a sign-in after restart, not the connection, so it is
//! logged and reported on the event bus instead of returned as an error.

use crate::backend::{AuthInitError, BackendSdk};
use crate::config::BackendConfig;
use crate::observability::{ConnectionEvent, EventBus};
use crate::platform::{PlatformDetector, PlatformKind, current_platform};
use crate::services::ConnectionHandle;
use crate::storage::{CredentialBackends, CredentialStore, CredentialStoreKind};
use crate::{Error, InitStage, Result};
use std::sync::Arc;

/// Builds [`ConnectionHandle`]s from configuration.
pub struct ConnectionBuilder<S: BackendSdk> {
    sdk: Arc<S>,
    config: BackendConfig,
    platform: PlatformKind,
    stores: CredentialBackends,
    events: EventBus,
}

impl<S: BackendSdk> ConnectionBuilder<S> {
    /// Creates a builder for the platform this process runs on.
    #[must_use]
    pub fn new(sdk: Arc<S>, config: BackendConfig, stores: CredentialBackends) -> Self {
        Self {
            sdk,
            config,
            platform: current_platform(),
            stores,
            events: EventBus::default(),
        }
    }

    /// Pins the platform.
    #[must_use]
    pub const fn with_platform(mut self, platform: PlatformKind) -> Self {
        self.platform = platform;
        self
    }

    /// Takes the platform from a detector.
    #[must_use]
    pub fn with_detector(self, detector: &dyn PlatformDetector) -> Self {
        let platform = detector.current();
        self.with_platform(platform)
    }

    /// Publishes degradation events on `events`.
    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Returns the platform connections are built for.
    #[must_use]
    pub const fn platform(&self) -> PlatformKind {
        self.platform
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Returns the event bus.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Builds a connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackendInit`] if the configuration is invalid, or if
    /// the app, document store or blob store cannot be constructed, or if auth
    /// cannot be constructed even without durable persistence.
    pub async fn build(&self) -> Result<ConnectionHandle<S>> {
        self.config.validate().map_err(|e| Error::BackendInit {
            stage: InitStage::Config,
            code: None,
            cause: e.to_string(),
        })?;

        let app = if let Some(app) = self.sdk.existing_app(&self.config) {
            tracing::debug!(app = %self.config.app_name, "Reusing registered app");
            app
        } else {
            self.sdk
                .initialize_app(&self.config)
                .await
                .map_err(|e| Error::backend_init(InitStage::App, &e))?
        };

        let documents = self
            .sdk
            .document_store(&app)
            .await
            .map_err(|e| Error::backend_init(InitStage::Documents, &e))?;
        tracing::debug!(app = %self.config.app_name, "Created document store handle");

        let blobs = self
            .sdk
            .blob_store(&app)
            .await
            .map_err(|e| Error::backend_init(InitStage::Blobs, &e))?;
        tracing::debug!(
            app = %self.config.app_name,
            bucket = %self.config.storage_bucket,
            "Created blob store handle"
        );

        let (auth, persistence) = self.build_auth(&app).await?;

        Ok(ConnectionHandle {
            app,
            auth,
            documents,
            blobs,
            platform: self.platform,
            persistence,
        })
    }

    async fn build_auth(&self, app: &S::App) -> Result<(S::Auth, CredentialStoreKind)> {
        let preferred = CredentialStoreKind::preferred_for(self.platform);

        let reason = match self.stores.bind_preferred(self.platform).await {
            Ok(store) => match self.sdk.initialize_auth(app, store).await {
                Ok(auth) => {
                    tracing::debug!(
                        platform = %self.platform,
                        persistence = %preferred,
                        "Created auth handle"
                    );
                    return Ok((auth, preferred));
                },
                Err(AuthInitError::AlreadyInitialized { .. }) => {
                    if let Some(auth) = self.sdk.existing_auth(app) {
                        let persistence = self.sdk.auth_persistence(&auth);
                        tracing::debug!(
                            persistence = %persistence,
                            "Auth already initialized; reusing existing instance"
                        );
                        return Ok((auth, persistence));
                    }
                    "auth reported as initialized but no instance is registered".to_string()
                },
                Err(AuthInitError::StoreUnavailable(e)) => e.to_string(),
                Err(AuthInitError::Sdk(e)) => e.to_string(),
            },
            Err(e) => e.to_string(),
        };

        self.degrade(preferred, reason);

        match self
            .sdk
            .initialize_auth(app, CredentialStore::in_memory())
            .await
        {
            Ok(auth) => Ok((auth, CredentialStoreKind::InMemory)),
            Err(AuthInitError::AlreadyInitialized { .. }) => {
                let auth = self.sdk.existing_auth(app).ok_or_else(|| Error::BackendInit {
                    stage: InitStage::Auth,
                    code: None,
                    cause: "auth reported as initialized but no instance is registered"
                        .to_string(),
                })?;
                let persistence = self.sdk.auth_persistence(&auth);
                Ok((auth, persistence))
            },
            Err(AuthInitError::Sdk(e)) => Err(Error::backend_init(InitStage::Auth, &e)),
            Err(AuthInitError::StoreUnavailable(e)) => Err(Error::BackendInit {
                stage: InitStage::Auth,
                code: None,
                cause: e.to_string(),
            }),
        }
    }

    fn degrade(&self, preferred: CredentialStoreKind, reason: String) {
        tracing::warn!(
            platform = %self.platform,
            preferred = %preferred,
            reason = %reason,
            "Credential store unavailable; continuing with a non-durable auth session"
        );
        metrics::counter!(
            "credential_store_degraded_total",
            "platform" => self.platform.as_str()
        )
        .increment(1);
        self.events.publish(ConnectionEvent::PersistenceDegraded {
            platform: self.platform,
            preferred,
            reason,
        });
    }
}
