//! Backend project configuration.

use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// App name the SDK registers when none is given.
pub const DEFAULT_APP_NAME: &str = "[DEFAULT]";

/// Immutable backend project configuration, supplied once at process start.
///
/// The API key is held as a [`SecretString`] and is redacted from `Debug` output.
#[derive(Clone)]
pub struct BackendConfig {
    /// Backend project identifier.
    pub project_id: String,
    api_key: SecretString,
    /// Domain used by hosted auth flows.
    pub auth_domain: String,
    /// Blob storage bucket identifier.
    pub storage_bucket: String,
    /// Push messaging sender identifier.
    pub messaging_sender_id: String,
    /// Application identifier.
    pub app_id: String,
    /// Name the app is registered under in the SDK's app registry.
    pub app_name: String,
}

impl BackendConfig {
    /// Creates a configuration with hosted defaults for the auth domain and bucket.
    #[must_use]
    pub fn new(
        project_id: impl Into<String>,
        api_key: impl Into<String>,
        app_id: impl Into<String>,
    ) -> Self {
        let project_id = project_id.into();
        Self {
            auth_domain: default_auth_domain(&project_id),
            storage_bucket: default_storage_bucket(&project_id),
            project_id,
            api_key: SecretString::from(api_key.into()),
            messaging_sender_id: String::new(),
            app_id: app_id.into(),
            app_name: DEFAULT_APP_NAME.to_string(),
        }
    }

    /// Replaces the project id.
    ///
    /// The auth domain and storage bucket follow the new project while they
    /// still hold the hosted defaults of the old one; explicitly set values
    /// are kept.
    pub fn set_project_id(&mut self, project_id: impl Into<String>) {
        let project_id = project_id.into();
        if self.auth_domain == default_auth_domain(&self.project_id) {
            self.auth_domain = default_auth_domain(&project_id);
        }
        if self.storage_bucket == default_storage_bucket(&self.project_id) {
            self.storage_bucket = default_storage_bucket(&project_id);
        }
        self.project_id = project_id;
    }

    /// Returns the API key.
    #[must_use]
    pub const fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    /// Replaces the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = SecretString::from(api_key.into());
        self
    }

    /// Sets the auth domain.
    #[must_use]
    pub fn with_auth_domain(mut self, domain: impl Into<String>) -> Self {
        self.auth_domain = domain.into();
        self
    }

    /// Sets the storage bucket.
    #[must_use]
    pub fn with_storage_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.storage_bucket = bucket.into();
        self
    }

    /// Sets the messaging sender identifier.
    #[must_use]
    pub fn with_messaging_sender_id(mut self, sender_id: impl Into<String>) -> Self {
        self.messaging_sender_id = sender_id.into();
        self
    }

    /// Sets the app registry name.
    #[must_use]
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Returns true if both configurations would register the same app.
    #[must_use]
    pub fn same_options(&self, other: &Self) -> bool {
        self.project_id == other.project_id
            && self.api_key.expose_secret() == other.api_key.expose_secret()
            && self.auth_domain == other.auth_domain
            && self.storage_bucket == other.storage_bucket
            && self.messaging_sender_id == other.messaging_sender_id
            && self.app_id == other.app_id
            && self.app_name == other.app_name
    }

    /// Validates that the fields the SDK cannot work without are present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the first empty required field.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("project_id", self.project_id.as_str()),
            ("api_key", self.api_key.expose_secret()),
            ("app_id", self.app_id.as_str()),
            ("app_name", self.app_name.as_str()),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::InvalidInput(format!(
                    "backend config field '{field}' is empty"
                )));
            }
        }
        Ok(())
    }
}

fn default_auth_domain(project_id: &str) -> String {
    format!("{project_id}.firebaseapp.com")
}

fn default_storage_bucket(project_id: &str) -> String {
    format!("{project_id}.appspot.com")
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("project_id", &self.project_id)
            .field("api_key", &"[REDACTED]")
            .field("auth_domain", &self.auth_domain)
            .field("storage_bucket", &self.storage_bucket)
            .field("messaging_sender_id", &self.messaging_sender_id)
            .field("app_id", &self.app_id)
            .field("app_name", &self.app_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BackendConfig {
        BackendConfig::new("garage-dev", "AIza-test", "1:42:web:abc")
    }

    #[test]
    fn test_new_fills_hosted_defaults() {
        let config = sample();
        assert_eq!(config.auth_domain, "garage-dev.firebaseapp.com");
        assert_eq!(config.storage_bucket, "garage-dev.appspot.com");
        assert_eq!(config.app_name, DEFAULT_APP_NAME);
        assert_eq!(config.api_key().expose_secret(), "AIza-test");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let rendered = format!("{:?}", sample());
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("AIza-test"));
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        assert!(sample().validate().is_ok());

        let err = sample()
            .with_api_key("  ")
            .validate()
            .expect_err("blank api key");
        assert!(err.to_string().contains("api_key"));

        let mut config = sample();
        config.project_id.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_set_project_id_rederives_defaults() {
        let mut config = BackendConfig::new("", "k", "a");
        config.set_project_id("garage-prod");
        assert_eq!(config.auth_domain, "garage-prod.firebaseapp.com");
        assert_eq!(config.storage_bucket, "garage-prod.appspot.com");

        let mut config = sample().with_storage_bucket("media.example.com");
        config.set_project_id("garage-prod");
        assert_eq!(config.project_id, "garage-prod");
        assert_eq!(config.auth_domain, "garage-prod.firebaseapp.com");
        assert_eq!(config.storage_bucket, "media.example.com");
    }

    #[test]
    fn test_same_options() {
        let a = sample();
        assert!(a.same_options(&sample()));
        assert!(!a.same_options(&sample().with_api_key("other")));
        assert!(!a.same_options(&sample().with_app_name("secondary")));
    }
}
