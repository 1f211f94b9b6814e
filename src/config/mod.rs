//! Configuration management.
//!
//! Sources are applied in order, later ones winning:
//!
//! 1. Built-in defaults
//! 2. TOML config file (`--config`, else `<config_dir>/garage-connect/config.toml`)
//! 3. Environment variables (a `.env` file is loaded first when present)
//!
//! ```toml
//! platform = "native"
//! data_dir = "~/.local/share/garage-connect"
//!
//! [backend]
//! project_id = "garage-prod"
//! api_key = "${GARAGE_FIREBASE_API_KEY}"
//! app_id = "1:1234:android:abcd"
//!
//! [logging]
//! format = "json"
//! filter = "garage_connect=debug"
//! ```

mod backend;

pub use backend::{BackendConfig, DEFAULT_APP_NAME};

use crate::observability::{LogFormat, LoggingConfig};
use crate::platform::PlatformKind;
use crate::{Error, Result};
use regex::{Captures, Regex};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Prefix shared by all backend environment variables.
const BACKEND_ENV_PREFIX: &str = "GARAGE_FIREBASE_";

/// Matches `${VAR}` references in config file values.
static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]*)\}").unwrap_or_else(|_| unreachable!()));

/// Main configuration for garage-connect.
#[derive(Debug, Clone)]
pub struct GarageConfig {
    /// Backend project configuration, if one was supplied.
    pub backend: Option<BackendConfig>,
    /// Platform override; `None` means detect at runtime.
    pub platform: Option<PlatformKind>,
    /// Directory for file-backed credential storage.
    pub data_dir: PathBuf,
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Problems noticed while loading, kept until a log subscriber exists.
    load_warnings: Vec<String>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Platform override.
    pub platform: Option<String>,
    /// Data directory.
    pub data_dir: Option<String>,
    /// Backend section.
    pub backend: Option<ConfigFileBackend>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Backend section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileBackend {
    /// Project identifier.
    pub project_id: Option<String>,
    /// API key.
    pub api_key: Option<String>,
    /// Auth domain.
    pub auth_domain: Option<String>,
    /// Storage bucket.
    pub storage_bucket: Option<String>,
    /// Messaging sender identifier.
    pub messaging_sender_id: Option<String>,
    /// Application identifier.
    pub app_id: Option<String>,
    /// App registry name.
    pub app_name: Option<String>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Filter directives, e.g. `garage_connect=debug`.
    pub filter: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

impl Default for GarageConfig {
    fn default() -> Self {
        Self {
            backend: None,
            platform: None,
            data_dir: default_data_dir(),
            logging: LoggingConfig::default(),
            load_warnings: Vec::new(),
        }
    }
}

impl GarageConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if an
    /// environment override holds an invalid value.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        let mut config = Self::from_config_file(file, &env_lookup)?;
        config.apply_env(&env_lookup)?;
        Ok(config)
    }

    /// Loads configuration from the default location plus the environment.
    ///
    /// Returns defaults with environment overrides when no config file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but is invalid, or if an
    /// environment override holds an invalid value.
    pub fn load_default() -> Result<Self> {
        Self::with_dotenv(|| {
            if let Some(dirs) = directories::ProjectDirs::from("", "", "garage-connect") {
                let path = dirs.config_dir().join("config.toml");
                if path.exists() {
                    return Self::load_from_file(&path);
                }
            }

            let mut config = Self::default();
            config.apply_env(&env_lookup)?;
            Ok(config)
        })
    }

    /// Loads configuration from an explicit path when given, else the default location.
    ///
    /// # Errors
    ///
    /// See [`Self::load_from_file`] and [`Self::load_default`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::with_dotenv(|| Self::load_from_file(path)),
            None => Self::load_default(),
        }
    }

    /// Returns problems noticed while loading, such as unset `${VAR}` references.
    ///
    /// Loading runs before logging is installed, so callers log these afterwards.
    #[must_use]
    pub fn load_warnings(&self) -> &[String] {
        &self.load_warnings
    }

    fn with_dotenv(load: impl FnOnce() -> Result<Self>) -> Result<Self> {
        let dotenv_warning = load_dotenv();
        let mut config = load()?;
        config.load_warnings.extend(dotenv_warning);
        Ok(config)
    }

    /// Converts a `ConfigFile` to `GarageConfig`, expanding `${VAR}` references.
    fn from_config_file(file: ConfigFile, lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        let mut unresolved = Vec::new();
        let mut expand = |value: String| expand_tracked(&value, lookup, &mut unresolved);

        if let Some(platform) = file.platform {
            config.platform = Some(expand(platform).parse()?);
        }
        if let Some(data_dir) = file.data_dir {
            config.data_dir = expand_home(&expand(data_dir));
        }
        if let Some(backend) = file.backend {
            let project_id = backend.project_id.map(&mut expand).unwrap_or_default();
            let api_key = backend.api_key.map(&mut expand).unwrap_or_default();
            let app_id = backend.app_id.map(&mut expand).unwrap_or_default();
            let mut backend_config = BackendConfig::new(project_id, api_key, app_id);
            if let Some(v) = backend.auth_domain {
                backend_config.auth_domain = expand(v);
            }
            if let Some(v) = backend.storage_bucket {
                backend_config.storage_bucket = expand(v);
            }
            if let Some(v) = backend.messaging_sender_id {
                backend_config.messaging_sender_id = expand(v);
            }
            if let Some(v) = backend.app_name {
                backend_config.app_name = expand(v);
            }
            config.backend = Some(backend_config);
        }
        if let Some(logging) = file.logging {
            if let Some(format) = logging.format {
                config.logging.format = LogFormat::parse(&format);
            }
            if let Some(filter) = logging.filter {
                config.logging.filter = filter;
            }
            if let Some(file) = logging.file {
                config.logging.file = Some(expand_home(&expand(file)));
            }
        }

        config.load_warnings.extend(
            unresolved
                .into_iter()
                .map(|name| format!("config references unset environment variable ${{{name}}}")),
        );
        Ok(config)
    }

    /// Applies environment variable overrides.
    ///
    /// Backend variables are `GARAGE_FIREBASE_<FIELD>`; a backend section is
    /// created when the environment supplies a project id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `GARAGE_PLATFORM` is not a known platform.
    pub fn apply_env(&mut self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(platform) = lookup(crate::platform::PLATFORM_ENV_VAR) {
            self.platform = Some(platform.parse()?);
        }
        if let Some(data_dir) = lookup("GARAGE_DATA_DIR") {
            self.data_dir = expand_home(&data_dir);
        }

        let var = |field: &str| lookup(&format!("{BACKEND_ENV_PREFIX}{field}"));

        if self.backend.is_none() {
            if let Some(project_id) = var("PROJECT_ID") {
                self.backend = Some(BackendConfig::new(project_id, "", ""));
            }
        }
        let Some(backend) = self.backend.as_mut() else {
            return Ok(());
        };

        if let Some(v) = var("PROJECT_ID") {
            backend.set_project_id(v);
        }
        if let Some(v) = var("API_KEY") {
            *backend = backend.clone().with_api_key(v);
        }
        if let Some(v) = var("AUTH_DOMAIN") {
            backend.auth_domain = v;
        }
        if let Some(v) = var("STORAGE_BUCKET") {
            backend.storage_bucket = v;
        }
        if let Some(v) = var("MESSAGING_SENDER_ID") {
            backend.messaging_sender_id = v;
        }
        if let Some(v) = var("APP_ID") {
            backend.app_id = v;
        }
        if let Some(v) = var("APP_NAME") {
            backend.app_name = v;
        }
        Ok(())
    }

    /// Sets the backend configuration.
    #[must_use]
    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Pins the platform.
    #[must_use]
    pub const fn with_platform(mut self, platform: PlatformKind) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Returns the backend configuration or an error naming what is missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if no backend section was configured.
    pub fn require_backend(&self) -> Result<&BackendConfig> {
        self.backend.as_ref().ok_or_else(|| {
            Error::InvalidInput(format!(
                "no backend configured; set [backend] in the config file or {BACKEND_ENV_PREFIX}PROJECT_ID"
            ))
        })
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn load_dotenv() -> Option<String> {
    match dotenvy::dotenv() {
        Ok(_) => None,
        Err(e) if e.not_found() => None,
        Err(e) => Some(format!("failed to load .env file: {e}")),
    }
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "garage-connect").map_or_else(
        || PathBuf::from(".garage-connect"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

/// Expands a leading `~/` to the home directory.
fn expand_home(value: &str) -> PathBuf {
    if let Some(rest) = value.strip_prefix("~/") {
        if let Some(base) = directories::BaseDirs::new() {
            return base.home_dir().join(rest);
        }
    }
    PathBuf::from(value)
}

/// Expands `${VAR}` references using `lookup`.
///
/// Unknown variables are left in place.
pub fn expand_env_vars(value: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    expand_tracked(value, lookup, &mut Vec::new())
}

/// Expands `${VAR}` references, recording the names `lookup` could not resolve.
fn expand_tracked(
    value: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
    unresolved: &mut Vec<String>,
) -> String {
    ENV_VAR_PATTERN
        .replace_all(value, |caps: &Captures<'_>| {
            let name = &caps[1];
            lookup(name).unwrap_or_else(|| {
                unresolved.push(name.to_string());
                caps[0].to_string()
            })
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_expand_env_vars() {
        let lookup = lookup_from(&[("KEY", "secret"), ("PROJECT", "garage")]);
        assert_eq!(expand_env_vars("${KEY}", &lookup), "secret");
        assert_eq!(expand_env_vars("pre-${PROJECT}-post", &lookup), "pre-garage-post");
        assert_eq!(expand_env_vars("${MISSING}", &lookup), "${MISSING}");
        assert_eq!(expand_env_vars("open ${KEY", &lookup), "open ${KEY");
        assert_eq!(expand_env_vars("plain", &lookup), "plain");
        assert_eq!(expand_env_vars("${KEY}:${KEY}", &lookup), "secret:secret");
    }

    #[test]
    fn test_unset_references_become_load_warnings() {
        let file: ConfigFile = toml::from_str(
            r#"
            [backend]
            project_id = "garage-prod"
            api_key = "${MISSING_KEY}"
            app_id = "a"
            "#,
        )
        .expect("valid toml");
        let lookup = lookup_from(&[]);
        let config = GarageConfig::from_config_file(file, &lookup).expect("valid config");

        assert_eq!(config.load_warnings().len(), 1);
        assert!(config.load_warnings()[0].contains("${MISSING_KEY}"));
        let backend = config.backend.expect("backend");
        assert_eq!(backend.api_key().expose_secret(), "${MISSING_KEY}");
    }

    #[test]
    fn test_from_config_file() {
        let file: ConfigFile = toml::from_str(
            r#"
            platform = "web"
            data_dir = "/tmp/garage"

            [backend]
            project_id = "garage-prod"
            api_key = "${API_KEY}"
            app_id = "1:1:web:1"
            storage_bucket = "garage-prod.custom"

            [logging]
            format = "json"
            filter = "garage_connect=trace"
            "#,
        )
        .expect("valid toml");

        let lookup = lookup_from(&[("API_KEY", "from-env")]);
        let config = GarageConfig::from_config_file(file, &lookup).expect("valid config");

        assert_eq!(config.platform, Some(PlatformKind::Web));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/garage"));
        let backend = config.backend.expect("backend section");
        assert_eq!(backend.project_id, "garage-prod");
        assert_eq!(backend.api_key().expose_secret(), "from-env");
        assert_eq!(backend.storage_bucket, "garage-prod.custom");
        assert_eq!(backend.auth_domain, "garage-prod.firebaseapp.com");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.filter, "garage_connect=trace");
    }

    #[test]
    fn test_from_config_file_rejects_bad_platform() {
        let file = ConfigFile {
            platform: Some("desktop".to_string()),
            ..Default::default()
        };
        let lookup = lookup_from(&[]);
        assert!(GarageConfig::from_config_file(file, &lookup).is_err());
    }

    #[test]
    fn test_apply_env_creates_backend() {
        let lookup = lookup_from(&[
            ("GARAGE_FIREBASE_PROJECT_ID", "garage-env"),
            ("GARAGE_FIREBASE_API_KEY", "env-key"),
            ("GARAGE_FIREBASE_APP_ID", "1:2:ios:3"),
            ("GARAGE_PLATFORM", "native"),
        ]);
        let mut config = GarageConfig::default();
        config.apply_env(&lookup).expect("valid env");

        assert_eq!(config.platform, Some(PlatformKind::NativeMobile));
        let backend = config.require_backend().expect("backend from env");
        assert_eq!(backend.project_id, "garage-env");
        assert_eq!(backend.api_key().expose_secret(), "env-key");
        assert_eq!(backend.app_id, "1:2:ios:3");
        assert!(backend.validate().is_ok());
    }

    #[test]
    fn test_apply_env_overrides_file_values() {
        let lookup = lookup_from(&[("GARAGE_FIREBASE_APP_ID", "override")]);
        let mut config =
            GarageConfig::default().with_backend(BackendConfig::new("p", "k", "original"));
        config.apply_env(&lookup).expect("valid env");
        assert_eq!(config.backend.expect("backend").app_id, "override");
    }

    #[test]
    fn test_env_project_id_rederives_hosted_defaults() {
        let file: ConfigFile = toml::from_str(
            r#"
            [backend]
            api_key = "k"
            app_id = "a"
            "#,
        )
        .expect("valid toml");
        let lookup = lookup_from(&[("GARAGE_FIREBASE_PROJECT_ID", "garage-prod")]);
        let mut config = GarageConfig::from_config_file(file, &lookup).expect("valid config");
        config.apply_env(&lookup).expect("valid env");

        let backend = config.backend.expect("backend");
        assert_eq!(backend.project_id, "garage-prod");
        assert_eq!(backend.auth_domain, "garage-prod.firebaseapp.com");
        assert_eq!(backend.storage_bucket, "garage-prod.appspot.com");
    }

    #[test]
    fn test_env_project_id_keeps_explicit_bucket() {
        let lookup = lookup_from(&[("GARAGE_FIREBASE_PROJECT_ID", "garage-new")]);
        let mut config = GarageConfig::default().with_backend(
            BackendConfig::new("garage-old", "k", "a").with_storage_bucket("media.example.com"),
        );
        config.apply_env(&lookup).expect("valid env");

        let backend = config.backend.expect("backend");
        assert_eq!(backend.auth_domain, "garage-new.firebaseapp.com");
        assert_eq!(backend.storage_bucket, "media.example.com");
    }

    #[test]
    fn test_require_backend_missing() {
        let err = GarageConfig::default()
            .require_backend()
            .expect_err("no backend");
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_load_from_file_missing() {
        let err = GarageConfig::load_from_file(Path::new("/nonexistent/garage/config.toml"))
            .expect_err("missing file");
        assert!(matches!(err, Error::OperationFailed { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).expect("create config");
        writeln!(
            file,
            "[backend]\nproject_id = \"garage-file\"\napi_key = \"k\"\napp_id = \"a\""
        )
        .expect("write config");

        let config = GarageConfig::load_from_file(&path).expect("load config");
        assert!(config.backend.is_some());
    }
}
