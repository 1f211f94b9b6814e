//! Structured logging configuration.

use std::path::PathBuf;

/// Environment variable holding filter directives; checked before `RUST_LOG`.
pub const LOG_ENV_VAR: &str = "GARAGE_LOG";

const DEFAULT_FILTER: &str = "info";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format string, defaulting to `Pretty`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Filter directives used when neither `GARAGE_LOG` nor `RUST_LOG` is set.
    pub filter: String,
    /// Optional log file; stderr when absent.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: DEFAULT_FILTER.to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Raises the filter to `debug` for this crate when verbose output is requested.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        if verbose {
            self.filter = format!("{},garage_connect=debug", self.filter);
        }
        self
    }

    /// Returns the effective filter directives, honoring environment overrides.
    #[must_use]
    pub fn directives(&self) -> String {
        std::env::var(LOG_ENV_VAR)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| self.filter.clone())
    }
}
