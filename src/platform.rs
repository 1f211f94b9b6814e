//! Runtime platform detection.
//!
//! The answer is computed once per process and never changes afterwards.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Environment variable that pins the detected platform (`web` or `native`).
pub const PLATFORM_ENV_VAR: &str = "GARAGE_PLATFORM";

/// The runtime environment the process executes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKind {
    /// Browser build with durable local storage.
    Web,
    /// Native mobile-like runtime with an external async key-value store.
    NativeMobile,
}

impl PlatformKind {
    /// Returns the platform name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::NativeMobile => "native",
        }
    }

    /// Returns the platform implied by the compilation target.
    #[must_use]
    pub const fn for_target() -> Self {
        if cfg!(target_arch = "wasm32") {
            Self::Web
        } else {
            Self::NativeMobile
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "web" | "browser" => Ok(Self::Web),
            "native" | "native_mobile" | "native-mobile" | "mobile" | "ios" | "android" => {
                Ok(Self::NativeMobile)
            },
            other => Err(Error::InvalidInput(format!("unknown platform: {other}"))),
        }
    }
}

/// Source of the platform answer handed to the connection builder.
pub trait PlatformDetector: Send + Sync {
    /// Returns the current platform. Must return the same value on every call.
    fn current(&self) -> PlatformKind;
}

/// Detector backed by the process-wide cached answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimePlatform;

impl PlatformDetector for RuntimePlatform {
    fn current(&self) -> PlatformKind {
        current_platform()
    }
}

/// Detector that always reports a fixed platform.
#[derive(Debug, Clone, Copy)]
pub struct FixedPlatform(pub PlatformKind);

impl PlatformDetector for FixedPlatform {
    fn current(&self) -> PlatformKind {
        self.0
    }
}

static CURRENT_PLATFORM: OnceLock<PlatformKind> = OnceLock::new();

/// Returns the platform this process runs on.
///
/// The first call consults [`PLATFORM_ENV_VAR`] and falls back to the compilation
/// target; the result is cached for the lifetime of the process.
#[must_use]
pub fn current_platform() -> PlatformKind {
    *CURRENT_PLATFORM.get_or_init(|| {
        let detected = resolve(std::env::var(PLATFORM_ENV_VAR).ok().as_deref());
        tracing::debug!(platform = %detected, "Detected runtime platform");
        detected
    })
}

/// Resolves an optional override against the compilation target.
fn resolve(override_value: Option<&str>) -> PlatformKind {
    match override_value.map(str::parse::<PlatformKind>) {
        Some(Ok(kind)) => kind,
        Some(Err(e)) => {
            tracing::warn!(
                variable = PLATFORM_ENV_VAR,
                error = %e,
                "Ignoring invalid platform override"
            );
            PlatformKind::for_target()
        },
        None => PlatformKind::for_target(),
    }
}
