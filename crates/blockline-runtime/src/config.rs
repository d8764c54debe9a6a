#![forbid(unsafe_code)]

//! Overlay configuration.
//!
//! [`OverlayConfig`] gathers every tunable of the overlay: the debounce
//! window, the selection cooldown, and the render toggles. Defaults match the
//! built-in constants, so `OverlayConfig::default()` behaves exactly like an
//! unconfigured overlay.
//!
//! # Sources
//!
//! Later sources override earlier ones:
//!
//! 1. Defaults.
//! 2. A TOML or JSON file (with the `config` feature).
//! 3. Environment: `BLOCKLINE_DEBOUNCE_MS`, `BLOCKLINE_COOLDOWN_MS`.
//!
//! ```toml
//! # blockline.toml
//! debounce_ms = 150
//! cooldown_ms = 400
//! end_labels = false
//! ```
//!
//! ```rust,ignore
//! let config = OverlayConfig::from_toml_file("blockline.toml")?.with_env_overrides();
//! ```

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::selection::DEFAULT_COOLDOWN_MS;
use blockline_core::debounce::DEFAULT_DEBOUNCE_MS;
use web_time::Duration;

/// Environment variable overriding [`OverlayConfig::debounce_ms`].
pub const ENV_DEBOUNCE_MS: &str = "BLOCKLINE_DEBOUNCE_MS";
/// Environment variable overriding [`OverlayConfig::cooldown_ms`].
pub const ENV_COOLDOWN_MS: &str = "BLOCKLINE_COOLDOWN_MS";

/// Longest accepted debounce window.
pub const MAX_DEBOUNCE_MS: u64 = 5_000;
/// Longest accepted selection cooldown.
pub const MAX_COOLDOWN_MS: u64 = 10_000;

/// Tunables for one overlay instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct OverlayConfig {
    /// Debounce window for host change events, in milliseconds.
    pub debounce_ms: u64,
    /// How long block creation shields the selection from move events.
    pub cooldown_ms: u64,
    /// Emit `end ...` markers in the workspace list.
    pub end_labels: bool,
    /// Build the breadcrumb trail.
    pub breadcrumbs: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            end_labels: true,
            breadcrumbs: true,
        }
    }
}

impl OverlayConfig {
    #[must_use]
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Apply overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_env_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using a custom environment lookup (for tests).
    ///
    /// Values that do not parse as milliseconds are ignored with a warning.
    #[must_use]
    pub fn with_env_overrides_from<F>(mut self, get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ms) = env_millis(&get_env, ENV_DEBOUNCE_MS) {
            self.debounce_ms = ms;
        }
        if let Some(ms) = env_millis(&get_env, ENV_COOLDOWN_MS) {
            self.cooldown_ms = ms;
        }
        self
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.debounce_ms == 0 {
            errors.push("debounce_ms must be at least 1".to_string());
        }
        if self.debounce_ms > MAX_DEBOUNCE_MS {
            errors.push(format!(
                "debounce_ms must be at most {MAX_DEBOUNCE_MS}, got {}",
                self.debounce_ms
            ));
        }
        if self.cooldown_ms > MAX_COOLDOWN_MS {
            errors.push(format!(
                "cooldown_ms must be at most {MAX_COOLDOWN_MS}, got {}",
                self.cooldown_ms
            ));
        }
        errors
    }

    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, OverlayConfigError> {
        let config: Self = toml::from_str(s).map_err(OverlayConfigError::Toml)?;
        config.validated()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, OverlayConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(OverlayConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, OverlayConfigError> {
        let config: Self = serde_json::from_str(s).map_err(OverlayConfigError::Json)?;
        config.validated()
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, OverlayConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(OverlayConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Serialize to TOML.
    #[cfg(feature = "config")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    #[cfg(feature = "config")]
    fn validated(self) -> Result<Self, OverlayConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(OverlayConfigError::Validation(errors))
        }
    }
}

fn env_millis<F>(get_env: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = get_env(key)?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(ms),
        Err(_) => {
            tracing::warn!(key, value = %raw, "config.env_override_ignored");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors from loading an [`OverlayConfig`].
#[derive(Debug)]
pub enum OverlayConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for OverlayConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for OverlayConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
