//! Notifier configuration.
//!
//! Configuration is validated at load time, with defaults that leave the
//! engine passive (`Manual`, no overrides) until the host opts in.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UpgradeError};
use crate::platform::Platform;
use crate::types::RestartStrategy;

/// Configuration for an [`UpgradeNotifier`](crate::UpgradeNotifier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Strategy applied when the notifier is constructed.
    #[serde(default)]
    pub strategy: RestartStrategy,

    /// File name of the runtime library to watch.
    ///
    /// Defaults to the platform's runtime library name.
    #[serde(default)]
    pub runtime_library: Option<String>,

    /// Service unit to restart; skips service identity resolution.
    #[serde(default)]
    pub service_unit: Option<String>,

    /// Lets `RuntimeUpgraded` observers set the exit code or cancel the
    /// self-exit through the [`UpgradeEvent`](crate::UpgradeEvent).
    #[serde(default)]
    pub allow_observer_override: bool,

    /// Resolve the service identity every time it is needed instead of
    /// once per notifier.
    #[serde(default)]
    pub re_resolve_service_identity: bool,

    /// Initial exit code of the default process exit strategy.
    #[serde(default)]
    pub exit_code: i32,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifierConfig {
    /// Creates a configuration with all defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            strategy: RestartStrategy::Manual,
            runtime_library: None,
            service_unit: None,
            allow_observer_override: false,
            re_resolve_service_identity: false,
            exit_code: 0,
        }
    }

    /// Sets the initial strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: RestartStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Overrides the runtime library file name.
    #[must_use]
    pub fn with_runtime_library(mut self, name: impl Into<String>) -> Self {
        self.runtime_library = Some(name.into());
        self
    }

    /// Pins the service unit used by `AutoRestartService`.
    #[must_use]
    pub fn with_service_unit(mut self, unit: impl Into<String>) -> Self {
        self.service_unit = Some(unit.into());
        self
    }

    /// Enables observer overrides of the self-exit.
    #[must_use]
    pub const fn with_observer_override(mut self, allow: bool) -> Self {
        self.allow_observer_override = allow;
        self
    }

    /// Enables re-resolution of the service identity.
    #[must_use]
    pub const fn with_service_re_resolution(mut self, enabled: bool) -> Self {
        self.re_resolve_service_identity = enabled;
        self
    }

    /// Sets the initial exit code of the default exit strategy.
    #[must_use]
    pub const fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Runtime library file name to look for on `platform`.
    #[must_use]
    pub fn runtime_library_for(&self, platform: Platform) -> &str {
        self.runtime_library
            .as_deref()
            .unwrap_or_else(|| platform.runtime_library())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error if a field is malformed.
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.runtime_library {
            if name.is_empty() {
                return Err(UpgradeError::config("runtime_library cannot be empty"));
            }
            if name.contains('/') || name.contains('\\') {
                return Err(UpgradeError::config(
                    "runtime_library must be a file name, not a path",
                ));
            }
        }
        if let Some(unit) = &self.service_unit {
            if unit.trim().is_empty() {
                return Err(UpgradeError::config("service_unit cannot be blank"));
            }
        }
        Ok(())
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| UpgradeError::config(format!("failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    /// Returns an error if the text is not valid configuration.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| UpgradeError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}
