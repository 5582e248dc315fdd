//! Runtime library location.
//!
//! Finds the runtime library among the modules loaded into this process.
//! The first lookup decides for the lifetime of the locator: a success is
//! cached, and so is a failure. A runtime that cannot be found is never
//! searched for again.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::adapter::PlatformAdapter;
use crate::error::{Result, UpgradeError};
use crate::types::WatchedRuntimePath;

/// Resolves and caches the path of the loaded runtime library.
#[derive(Debug)]
pub struct RuntimeLocator {
    library_name: String,
    resolved: OnceLock<std::result::Result<WatchedRuntimePath, String>>,
}

impl RuntimeLocator {
    /// Creates a locator for `library_name`.
    #[must_use]
    pub fn new(library_name: impl Into<String>) -> Self {
        Self {
            library_name: library_name.into(),
            resolved: OnceLock::new(),
        }
    }

    /// Library file name this locator searches for.
    #[must_use]
    pub fn library_name(&self) -> &str {
        &self.library_name
    }

    /// Returns the cached path, if a lookup already succeeded.
    #[must_use]
    pub fn cached(&self) -> Option<&WatchedRuntimePath> {
        self.resolved.get().and_then(|outcome| outcome.as_ref().ok())
    }

    /// Returns the runtime library location, enumerating modules through
    /// `adapter` on first use.
    ///
    /// # Errors
    /// Returns an error if the first lookup failed: enumeration failed or
    /// no module matched. Later calls repeat that error without asking
    /// `adapter` again.
    pub fn resolve(&self, adapter: &dyn PlatformAdapter) -> Result<WatchedRuntimePath> {
        self.resolved
            .get_or_init(|| {
                self.lookup(adapter).map_err(|e| match e {
                    UpgradeError::Locate(reason) => reason,
                    other => other.to_string(),
                })
            })
            .clone()
            .map_err(UpgradeError::locate)
    }

    fn lookup(&self, adapter: &dyn PlatformAdapter) -> Result<WatchedRuntimePath> {
        let modules = adapter.loaded_modules()?;
        let library = find_module(&modules, &self.library_name).ok_or_else(|| {
            UpgradeError::locate(format!(
                "{} is not among {} loaded modules",
                self.library_name,
                modules.len()
            ))
        })?;
        let watched = WatchedRuntimePath::from_library(library).ok_or_else(|| {
            UpgradeError::locate(format!("{} has no parent directory", library.display()))
        })?;

        tracing::debug!(path = %watched, "located runtime library");
        Ok(watched)
    }
}

/// Finds the first module whose file name equals `library_name`, ignoring
/// ASCII case.
#[must_use]
pub fn find_module<'a>(modules: &'a [PathBuf], library_name: &str) -> Option<&'a Path> {
    modules
        .iter()
        .find(|module| {
            module
                .file_name()
                .is_some_and(|name| name.to_string_lossy().eq_ignore_ascii_case(library_name))
        })
        .map(PathBuf::as_path)
}
