//! Service identity resolution.
//!
//! The identity is resolved lazily the first time `AutoRestartService` is
//! selected and cached for the lifetime of the notifier, unless the
//! configuration pins a unit or opts into re-resolution.

use std::sync::OnceLock;

use crate::adapter::PlatformAdapter;

/// Lazily resolved name of the service unit hosting this process.
#[derive(Debug, Default)]
pub struct ServiceIdentity {
    pinned: Option<String>,
    re_resolve: bool,
    cached: OnceLock<Option<String>>,
}

impl ServiceIdentity {
    /// Creates a resolver.
    ///
    /// `pinned` bypasses resolution entirely; `re_resolve` disables caching.
    #[must_use]
    pub fn new(pinned: Option<String>, re_resolve: bool) -> Self {
        Self {
            pinned,
            re_resolve,
            cached: OnceLock::new(),
        }
    }

    /// Returns the service unit, resolving it through `adapter` if needed.
    ///
    /// May shell out; never call with the notifier state lock held.
    #[must_use]
    pub fn get(&self, adapter: &dyn PlatformAdapter) -> Option<String> {
        if let Some(unit) = &self.pinned {
            return Some(unit.clone());
        }
        if self.re_resolve {
            return Self::resolve(adapter);
        }
        self.cached.get_or_init(|| Self::resolve(adapter)).clone()
    }

    fn resolve(adapter: &dyn PlatformAdapter) -> Option<String> {
        match adapter.resolve_service_identity() {
            Ok(Some(unit)) => {
                tracing::info!(unit = %unit, platform = %adapter.platform(), "resolved service identity");
                Some(unit)
            }
            Ok(None) => {
                tracing::debug!(platform = %adapter.platform(), "process is not running as a service");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, platform = %adapter.platform(), "service identity resolution failed");
                None
            }
        }
    }
}
