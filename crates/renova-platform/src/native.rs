//! Native platform adapter.
//!
//! One adapter serves every supported OS; the per-OS differences live in
//! [`modules`](crate::modules), [`service`](crate::service) and
//! [`relaunch`](crate::relaunch).

use std::path::PathBuf;
use std::sync::Arc;

use renova_core::{Platform, PlatformAdapter, UpgradeError, detect_platform};

use crate::modules;
use crate::relaunch::LaunchContext;
use crate::service::{self, ServiceManager};

/// Adapter for the OS this binary was compiled for.
#[derive(Debug)]
pub struct NativeAdapter {
    platform: Platform,
    launch: Option<LaunchContext>,
    service_manager: Option<ServiceManager>,
}

impl NativeAdapter {
    /// Creates the adapter and captures the launch context now, before an
    /// installer can replace the executable.
    #[must_use]
    pub fn new() -> Self {
        let launch = match LaunchContext::capture() {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                tracing::warn!(error = %e, "cannot capture launch context; relaunch disabled");
                None
            }
        };
        Self::with_launch_context(launch)
    }

    /// Creates the adapter with an explicit launch context.
    #[must_use]
    pub fn with_launch_context(launch: Option<LaunchContext>) -> Self {
        let platform = detect_platform();
        Self {
            platform,
            launch,
            service_manager: ServiceManager::for_platform(platform),
        }
    }

    /// Captured launch context, if any.
    #[must_use]
    pub fn launch_context(&self) -> Option<&LaunchContext> {
        self.launch.as_ref()
    }
}

impl Default for NativeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformAdapter for NativeAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn loaded_modules(&self) -> renova_core::Result<Vec<PathBuf>> {
        modules::loaded_modules().map_err(|e| UpgradeError::locate(e.to_string()))
    }

    fn resolve_service_identity(&self) -> renova_core::Result<Option<String>> {
        service::resolve_identity(self.platform)
            .map_err(|e| UpgradeError::service_identity(e.to_string()))
    }

    fn restart_service(&self, unit: &str) -> renova_core::Result<()> {
        let manager = self
            .service_manager
            .ok_or(UpgradeError::NotSupported("service restart"))?;
        manager.restart(unit)
    }

    fn relaunch(&self) -> renova_core::Result<u32> {
        let launch = self
            .launch
            .as_ref()
            .ok_or_else(|| UpgradeError::spawn("launch context unavailable"))?;
        launch.spawn().map_err(|e| UpgradeError::spawn(e.to_string()))
    }

    fn terminate(&self, exit_code: i32) {
        tracing::warn!(exit_code, "terminating process");
        std::process::exit(exit_code)
    }
}

/// Shared native adapter for the current OS.
#[must_use]
pub fn native_adapter() -> Arc<dyn PlatformAdapter> {
    Arc::new(NativeAdapter::new())
}
