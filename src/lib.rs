//! Renova: in-process detection of in-place runtime upgrades.
//!
//! When an installer upgrades the runtime in place it deletes the shared
//! library the running process still has mapped. Renova watches that file
//! and, on deletion, runs observers and a restart strategy.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use renova::prelude::*;
//!
//! renova::init_tracing("info");
//! let notifier = renova::native_notifier(
//!     NotifierConfig::new().with_strategy(RestartStrategy::AutoRestartProcess),
//! );
//! notifier.on_before_upgrade(|notice| {
//!     tracing::warn!(path = %notice.runtime_path().display(), "runtime upgraded; restarting");
//!     Ok(())
//! });
//! ```

use std::sync::Arc;

pub use renova_core as core;
pub use renova_platform as platform;

/// Prelude module for common imports.
pub mod prelude {
    pub use renova_core::{
        ExitStrategy, NotifierConfig, ObserverError, ObserverId, ObserverResult,
        PostUpgradeAction, RestartStrategy, UpgradeError, UpgradeEvent, UpgradeNotice,
        UpgradeNotifier, UpgradeOutcome,
    };
    pub use renova_platform::{NativeAdapter, NotifyWatcher, install_hangup_guard};
}

use renova_core::{NotifierConfig, UpgradeNotifier};
use renova_platform::{NotifyWatcher, install_hangup_guard, native_adapter};

/// Builds a notifier wired to the native adapter and a `notify` watcher.
///
/// Also installs the hangup guard, so a process started by a previous
/// relaunch survives its parent's exit.
#[must_use]
pub fn native_notifier(config: NotifierConfig) -> UpgradeNotifier {
    install_hangup_guard();
    UpgradeNotifier::new(config, native_adapter(), Arc::new(NotifyWatcher::new()))
}

/// Installs a `tracing` subscriber honouring `RUST_LOG`, falling back to
/// `default_filter`.
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}
