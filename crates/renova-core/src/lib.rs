// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # renova-core
//!
//! Detects, from inside a running process, that the shared library hosting
//! its managed runtime was deleted by an in-place upgrade, and reacts with a
//! configurable [`RestartStrategy`].
//!
//! This crate holds the platform-independent engine:
//!
//! - [`UpgradeNotifier`] owns the strategy, the observer registries and the
//!   file watch lifecycle
//! - [`SubscriptionCounter`] starts the watch on the first subscriber and
//!   stops it on the last
//! - [`RuntimeLocator`] finds the loaded runtime library once and caches it
//! - [`PlatformAdapter`] and [`FileWatcher`] are the OS capabilities the
//!   engine consumes; `renova-platform` implements them
//! - [`ExitStrategy`] is how the host lets the engine stop the process
//!
//! ## Example
//!
//! ```rust,ignore
//! use renova_core::{NotifierConfig, RestartStrategy, UpgradeNotifier};
//!
//! let config = NotifierConfig::new().with_strategy(RestartStrategy::AutoRestartProcess);
//! let notifier = UpgradeNotifier::new(config, adapter, watcher);
//! notifier.on_before_upgrade(|notice| {
//!     tracing::warn!(path = %notice.runtime_path().display(), "flushing before restart");
//!     Ok(())
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::significant_drop_tightening)]

pub mod adapter;
pub mod config;
pub mod counter;
pub mod error;
pub mod exit;
pub mod locator;
pub mod notifier;
pub mod observers;
pub mod platform;
pub mod service;
#[cfg(test)]
pub mod tests;
pub mod types;

pub use adapter::{ChangeCallback, FileWatcher, PlatformAdapter};
pub use config::NotifierConfig;
pub use counter::{SubscriptionCounter, Transition};
pub use error::{ObserverError, Result, UpgradeError};
pub use exit::{ChannelExit, ExitStrategy, FnExit, ProcessExit};
pub use locator::RuntimeLocator;
pub use notifier::{
    PostUpgradeAction, SERVICE_RESTART_FAILURE_EXIT_CODE, UpgradeNotifier, UpgradeOutcome,
};
pub use observers::{ObserverId, ObserverResult};
pub use platform::{Platform, detect_platform};
pub use service::ServiceIdentity;
pub use types::{
    ChangeKind, FsChange, RestartStrategy, UpgradeEvent, UpgradeId, UpgradeNotice,
    WatchedRuntimePath,
};
