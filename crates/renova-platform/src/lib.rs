//! # renova-platform
//!
//! Platform adapters for Renova.
//!
//! This crate implements the capabilities `renova-core` consumes:
//!
//! - **Module lookup**: `/proc/self/maps` (Linux), dyld (macOS),
//!   `Process.Modules` (Windows)
//! - **File watching**: [`NotifyWatcher`] over `notify`
//! - **Relaunch**: [`LaunchContext`] captured at startup, hangup-safe child
//! - **Service restart**: systemd, launchd, Windows SCM
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use renova_core::{NotifierConfig, UpgradeNotifier};
//! use renova_platform::{NotifyWatcher, install_hangup_guard, native_adapter};
//!
//! install_hangup_guard();
//! let notifier = UpgradeNotifier::new(
//!     NotifierConfig::new(),
//!     native_adapter(),
//!     Arc::new(NotifyWatcher::new()),
//! );
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cmd;
pub mod error;
pub mod hangup;
pub mod modules;
pub mod native;
pub mod relaunch;
pub mod service;
pub mod watcher;

pub use error::{PlatformError, Result};
pub use hangup::{IGNORE_HANGUP_ENV, install_hangup_guard};
pub use modules::loaded_modules;
pub use native::{NativeAdapter, native_adapter};
pub use relaunch::LaunchContext;
pub use service::{ServiceManager, resolve_identity};
pub use watcher::NotifyWatcher;
