//! Capabilities the engine consumes.
//!
//! The engine holds no OS code. Module enumeration, service management,
//! process spawning and file watching are injected through these traits so
//! each platform supplies one implementation and tests supply fakes.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::platform::Platform;
use crate::types::{FsChange, WatchedRuntimePath};

/// Callback invoked by a [`FileWatcher`] for every change in the watched
/// directory.
pub type ChangeCallback = Arc<dyn Fn(FsChange) + Send + Sync>;

/// Per-platform operations used by the engine.
pub trait PlatformAdapter: Send + Sync {
    /// Returns the platform this adapter supports.
    fn platform(&self) -> Platform;

    /// Lists the native modules loaded into the current process.
    ///
    /// # Errors
    /// Returns an error if the module list cannot be read.
    fn loaded_modules(&self) -> Result<Vec<PathBuf>>;

    /// Names the service unit hosting the current process.
    ///
    /// Returns `Ok(None)` when the process is not running as a service.
    ///
    /// # Errors
    /// Returns an error if the service manager cannot be queried.
    fn resolve_service_identity(&self) -> Result<Option<String>>;

    /// Restarts `unit` through the service manager and waits for the
    /// command to finish.
    ///
    /// # Errors
    /// Returns an error if the command cannot run or exits non-zero.
    fn restart_service(&self, unit: &str) -> Result<()>;

    /// Spawns a duplicate of the current process and returns its PID.
    ///
    /// # Errors
    /// Returns an error if the process cannot be spawned.
    fn relaunch(&self) -> Result<u32>;

    /// Terminates the current process with `exit_code`.
    ///
    /// Real adapters never return from this call.
    fn terminate(&self, exit_code: i32);
}

/// Single-directory, non-recursive file system watch.
///
/// Implementations report every change in the directory and apply no
/// policy; filtering happens in the engine. `stop` must be idempotent and
/// safe to call before `start`.
///
/// The engine calls `stop` with its state lock held, and possibly from
/// inside `on_change` (an observer unsubscribing during an upgrade).
/// `stop` must therefore return without waiting for a callback in flight.
/// A change already in flight may still be delivered after `stop`.
pub trait FileWatcher: Send + Sync {
    /// Starts watching the directory of `target`.
    ///
    /// # Errors
    /// Returns an error if the OS watch cannot be established.
    fn start(&self, target: &WatchedRuntimePath, on_change: ChangeCallback) -> Result<()>;

    /// Stops watching without blocking on the callback thread. No-op when
    /// not started.
    fn stop(&self);

    /// Returns true while an OS watch is active.
    fn is_active(&self) -> bool;
}
