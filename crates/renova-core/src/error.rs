//! Error types for renova-core.
//!
//! Internal failures never escape as panics. Everything the engine cannot do
//! (locate the runtime, start a watch, spawn, restart a service, exit) is
//! reported through [`UpgradeError`], logged, and the feature degrades.

use std::path::PathBuf;

/// Result type alias for upgrade detection operations.
pub type Result<T> = std::result::Result<T, UpgradeError>;

/// Failure modes of the upgrade detection engine and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum UpgradeError {
    /// The runtime library loaded by this process could not be located.
    #[error("runtime library not found: {0}")]
    Locate(String),

    /// File watch could not be established.
    #[error("failed to watch {path}: {reason}")]
    Watch {
        /// Directory the watch was requested on.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// Replacement process could not be spawned.
    #[error("failed to spawn replacement process: {0}")]
    Spawn(String),

    /// Service identity could not be determined.
    #[error("service identity resolution failed: {0}")]
    ServiceIdentity(String),

    /// Service manager reported a failed restart.
    #[error("service restart of {unit} failed (exit code: {code:?})")]
    ServiceRestart {
        /// Service unit name.
        unit: String,
        /// Exit code of the restart command, `None` if killed by a signal.
        code: Option<i32>,
    },

    /// The exit strategy could not stop the current process.
    #[error("failed to stop current process: {0}")]
    Exit(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation not available on this platform.
    #[error("not supported on {0}")]
    NotSupported(&'static str),
}

impl UpgradeError {
    /// Creates a runtime location error.
    #[must_use]
    pub fn locate(msg: impl Into<String>) -> Self {
        Self::Locate(msg.into())
    }

    /// Creates a watch setup error.
    #[must_use]
    pub fn watch(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::Watch {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a spawn error.
    #[must_use]
    pub fn spawn(msg: impl Into<String>) -> Self {
        Self::Spawn(msg.into())
    }

    /// Creates a service identity error.
    #[must_use]
    pub fn service_identity(msg: impl Into<String>) -> Self {
        Self::ServiceIdentity(msg.into())
    }

    /// Creates an exit error.
    #[must_use]
    pub fn exit(msg: impl Into<String>) -> Self {
        Self::Exit(msg.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns true if the engine recovers from this error locally.
    ///
    /// Only configuration errors are surfaced to the host; everything else
    /// is logged and the affected feature is disabled.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}

/// Error raised by an upgrade observer.
///
/// The engine does not catch these: the remaining observers and upgrade
/// actions are skipped and the error is returned to whoever delivered the
/// file system notification.
#[derive(Debug, thiserror::Error)]
#[error("upgrade observer failed: {0}")]
pub struct ObserverError(Box<dyn std::error::Error + Send + Sync + 'static>);

impl ObserverError {
    /// Wraps an arbitrary error.
    #[must_use]
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Box::new(err))
    }

    /// Creates an observer error from a message.
    #[must_use]
    pub fn msg(msg: impl Into<String>) -> Self {
        let msg: String = msg.into();
        Self(msg.into())
    }

    /// Returns the wrapped error.
    #[must_use]
    pub fn into_inner(self) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = UpgradeError::locate("libcoreclr.so");
        assert_eq!(err.to_string(), "runtime library not found: libcoreclr.so");
    }

    #[test]
    fn test_watch_error_carries_path() {
        let err = UpgradeError::watch("/usr/share/dotnet", "permission denied");
        let text = err.to_string();
        assert!(text.contains("/usr/share/dotnet"));
        assert!(text.contains("permission denied"));
    }

    #[test]
    fn test_service_restart_error() {
        let err = UpgradeError::ServiceRestart {
            unit: "app.service".into(),
            code: Some(3),
        };
        assert!(err.to_string().contains("app.service"));
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn test_recoverable() {
        assert!(UpgradeError::spawn("denied").is_recoverable());
        assert!(UpgradeError::exit("denied").is_recoverable());
        assert!(!UpgradeError::config("bad toml").is_recoverable());
    }

    #[test]
    fn test_observer_error_message() {
        let err = ObserverError::msg("flush failed");
        assert_eq!(err.to_string(), "upgrade observer failed: flush failed");
    }

    #[test]
    fn test_observer_error_wraps_io() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = ObserverError::new(io);
        assert!(err.to_string().contains("disk full"));
        assert!(err.into_inner().to_string().contains("disk full"));
    }
}
