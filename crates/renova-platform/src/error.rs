//! Platform error types.

/// Result type alias for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;

/// Platform-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// Platform not supported.
    #[error("platform not supported: {0}")]
    NotSupported(String),

    /// External command could not run or exited non-zero.
    #[error("`{program}` failed: {reason}")]
    Command {
        /// Program that was run.
        program: String,
        /// What went wrong.
        reason: String,
    },

    /// Launch context could not be captured or used.
    #[error("failed to spawn replacement process: {0}")]
    Spawn(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlatformError {
    /// Creates a not supported error.
    #[must_use]
    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    /// Creates a command error.
    #[must_use]
    pub fn command(program: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Command {
            program: program.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a spawn error.
    #[must_use]
    pub fn spawn(msg: impl Into<String>) -> Self {
        Self::Spawn(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_supported_error() {
        let err = PlatformError::not_supported("module enumeration on wasm");
        assert!(err.to_string().contains("not supported"));
        assert!(err.to_string().contains("wasm"));
    }

    #[test]
    fn test_command_error() {
        let err = PlatformError::command("systemctl", "exit status: 5");
        assert_eq!(err.to_string(), "`systemctl` failed: exit status: 5");
    }

    #[test]
    fn test_spawn_error() {
        let err = PlatformError::spawn("no executable");
        assert!(err.to_string().contains("spawn"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PlatformError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }
}
