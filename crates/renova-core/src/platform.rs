//! Platform identification.
//!
//! The engine only needs to know which family of OS it runs on: it decides
//! the default runtime library name and whether the POSIX-only hangup
//! handling applies.

use serde::{Deserialize, Serialize};

/// Platform families with distinct module lookup and service management.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    /// Linux (systemd when present).
    Linux,
    /// macOS (launchd).
    MacOS,
    /// Windows (service control manager).
    Windows,
    /// Any other POSIX system.
    Unix,
}

impl Platform {
    /// Returns the platform name as a static string.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::MacOS => "macos",
            Self::Windows => "windows",
            Self::Unix => "unix",
        }
    }

    /// File name of the shared library hosting the managed runtime.
    #[must_use]
    pub const fn runtime_library(&self) -> &'static str {
        match self {
            Self::Windows => "coreclr.dll",
            Self::MacOS => "libcoreclr.dylib",
            Self::Linux | Self::Unix => "libcoreclr.so",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Returns the platform this binary was compiled for.
#[must_use]
pub const fn detect_platform() -> Platform {
    if cfg!(windows) {
        Platform::Windows
    } else if cfg!(target_os = "linux") {
        Platform::Linux
    } else if cfg!(target_os = "macos") {
        Platform::MacOS
    } else {
        Platform::Unix
    }
}
