//! Core types for upgrade detection.
//!
//! Strategies are a closed set: exactly one is active at a time and each
//! one maps to a fixed post-detection action sequence.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Automatic response to a detected runtime upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartStrategy {
    /// Notify observers only.
    #[default]
    Manual,
    /// Spawn a replacement process and keep running.
    AutoStartNewProcess,
    /// Spawn a replacement process, then stop this one.
    AutoRestartProcess,
    /// Stop this process without spawning a replacement.
    AutoStopProcess,
    /// Ask the service manager to restart the owning unit.
    ///
    /// Downgrades to [`RestartStrategy::AutoRestartProcess`] when the
    /// process is not running under a service manager.
    AutoRestartService,
}

impl RestartStrategy {
    /// All strategies, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Manual,
        Self::AutoStartNewProcess,
        Self::AutoRestartProcess,
        Self::AutoStopProcess,
        Self::AutoRestartService,
    ];

    /// Returns the strategy name as a static string.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::AutoStartNewProcess => "auto_start_new_process",
            Self::AutoRestartProcess => "auto_restart_process",
            Self::AutoStopProcess => "auto_stop_process",
            Self::AutoRestartService => "auto_restart_service",
        }
    }

    /// Human-readable description of what happens on upgrade.
    #[must_use]
    pub const fn action_description(&self) -> &'static str {
        match self {
            Self::Manual => "no automatic action; observers decide what to do",
            Self::AutoStartNewProcess => {
                "starting a new process; the current process keeps running"
            }
            Self::AutoRestartProcess => {
                "starting a new process, then stopping the current process"
            }
            Self::AutoStopProcess => "stopping the current process",
            Self::AutoRestartService => "restarting the owning service through the service manager",
        }
    }

    /// Returns true for `Manual`, which holds no subscription of its own.
    #[must_use]
    pub const fn is_manual(&self) -> bool {
        matches!(self, Self::Manual)
    }

    /// Returns true if a replacement process is spawned before notification.
    #[must_use]
    pub const fn spawns_process(&self) -> bool {
        matches!(self, Self::AutoStartNewProcess | Self::AutoRestartProcess)
    }

    /// Returns true if the current process is stopped after notification.
    #[must_use]
    pub const fn exits_process(&self) -> bool {
        matches!(self, Self::AutoRestartProcess | Self::AutoStopProcess)
    }
}

impl std::fmt::Display for RestartStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Unique identifier for one detected upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpgradeId(uuid::Uuid);

impl UpgradeId {
    /// Creates a new random upgrade ID.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for UpgradeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UpgradeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location of the runtime library loaded by this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedRuntimePath {
    directory: PathBuf,
    file_name: OsString,
}

impl WatchedRuntimePath {
    /// Splits a library path into directory and file name.
    ///
    /// Returns `None` for paths without a parent or file name component.
    #[must_use]
    pub fn from_library(path: &Path) -> Option<Self> {
        let directory = path.parent()?;
        let file_name = path.file_name()?;
        if directory.as_os_str().is_empty() {
            return None;
        }
        Some(Self {
            directory: directory.to_path_buf(),
            file_name: file_name.to_os_string(),
        })
    }

    /// Directory holding the runtime library.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File name of the runtime library.
    #[must_use]
    pub fn file_name(&self) -> &OsStr {
        &self.file_name
    }

    /// Full path of the runtime library.
    #[must_use]
    pub fn full_path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    /// Returns true if `path` names the watched file.
    ///
    /// File names compare case-insensitively, matching how the module is
    /// located in the first place.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        path.file_name().is_some_and(|name| {
            name.to_string_lossy()
                .eq_ignore_ascii_case(&self.file_name.to_string_lossy())
        })
    }
}

impl std::fmt::Display for WatchedRuntimePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_path().display())
    }
}

/// Kind of file system change reported by a watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// File created.
    Created,
    /// File contents or metadata changed.
    Modified,
    /// File renamed or moved.
    Renamed,
    /// File deleted.
    Deleted,
    /// Anything else the backend reports.
    Other,
}

/// A single file system notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsChange {
    /// What happened.
    pub kind: ChangeKind,
    /// Path the change applies to.
    pub path: PathBuf,
}

impl FsChange {
    /// Creates a change notification.
    #[must_use]
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// Creates a deletion notification.
    #[must_use]
    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::new(ChangeKind::Deleted, path)
    }
}

/// Delivered to `BeforeRuntimeUpgraded` observers, before any action.
#[derive(Debug, Clone)]
pub struct UpgradeNotice {
    id: UpgradeId,
    strategy: RestartStrategy,
    runtime_path: PathBuf,
}

impl UpgradeNotice {
    /// Creates a notice for a deletion observed under `strategy`.
    #[must_use]
    pub fn new(strategy: RestartStrategy, runtime_path: impl Into<PathBuf>) -> Self {
        Self {
            id: UpgradeId::new(),
            strategy,
            runtime_path: runtime_path.into(),
        }
    }

    /// Identifier shared with the [`UpgradeEvent`] of the same upgrade.
    #[must_use]
    pub const fn id(&self) -> UpgradeId {
        self.id
    }

    /// Strategy active when the deletion was observed.
    #[must_use]
    pub const fn strategy(&self) -> RestartStrategy {
        self.strategy
    }

    /// Path of the deleted runtime library.
    #[must_use]
    pub fn runtime_path(&self) -> &Path {
        &self.runtime_path
    }
}

/// Delivered to `RuntimeUpgraded` observers once per detected upgrade.
///
/// The identity fields are fixed at construction. Observers may request an
/// exit code or cancel the self-exit; the engine honours those requests only
/// when observer overrides are enabled in the configuration.
#[derive(Debug, Clone)]
pub struct UpgradeEvent {
    id: UpgradeId,
    strategy: RestartStrategy,
    runtime_path: PathBuf,
    process_id: Option<u32>,
    exit_code: Option<i32>,
    exit_cancelled: bool,
}

impl UpgradeEvent {
    /// Creates the event that follows `notice`.
    #[must_use]
    pub fn new(notice: &UpgradeNotice, process_id: Option<u32>) -> Self {
        Self {
            id: notice.id,
            strategy: notice.strategy,
            runtime_path: notice.runtime_path.clone(),
            process_id,
            exit_code: None,
            exit_cancelled: false,
        }
    }

    /// Upgrade identifier.
    #[must_use]
    pub const fn id(&self) -> UpgradeId {
        self.id
    }

    /// Strategy active when the deletion was observed.
    #[must_use]
    pub const fn strategy(&self) -> RestartStrategy {
        self.strategy
    }

    /// Path of the deleted runtime library.
    #[must_use]
    pub fn runtime_path(&self) -> &Path {
        &self.runtime_path
    }

    /// PID of the replacement process, if one was spawned.
    #[must_use]
    pub const fn process_id(&self) -> Option<u32> {
        self.process_id
    }

    /// Exit code requested by an observer.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Requests a specific exit code for the self-exit.
    pub fn set_exit_code(&mut self, code: i32) {
        self.exit_code = Some(code);
    }

    /// Returns true if an observer asked to keep the process running.
    #[must_use]
    pub const fn exit_cancelled(&self) -> bool {
        self.exit_cancelled
    }

    /// Asks the engine not to stop the current process.
    pub fn cancel_exit(&mut self) {
        self.exit_cancelled = true;
    }
}
