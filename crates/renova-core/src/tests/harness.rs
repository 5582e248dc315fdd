//! Test harness wiring a notifier to fakes.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::NotifierConfig;
use crate::error::ObserverError;
use crate::notifier::{UpgradeNotifier, UpgradeOutcome};
use crate::tests::mocks::{FakeAdapter, Journal, RecordingExit, SpyWatcher};
use crate::types::{ChangeKind, FsChange};

/// Location of the fake runtime library.
pub const RUNTIME_PATH: &str = "/usr/share/dotnet/shared/Microsoft.NETCore.App/8.0.1/libcoreclr.so";

/// Notifier plus handles on every fake it talks to.
pub struct TestHarness {
    /// Notifier under test.
    pub notifier: UpgradeNotifier,
    /// Scripted platform adapter.
    pub adapter: Arc<FakeAdapter>,
    /// Watcher spy.
    pub watcher: Arc<SpyWatcher>,
    /// Recording exit strategy (installed on the notifier).
    pub exit: Arc<RecordingExit>,
    /// Shared call journal.
    pub journal: Journal,
}

impl TestHarness {
    /// Harness with default configuration and a loaded runtime.
    #[must_use]
    pub fn new() -> Self {
        Self::build(NotifierConfig::new(), |adapter| adapter, SpyWatcher::new())
    }

    /// Harness with `config` and a loaded runtime.
    #[must_use]
    pub fn with_config(config: NotifierConfig) -> Self {
        Self::build(config, |adapter| adapter, SpyWatcher::new())
    }

    /// Harness with a customised adapter.
    #[must_use]
    pub fn with_adapter(
        config: NotifierConfig,
        customise: impl FnOnce(FakeAdapter) -> FakeAdapter,
    ) -> Self {
        Self::build(config, customise, SpyWatcher::new())
    }

    /// Fully custom harness.
    #[must_use]
    pub fn build(
        config: NotifierConfig,
        customise: impl FnOnce(FakeAdapter) -> FakeAdapter,
        watcher: SpyWatcher,
    ) -> Self {
        let journal = Journal::new();
        let adapter = Arc::new(customise(
            FakeAdapter::with_runtime(RUNTIME_PATH).with_journal(journal.clone()),
        ));
        let watcher = Arc::new(watcher);
        let exit = Arc::new(RecordingExit::new(journal.clone()));

        // Recording exit must be in place before a configured strategy can act.
        let initial = config.strategy;
        let config = config.with_strategy(crate::types::RestartStrategy::Manual);
        let notifier = UpgradeNotifier::new(config, adapter.clone(), watcher.clone());
        notifier.set_exit_strategy(exit.clone());
        notifier.set_strategy(initial);

        Self {
            notifier,
            adapter,
            watcher,
            exit,
            journal,
        }
    }

    /// Path of the fake runtime library.
    #[must_use]
    pub fn runtime_path() -> PathBuf {
        PathBuf::from(RUNTIME_PATH)
    }

    /// Simulates the installer deleting the runtime library.
    pub fn delete_runtime(&self) -> Result<Option<UpgradeOutcome>, ObserverError> {
        self.notifier.process_change(FsChange::deleted(RUNTIME_PATH))
    }

    /// Simulates another change kind on the runtime library.
    pub fn touch_runtime(&self, kind: ChangeKind) -> Result<Option<UpgradeOutcome>, ObserverError> {
        self.notifier.process_change(FsChange::new(kind, RUNTIME_PATH))
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
