//! Upgrade notifier: subscription bookkeeping and the restart strategy
//! engine.
//!
//! # Locking
//!
//! One mutex guards the strategy, the subscriber count, both observer
//! registries and the watch lifecycle. Every strategy change and every
//! observer add/remove evaluates its count transition and starts or stops
//! the watch inside that critical section, so two threads can never both
//! start or both skip starting the watch.
//!
//! Observers and external commands never run under the lock. The deletion
//! sequence reads the strategy afresh at every step; a strategy changed
//! while the sequence is in flight governs the steps that follow.
//!
//! Stopping the watch happens under the lock, so [`FileWatcher::stop`] must
//! not wait on the callback thread. Disposal resets the strategy to
//! `Manual`, and changes delivered after it are dropped.
//!
//! # Deletion sequence
//!
//! ```text
//! log ─▶ BeforeRuntimeUpgraded ─▶ [respawn] ─▶ RuntimeUpgraded ─▶ [exit | service restart]
//! ```

use std::path::Path;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;

use crate::adapter::{ChangeCallback, FileWatcher, PlatformAdapter};
use crate::config::NotifierConfig;
use crate::counter::{SubscriptionCounter, Transition};
use crate::error::ObserverError;
use crate::exit::{ExitStrategy, ProcessExit};
use crate::locator::RuntimeLocator;
use crate::observers::{
    BeforeUpgradeObserver, ObserverId, ObserverRegistry, ObserverResult, UpgradeObserver,
};
use crate::service::ServiceIdentity;
use crate::types::{
    ChangeKind, FsChange, RestartStrategy, UpgradeEvent, UpgradeNotice, WatchedRuntimePath,
};

/// Exit code forced when the service manager fails to restart the unit.
pub const SERVICE_RESTART_FAILURE_EXIT_CODE: i32 = 1;

/// Final step taken after `RuntimeUpgraded` observers returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostUpgradeAction {
    /// Strategy asks for nothing more.
    None,
    /// Exit strategy was invoked.
    Exited {
        /// Name of the exit strategy.
        strategy: &'static str,
        /// Observer-requested exit code, if any.
        exit_code: Option<i32>,
    },
    /// An observer cancelled the self-exit.
    ExitCancelled,
    /// Exit strategy failed; the process keeps running.
    ExitFailed(String),
    /// Service manager accepted the restart.
    ServiceRestarted {
        /// Restarted unit.
        unit: String,
    },
    /// Service restart failed and the process was terminated.
    Terminated {
        /// Unit whose restart failed.
        unit: String,
        /// Exit code passed to terminate.
        exit_code: i32,
    },
}

/// Result of one deletion sequence.
#[derive(Debug, Clone)]
pub struct UpgradeOutcome {
    /// Event as it stood after all observers ran.
    pub event: UpgradeEvent,
    /// Final step taken.
    pub action: PostUpgradeAction,
}

struct State {
    strategy: RestartStrategy,
    counter: SubscriptionCounter,
    watching: bool,
    before: ObserverRegistry<BeforeUpgradeObserver>,
    after: ObserverRegistry<UpgradeObserver>,
    next_observer: u64,
    disposed: bool,
}

impl State {
    fn next_id(&mut self) -> ObserverId {
        self.next_observer += 1;
        ObserverId::new(self.next_observer)
    }
}

/// Strategy one step of the deletion sequence acts on, with the service
/// unit when that step restarts a service.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ServiceStep {
    strategy: RestartStrategy,
    unit: Option<String>,
}

struct Inner {
    me: Weak<Inner>,
    config: NotifierConfig,
    adapter: Arc<dyn PlatformAdapter>,
    watcher: Arc<dyn FileWatcher>,
    exit: RwLock<Arc<dyn ExitStrategy>>,
    locator: RuntimeLocator,
    service: ServiceIdentity,
    state: Mutex<State>,
}

/// Detects in-place upgrades of the runtime library and runs the configured
/// restart strategy.
///
/// Each notifier is an independent instance owned by the host. Dropping it
/// disposes it.
///
/// # Example
///
/// ```rust,ignore
/// use renova_core::{NotifierConfig, RestartStrategy, UpgradeNotifier};
///
/// let notifier = UpgradeNotifier::new(NotifierConfig::new(), adapter, watcher);
/// notifier.on_upgrade(|event| {
///     tracing::info!(pid = ?event.process_id(), "runtime upgraded");
///     Ok(())
/// });
/// notifier.set_strategy(RestartStrategy::AutoRestartProcess);
/// ```
pub struct UpgradeNotifier {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for UpgradeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("UpgradeNotifier")
            .field("strategy", &state.strategy)
            .field("subscribers", &state.counter.count())
            .field("watching", &state.watching)
            .field("disposed", &state.disposed)
            .finish_non_exhaustive()
    }
}

impl UpgradeNotifier {
    /// Creates a notifier and applies `config.strategy`.
    ///
    /// The default exit strategy is [`ProcessExit`] with `config.exit_code`.
    #[must_use]
    pub fn new(
        config: NotifierConfig,
        adapter: Arc<dyn PlatformAdapter>,
        watcher: Arc<dyn FileWatcher>,
    ) -> Self {
        let locator = RuntimeLocator::new(config.runtime_library_for(adapter.platform()));
        let service = ServiceIdentity::new(
            config.service_unit.clone(),
            config.re_resolve_service_identity,
        );
        let exit: Arc<dyn ExitStrategy> = Arc::new(ProcessExit::new(config.exit_code));
        let initial = config.strategy;

        let inner = Arc::new_cyclic(|me| Inner {
            me: me.clone(),
            config,
            adapter,
            watcher,
            exit: RwLock::new(exit),
            locator,
            service,
            state: Mutex::new(State {
                strategy: RestartStrategy::Manual,
                counter: SubscriptionCounter::new(),
                watching: false,
                before: ObserverRegistry::default(),
                after: ObserverRegistry::default(),
                next_observer: 0,
                disposed: false,
            }),
        });

        if !initial.is_manual() {
            inner.set_strategy(initial);
        }
        Self { inner }
    }

    /// Currently active strategy.
    #[must_use]
    pub fn strategy(&self) -> RestartStrategy {
        self.inner.strategy()
    }

    /// Changes the active strategy and returns the strategy actually applied.
    ///
    /// Selecting `AutoRestartService` resolves the service identity first;
    /// without one the notifier applies `AutoRestartProcess` instead.
    pub fn set_strategy(&self, strategy: RestartStrategy) -> RestartStrategy {
        self.inner.set_strategy(strategy)
    }

    /// Exit strategy used by `AutoRestartProcess` and `AutoStopProcess`.
    #[must_use]
    pub fn exit_strategy(&self) -> Arc<dyn ExitStrategy> {
        self.inner.exit.read().clone()
    }

    /// Replaces the exit strategy.
    pub fn set_exit_strategy(&self, exit: Arc<dyn ExitStrategy>) {
        tracing::debug!(exit = exit.name(), "exit strategy replaced");
        *self.inner.exit.write() = exit;
    }

    /// Registers a `BeforeRuntimeUpgraded` observer.
    pub fn on_before_upgrade<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&UpgradeNotice) -> ObserverResult + Send + Sync + 'static,
    {
        let mut state = self.inner.state.lock();
        let id = state.next_id();
        if state.disposed {
            tracing::warn!(observer = %id, "notifier disposed; observer not registered");
            return id;
        }
        state.before.add(id, Arc::new(observer));
        let transition = state.counter.acquire();
        self.inner.apply(&mut state, transition);
        id
    }

    /// Removes a `BeforeRuntimeUpgraded` observer.
    ///
    /// Returns false if `id` is not registered.
    pub fn remove_before_upgrade(&self, id: ObserverId) -> bool {
        let mut state = self.inner.state.lock();
        if !state.before.remove(id) {
            return false;
        }
        let transition = state.counter.release();
        self.inner.apply(&mut state, transition);
        true
    }

    /// Registers a `RuntimeUpgraded` observer.
    pub fn on_upgrade<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&mut UpgradeEvent) -> ObserverResult + Send + Sync + 'static,
    {
        let mut state = self.inner.state.lock();
        let id = state.next_id();
        if state.disposed {
            tracing::warn!(observer = %id, "notifier disposed; observer not registered");
            return id;
        }
        state.after.add(id, Arc::new(observer));
        let transition = state.counter.acquire();
        self.inner.apply(&mut state, transition);
        id
    }

    /// Removes a `RuntimeUpgraded` observer.
    ///
    /// Returns false if `id` is not registered.
    pub fn remove_on_upgrade(&self, id: ObserverId) -> bool {
        let mut state = self.inner.state.lock();
        if !state.after.remove(id) {
            return false;
        }
        let transition = state.counter.release();
        self.inner.apply(&mut state, transition);
        true
    }

    /// Subscribes to `RuntimeUpgraded` through an async channel.
    ///
    /// The returned id removes the subscription via
    /// [`remove_on_upgrade`](Self::remove_on_upgrade).
    pub fn subscribe_channel(&self) -> (ObserverId, mpsc::UnboundedReceiver<UpgradeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.on_upgrade(move |event| {
            if tx.send(event.clone()).is_err() {
                tracing::debug!(upgrade = %event.id(), "upgrade channel receiver dropped");
            }
            Ok(())
        });
        (id, rx)
    }

    /// Delivers a file system change, as the watcher does.
    ///
    /// Returns `Ok(None)` when the change is not a deletion of the watched
    /// runtime library.
    ///
    /// # Errors
    /// Returns the first observer error; remaining observers and actions
    /// are skipped.
    pub fn process_change(
        &self,
        change: FsChange,
    ) -> std::result::Result<Option<UpgradeOutcome>, ObserverError> {
        self.inner.process_change(change)
    }

    /// Returns true while the file watch is running.
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.inner.state.lock().watching
    }

    /// Number of active subscribers, including a non-`Manual` strategy.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.state.lock().counter.count()
    }

    /// Location of the runtime library, once resolved.
    #[must_use]
    pub fn watched_path(&self) -> Option<WatchedRuntimePath> {
        self.inner.locator.cached().cloned()
    }

    /// Configuration this notifier was built with.
    #[must_use]
    pub fn config(&self) -> &NotifierConfig {
        &self.inner.config
    }

    /// Stops the watch and drops all observers. Safe to call repeatedly.
    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

impl Drop for UpgradeNotifier {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl Inner {
    fn strategy(&self) -> RestartStrategy {
        self.state.lock().strategy
    }

    fn set_strategy(&self, requested: RestartStrategy) -> RestartStrategy {
        let effective = if requested == RestartStrategy::AutoRestartService
            && self.service.get(self.adapter.as_ref()).is_none()
        {
            tracing::warn!(
                requested = %requested,
                applied = %RestartStrategy::AutoRestartProcess,
                "no owning service unit; falling back to process restart"
            );
            RestartStrategy::AutoRestartProcess
        } else {
            requested
        };

        let mut state = self.state.lock();
        if state.disposed {
            tracing::warn!(strategy = %effective, "notifier disposed; strategy unchanged");
            return state.strategy;
        }
        let previous = std::mem::replace(&mut state.strategy, effective);
        let transition = match (previous.is_manual(), effective.is_manual()) {
            (true, false) => state.counter.acquire(),
            (false, true) => state.counter.release(),
            _ => Transition::Unchanged,
        };
        self.apply(&mut state, transition);

        if previous != effective {
            tracing::info!(from = %previous, to = %effective, "restart strategy changed");
        }
        effective
    }

    /// Starts or stops the watch. Called with the state lock held.
    fn apply(&self, state: &mut State, transition: Transition) {
        match transition {
            Transition::Activate => {
                tracing::debug!(subscribers = state.counter.count(), "first subscriber; starting watch");
                state.watching = self.start_watch();
            }
            Transition::Deactivate => {
                tracing::debug!("last subscriber gone; stopping watch");
                if std::mem::take(&mut state.watching) {
                    self.watcher.stop();
                }
            }
            Transition::Unchanged => {}
        }
    }

    fn start_watch(&self) -> bool {
        let target = match self.locator.resolve(self.adapter.as_ref()) {
            Ok(target) => target,
            Err(e) => {
                tracing::error!(
                    library = self.locator.library_name(),
                    platform = %self.adapter.platform(),
                    error = %e,
                    "cannot locate runtime library; upgrade detection disabled"
                );
                return false;
            }
        };

        let me = self.me.clone();
        let on_change: ChangeCallback = Arc::new(move |change| {
            let Some(inner) = me.upgrade() else {
                return;
            };
            if let Err(e) = inner.process_change(change) {
                tracing::error!(error = %e, "upgrade observer failed; remaining upgrade actions skipped");
            }
        });

        match self.watcher.start(&target, on_change) {
            Ok(()) => {
                tracing::info!(path = %target, "watching runtime library for upgrades");
                true
            }
            Err(e) => {
                tracing::error!(path = %target, error = %e, "cannot watch runtime library; upgrade detection disabled");
                false
            }
        }
    }

    fn process_change(
        &self,
        change: FsChange,
    ) -> std::result::Result<Option<UpgradeOutcome>, ObserverError> {
        if self.state.lock().disposed {
            tracing::debug!(path = %change.path.display(), "notifier disposed; change ignored");
            return Ok(None);
        }
        let Some(target) = self.locator.cached() else {
            tracing::debug!(path = %change.path.display(), "change before runtime was located; ignored");
            return Ok(None);
        };
        if !target.matches(&change.path) {
            tracing::trace!(path = %change.path.display(), "unrelated change in runtime directory");
            return Ok(None);
        }
        if change.kind != ChangeKind::Deleted {
            tracing::warn!(
                path = %change.path.display(),
                kind = ?change.kind,
                "ignoring non-deletion change to runtime library"
            );
            return Ok(None);
        }
        self.run_upgrade(&change.path).map(Some)
    }

    fn run_upgrade(&self, runtime_path: &Path) -> std::result::Result<UpgradeOutcome, ObserverError> {
        let strategy = self.strategy();
        tracing::info!(
            path = %runtime_path.display(),
            strategy = %strategy,
            action = strategy.action_description(),
            "runtime upgrade detected"
        );
        let notice = UpgradeNotice::new(strategy, runtime_path);

        let before = self.state.lock().before.snapshot();
        for observer in before {
            observer(&notice)?;
        }

        let spawn_step = self.service_step(self.strategy());
        let process_id = if spawn_step.strategy.spawns_process() {
            self.relaunch()
        } else {
            None
        };
        let mut event = UpgradeEvent::new(&notice, process_id);

        let after = self.state.lock().after.snapshot();
        for observer in after {
            observer(&mut event)?;
        }

        let strategy = self.strategy();
        let final_step = match (strategy, spawn_step.unit) {
            (RestartStrategy::AutoRestartService, Some(unit)) => ServiceStep {
                strategy,
                unit: Some(unit),
            },
            // Already downgraded before the spawn; do not ask again.
            (RestartStrategy::AutoRestartService, None)
                if spawn_step.strategy == RestartStrategy::AutoRestartProcess =>
            {
                ServiceStep {
                    strategy: RestartStrategy::AutoRestartProcess,
                    unit: None,
                }
            }
            _ => self.service_step(strategy),
        };
        let action = match final_step {
            ServiceStep {
                unit: Some(unit), ..
            } => self.restart_service(unit),
            ServiceStep { strategy, .. } if strategy.exits_process() => self.exit_self(&event),
            ServiceStep { .. } => PostUpgradeAction::None,
        };
        Ok(UpgradeOutcome { event, action })
    }

    /// Resolves the unit for `AutoRestartService`. Without one the step runs
    /// as `AutoRestartProcess`. May shell out; call without the state lock.
    fn service_step(&self, strategy: RestartStrategy) -> ServiceStep {
        if strategy != RestartStrategy::AutoRestartService {
            return ServiceStep {
                strategy,
                unit: None,
            };
        }
        match self.service.get(self.adapter.as_ref()) {
            Some(unit) => ServiceStep {
                strategy,
                unit: Some(unit),
            },
            None => {
                tracing::warn!(
                    requested = %strategy,
                    applied = %RestartStrategy::AutoRestartProcess,
                    "service identity unavailable at upgrade; restarting process instead"
                );
                ServiceStep {
                    strategy: RestartStrategy::AutoRestartProcess,
                    unit: None,
                }
            }
        }
    }

    fn relaunch(&self) -> Option<u32> {
        match self.adapter.relaunch() {
            Ok(pid) => {
                tracing::info!(pid, "started replacement process");
                Some(pid)
            }
            Err(e) => {
                tracing::error!(error = %e, platform = %self.adapter.platform(), "failed to start replacement process");
                None
            }
        }
    }

    fn exit_self(&self, event: &UpgradeEvent) -> PostUpgradeAction {
        let exit_code = if self.config.allow_observer_override {
            if event.exit_cancelled() {
                tracing::info!(upgrade = %event.id(), "observer cancelled process exit");
                return PostUpgradeAction::ExitCancelled;
            }
            event.exit_code()
        } else {
            if event.exit_cancelled() || event.exit_code().is_some() {
                tracing::debug!(upgrade = %event.id(), "observer overrides disabled; ignoring exit request");
            }
            None
        };

        let exit = self.exit.read().clone();
        match exit.stop(exit_code) {
            Ok(()) => PostUpgradeAction::Exited {
                strategy: exit.name(),
                exit_code,
            },
            Err(e) => {
                tracing::error!(exit = exit.name(), error = %e, "failed to stop current process; continuing to run");
                PostUpgradeAction::ExitFailed(e.to_string())
            }
        }
    }

    fn restart_service(&self, unit: String) -> PostUpgradeAction {
        match self.adapter.restart_service(&unit) {
            Ok(()) => {
                tracing::info!(unit = %unit, "service restart requested");
                PostUpgradeAction::ServiceRestarted { unit }
            }
            Err(e) => {
                tracing::error!(
                    unit = %unit,
                    error = %e,
                    exit_code = SERVICE_RESTART_FAILURE_EXIT_CODE,
                    "service restart failed; terminating so the supervisor restarts the process"
                );
                self.adapter.terminate(SERVICE_RESTART_FAILURE_EXIT_CODE);
                PostUpgradeAction::Terminated {
                    unit,
                    exit_code: SERVICE_RESTART_FAILURE_EXIT_CODE,
                }
            }
        }
    }

    fn dispose(&self) {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;
        state.strategy = RestartStrategy::Manual;
        let observers = state.before.clear() + state.after.clear();
        let transition = state.counter.reset();
        self.apply(&mut state, transition);
        tracing::debug!(observers, "upgrade notifier disposed");
    }
}
