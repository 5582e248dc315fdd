//! Category C: end-to-end upgrade scenarios (F031-F039).
//!
//! Deletions arrive through the watcher callback, the way the OS delivers
//! them, rather than through `process_change`.

use std::sync::Arc;

use crate::config::NotifierConfig;
use crate::exit::{ChannelExit, FnExit};
use crate::observers::ObserverId;
use crate::notifier::{PostUpgradeAction, SERVICE_RESTART_FAILURE_EXIT_CODE};
use crate::tests::harness::TestHarness;
use crate::types::{FsChange, RestartStrategy};

/// F031: AutoStartNewProcess reports the child pid and keeps running
#[test]
fn f031_start_new_process_keeps_running() {
    let h = TestHarness::with_adapter(
        NotifierConfig::new().with_strategy(RestartStrategy::AutoStartNewProcess),
        |a| a.with_relaunch_pid(31337),
    );
    let (_, mut rx) = h.notifier.subscribe_channel();

    assert!(h.watcher.fire(FsChange::deleted(TestHarness::runtime_path())));

    let event = rx.try_recv().unwrap();
    assert_eq!(event.process_id(), Some(31337));
    assert_eq!(event.strategy(), RestartStrategy::AutoStartNewProcess);
    assert_eq!(h.exit.stop_count(), 0);
    assert!(h.notifier.is_watching());
}

/// F032: AutoStopProcess stops exactly once and never spawns
#[test]
fn f032_stop_process_exits_once() {
    let h = TestHarness::with_config(
        NotifierConfig::new().with_strategy(RestartStrategy::AutoStopProcess),
    );
    let (_, mut rx) = h.notifier.subscribe_channel();

    h.watcher.fire(FsChange::deleted(TestHarness::runtime_path()));

    assert_eq!(rx.try_recv().unwrap().process_id(), None);
    assert_eq!(h.exit.stop_count(), 1);
    assert_eq!(h.adapter.relaunches(), 0);
}

/// F033: Failed service restart terminates with the supervisor exit code
#[test]
fn f033_service_restart_failure_terminates() {
    let h = TestHarness::with_adapter(
        NotifierConfig::new().with_strategy(RestartStrategy::AutoRestartService),
        |a| a.with_service("orders.service").fail_service_restart(3),
    );

    let outcome = h.delete_runtime().unwrap().unwrap();
    assert_eq!(h.adapter.terminations(), [SERVICE_RESTART_FAILURE_EXIT_CODE]);
    assert_eq!(
        outcome.action,
        PostUpgradeAction::Terminated {
            unit: "orders.service".into(),
            exit_code: SERVICE_RESTART_FAILURE_EXIT_CODE,
        }
    );
    assert_eq!(h.adapter.relaunches(), 0);
    assert_eq!(h.exit.stop_count(), 0);
}

/// F034: Observer errors raised inside the watch callback are contained
#[test]
fn f034_callback_contains_observer_errors() {
    let h = TestHarness::with_config(
        NotifierConfig::new().with_strategy(RestartStrategy::AutoRestartProcess),
    );
    h.notifier
        .on_before_upgrade(|_| Err(crate::error::ObserverError::msg("refusing")));

    assert!(h.watcher.fire(FsChange::deleted(TestHarness::runtime_path())));
    assert_eq!(h.adapter.relaunches(), 0);
    assert_eq!(h.exit.stop_count(), 0);
    assert!(h.notifier.is_watching());
}

/// F035: Graceful shutdown through a channel exit strategy
#[test]
fn f035_channel_exit_signals_host() {
    let h = TestHarness::with_config(
        NotifierConfig::new()
            .with_strategy(RestartStrategy::AutoRestartProcess)
            .with_exit_code(0),
    );
    let (exit, mut shutdown) = ChannelExit::new(0);
    h.notifier.set_exit_strategy(Arc::new(exit));

    h.watcher.fire(FsChange::deleted(TestHarness::runtime_path()));

    tokio_test::block_on(async {
        shutdown.changed().await.unwrap();
    });
    assert_eq!(*shutdown.borrow(), Some(0));
    assert_eq!(h.adapter.relaunches(), 1);
}

/// F036: Dropped notifier no longer reacts to late callbacks
#[test]
fn f036_dropped_notifier_ignores_late_events() {
    let h = TestHarness::with_config(
        NotifierConfig::new().with_strategy(RestartStrategy::AutoStopProcess),
    );
    let stops = Arc::new(std::sync::atomic::AtomicU32::new(0));
    let counted = Arc::clone(&stops);
    h.notifier.set_exit_strategy(Arc::new(FnExit::new(move |_| {
        counted.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    })));

    // Hold the callback past the notifier, as a slow OS thread might.
    let late = h.watcher.callback().unwrap();
    let target = h.watcher.target().unwrap();
    let watcher = Arc::clone(&h.watcher);
    let adapter = Arc::clone(&h.adapter);
    drop(h.notifier);

    assert_eq!(watcher.stops(), 1);
    assert!(!watcher.fire(FsChange::deleted(target.full_path())));
    late(FsChange::deleted(target.full_path()));
    assert_eq!(stops.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(adapter.relaunches(), 0);
}

/// F037: A disposed notifier ignores deletions still in flight
#[test]
fn f037_disposed_notifier_ignores_deletion() {
    let h = TestHarness::with_config(
        NotifierConfig::new().with_strategy(RestartStrategy::AutoRestartProcess),
    );
    let late = h.watcher.callback().unwrap();
    h.notifier.dispose();

    assert_eq!(h.notifier.strategy(), RestartStrategy::Manual);
    assert_eq!(h.notifier.subscriber_count(), 0);
    assert!(h.delete_runtime().unwrap().is_none());
    late(FsChange::deleted(TestHarness::runtime_path()));

    assert_eq!(h.adapter.relaunches(), 0);
    assert_eq!(h.exit.stop_count(), 0);
    assert!(h.journal.entries().is_empty());
}

/// F038: Service identity lost before deletion: spawn precedes RuntimeUpgraded
#[test]
fn f038_lost_service_identity_restarts_process_in_order() {
    let h = TestHarness::with_adapter(
        NotifierConfig::new()
            .with_service_re_resolution(true)
            .with_strategy(RestartStrategy::AutoRestartService),
        |a| a.with_service("orders.service").forget_service_after(1),
    );
    assert_eq!(h.notifier.strategy(), RestartStrategy::AutoRestartService);
    let journal = h.journal.clone();
    h.notifier.on_upgrade(move |event| {
        journal.record(format!("upgraded:{:?}", event.process_id()));
        Ok(())
    });

    let outcome = h.delete_runtime().unwrap().unwrap();
    assert_eq!(h.journal.entries(), ["spawn", "upgraded:Some(4242)", "exit"]);
    assert_eq!(outcome.event.process_id(), Some(4242));
    assert!(matches!(outcome.action, PostUpgradeAction::Exited { .. }));
    assert_eq!(h.adapter.relaunches(), 1);
    assert!(h.adapter.service_restarts().is_empty());
    assert_eq!(h.adapter.service_queries(), 2, "identity not asked again after fallback");
}

/// F039: A one-shot observer unsubscribing inside the callback stops the watch
#[test]
fn f039_one_shot_observer_unsubscribes_during_upgrade() {
    let h = TestHarness::new();
    let notifier = Arc::new(h.notifier);
    let weak = Arc::downgrade(&notifier);
    let own_id = Arc::new(parking_lot::Mutex::new(None::<ObserverId>));
    let slot = Arc::clone(&own_id);
    let id = notifier.on_upgrade(move |_| {
        if let (Some(notifier), Some(id)) = (weak.upgrade(), slot.lock().take()) {
            notifier.remove_on_upgrade(id);
        }
        Ok(())
    });
    *own_id.lock() = Some(id);

    assert!(h.watcher.fire(FsChange::deleted(TestHarness::runtime_path())));
    assert!(!notifier.is_watching());
    assert_eq!(h.watcher.stops(), 1);
    assert_eq!(notifier.subscriber_count(), 0);
}
