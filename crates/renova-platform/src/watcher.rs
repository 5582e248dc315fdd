//! File watcher backed by `notify` (inotify, FSEvents, ReadDirectoryChangesW).

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use renova_core::{ChangeCallback, ChangeKind, FileWatcher, FsChange, UpgradeError, WatchedRuntimePath};

/// Non-recursive watch on the runtime library's directory.
///
/// Every event in the directory is forwarded; filtering by file name and
/// change kind is left to the notifier.
#[derive(Default)]
pub struct NotifyWatcher {
    inner: Mutex<Option<RecommendedWatcher>>,
}

impl std::fmt::Debug for NotifyWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyWatcher")
            .field("active", &self.is_active())
            .finish()
    }
}

impl NotifyWatcher {
    /// Creates an idle watcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Maps a notify event kind onto the change kinds the notifier knows.
#[must_use]
pub fn change_kind(kind: &EventKind) -> ChangeKind {
    match kind {
        EventKind::Remove(_) => ChangeKind::Deleted,
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Renamed,
        EventKind::Modify(_) => ChangeKind::Modified,
        _ => ChangeKind::Other,
    }
}

/// Splits one notify event into per-path changes.
#[must_use]
pub fn changes(event: Event) -> Vec<FsChange> {
    let kind = change_kind(&event.kind);
    event
        .paths
        .into_iter()
        .map(|path| FsChange::new(kind, path))
        .collect()
}

impl FileWatcher for NotifyWatcher {
    fn start(&self, target: &WatchedRuntimePath, on_change: ChangeCallback) -> renova_core::Result<()> {
        let mut inner = self.inner.lock();
        if inner.is_some() {
            tracing::debug!(path = %target, "watch already active");
            return Ok(());
        }

        let directory = target.directory().to_path_buf();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for change in changes(event) {
                    on_change(change);
                }
            }
            Err(e) => tracing::warn!(error = %e, "file watch error"),
        })
        .map_err(|e| UpgradeError::watch(&directory, e))?;

        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|e| UpgradeError::watch(&directory, e))?;

        tracing::debug!(directory = %directory.display(), "directory watch established");
        *inner = Some(watcher);
        Ok(())
    }

    fn stop(&self) {
        let Some(watcher) = self.inner.lock().take() else {
            return;
        };
        // FSEvents joins its run-loop thread on drop, and that thread may be
        // the one calling us from inside a change callback.
        let released = std::thread::Builder::new()
            .name("renova-watch-release".into())
            .spawn(move || drop(watcher));
        match released {
            Ok(_) => tracing::debug!("directory watch released"),
            Err(e) => tracing::warn!(error = %e, "no thread to release directory watch; released inline"),
        }
    }

    fn is_active(&self) -> bool {
        self.inner.lock().is_some()
    }
}
