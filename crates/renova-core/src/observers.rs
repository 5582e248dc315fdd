//! Observer registries.
//!
//! Observers run synchronously, in registration order, on the thread that
//! delivers the file system notification.

use std::sync::Arc;

use crate::error::ObserverError;
use crate::types::{UpgradeEvent, UpgradeNotice};

/// Result returned by upgrade observers.
pub type ObserverResult = std::result::Result<(), ObserverError>;

/// Observer invoked before any upgrade action runs.
pub type BeforeUpgradeObserver = dyn Fn(&UpgradeNotice) -> ObserverResult + Send + Sync;

/// Observer invoked after the optional respawn, before the final action.
pub type UpgradeObserver = dyn Fn(&mut UpgradeEvent) -> ObserverResult + Send + Sync;

/// Handle returned on registration, used to remove the observer again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

/// Ordered list of observer callbacks.
pub struct ObserverRegistry<F: ?Sized> {
    entries: Vec<(ObserverId, Arc<F>)>,
}

impl<F: ?Sized> Default for ObserverRegistry<F> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<F: ?Sized> std::fmt::Debug for ObserverRegistry<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(id, _)| id))
            .finish()
    }
}

impl<F: ?Sized> ObserverRegistry<F> {
    /// Appends an observer under `id`.
    pub fn add(&mut self, id: ObserverId, observer: Arc<F>) {
        self.entries.push((id, observer));
    }

    /// Removes the observer registered under `id`.
    ///
    /// Returns false if no such observer exists.
    pub fn remove(&mut self, id: ObserverId) -> bool {
        match self.entries.iter().position(|(entry, _)| *entry == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Clones the current observers, in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<F>> {
        self.entries.iter().map(|(_, f)| Arc::clone(f)).collect()
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every observer, returning how many were registered.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }
}
