//! Subscriber reference counting.
//!
//! Interest in upgrades comes from two sources: registered observers and a
//! non-`Manual` strategy. The watch runs iff the combined count is non-zero.
//! The counter only reports transitions; the caller starts or stops the
//! watch while still holding the lock that guards the counter.

/// Watch lifecycle change implied by a count update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Count went 0 → 1: start the watch.
    Activate,
    /// Count went 1 → 0: stop the watch.
    Deactivate,
    /// No lifecycle change.
    Unchanged,
}

/// Reference count of active upgrade subscribers.
#[derive(Debug, Default)]
pub struct SubscriptionCounter {
    count: usize,
}

impl SubscriptionCounter {
    /// Creates a counter at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self { count: 0 }
    }

    /// Current subscriber count.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Records one more subscriber.
    pub fn acquire(&mut self) -> Transition {
        self.count += 1;
        if self.count == 1 {
            Transition::Activate
        } else {
            Transition::Unchanged
        }
    }

    /// Records one subscriber leaving.
    ///
    /// Releasing at zero is ignored.
    pub fn release(&mut self) -> Transition {
        match self.count {
            0 => {
                tracing::warn!("subscriber released with no active subscribers");
                Transition::Unchanged
            }
            1 => {
                self.count = 0;
                Transition::Deactivate
            }
            _ => {
                self.count -= 1;
                Transition::Unchanged
            }
        }
    }

    /// Drops every subscriber at once.
    pub fn reset(&mut self) -> Transition {
        if std::mem::take(&mut self.count) > 0 {
            Transition::Deactivate
        } else {
            Transition::Unchanged
        }
    }
}
