//! Connection limit accounting.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts open connections against a fixed limit.
#[derive(Debug)]
pub struct ConnectionSlots {
    active: AtomicUsize,
    max: usize,
}

impl ConnectionSlots {
    /// Create with room for `max` connections.
    pub fn new(max: usize) -> Self {
        Self {
            active: AtomicUsize::new(0),
            max,
        }
    }

    /// Take a slot, or `None` when the limit is reached.
    ///
    /// The slot is returned when the guard drops, including when an upgrade
    /// is abandoned before the session starts.
    pub fn try_acquire(self: &Arc<Self>) -> Option<SlotGuard> {
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < self.max).then_some(n + 1))
            .ok()
            .map(|_| SlotGuard { slots: self.clone() })
    }

    /// Open connections.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Configured limit.
    pub fn max(&self) -> usize {
        self.max
    }
}

/// Holds one slot until dropped.
#[derive(Debug)]
pub struct SlotGuard {
    slots: Arc<ConnectionSlots>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let _ = self.slots.active.fetch_sub(1, Ordering::AcqRel);
    }
}
