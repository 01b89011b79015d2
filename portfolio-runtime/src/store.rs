//! The single shared source of the last-confirmed allocation set.
//!
//! Backed by a `tokio::sync::watch` channel so UI layers can subscribe to
//! snapshot changes. Mutation is crate-internal: only the submission
//! coordinator (optimistic apply, rollback) and the session's external
//! refresh may write.

use crate::types::AllocationSet;
use tokio::sync::watch;

#[derive(Debug)]
pub struct AllocationStore {
    tx: watch::Sender<AllocationSet>,
}

impl AllocationStore {
    pub fn new(initial: AllocationSet) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Snapshot of the current set.
    pub fn current(&self) -> AllocationSet {
        self.tx.borrow().clone()
    }

    /// Receiver that observes every store mutation.
    pub fn subscribe(&self) -> watch::Receiver<AllocationSet> {
        self.tx.subscribe()
    }

    /// Replace the snapshot. Reserved for the submission coordinator and the
    /// external-refresh path.
    pub(crate) fn replace(&self, set: AllocationSet) {
        self.tx.send_replace(set);
    }
}

impl Default for AllocationStore {
    fn default() -> Self {
        Self::new(crate::types::default_allocations())
    }
}
