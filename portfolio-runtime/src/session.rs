//! Session facade: owns the allocation store, the pending draft, and the
//! submission coordinator, and exposes the narrow surface a UI layer needs.
//!
//! The draft is exclusively session-owned: it is seeded when the user opens
//! the rebalance view (from the last-confirmed set or an advisor
//! suggestion), destroyed on submit success or explicit reset, and never
//! partially persisted.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::sync::watch;

use crate::balance::auto_balance;
use crate::coordinator::{SubmissionCoordinator, SubmitOutcome};
use crate::error::AllocationError;
use crate::onchain::{ChainReader, ChainWriter, ConfirmationWatcher};
use crate::store::AllocationStore;
use crate::types::{AllocationSet, RebalanceAction, SubmissionRecord, SuggestedChange};

/// A draft seeded from an advisor suggestion: the draft set itself plus the
/// changes that were actually applied, with `from` re-derived from the live
/// store (suggested `from` values are informational only and never trusted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftSeed {
    pub set: AllocationSet,
    pub applied: Vec<SuggestedChange>,
}

impl DraftSeed {
    /// Category ids pinned by the suggestion, i.e. excluded from
    /// auto-balancing.
    pub fn locked_ids(&self) -> Vec<String> {
        self.applied.iter().map(|c| c.category.clone()).collect()
    }
}

pub struct PortfolioSession {
    store: Arc<AllocationStore>,
    coordinator: SubmissionCoordinator,
    reader: Arc<dyn ChainReader>,
    draft: StdMutex<Option<AllocationSet>>,
}

impl PortfolioSession {
    pub fn new(
        store: Arc<AllocationStore>,
        reader: Arc<dyn ChainReader>,
        writer: Arc<dyn ChainWriter>,
        watcher: Arc<dyn ConfirmationWatcher>,
    ) -> Self {
        let coordinator = SubmissionCoordinator::new(store.clone(), writer, watcher);
        Self {
            store,
            coordinator,
            reader,
            draft: StdMutex::new(None),
        }
    }

    /// Bound the coordinator's wait for a confirmation event.
    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.coordinator = self.coordinator.with_confirmation_timeout(timeout);
        self
    }

    pub fn current_set(&self) -> AllocationSet {
        self.store.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<AllocationSet> {
        self.store.subscribe()
    }

    pub fn pending_draft(&self) -> Option<AllocationSet> {
        self.draft.lock().expect("draft lock poisoned").clone()
    }

    pub fn set_pending_draft(&self, set: AllocationSet) {
        *self.draft.lock().expect("draft lock poisoned") = Some(set);
    }

    pub fn clear_draft(&self) {
        *self.draft.lock().expect("draft lock poisoned") = None;
    }

    pub fn is_updating(&self) -> bool {
        self.coordinator.is_in_flight()
    }

    pub fn records(&self) -> Vec<SubmissionRecord> {
        self.coordinator.records()
    }

    /// Seed the draft from an advisor suggestion.
    ///
    /// Starts from the existing draft if one is open, otherwise from the
    /// current store snapshot. Each suggested change whose category exists
    /// gets its `from` replaced with the live value and its `to` applied;
    /// the touched categories are locked and the rest auto-balanced back to
    /// a 100% total.
    pub fn seed_draft(&self, action: &RebalanceAction) -> DraftSeed {
        let mut set = self.pending_draft().unwrap_or_else(|| self.store.current());

        let mut applied = Vec::new();
        for change in &action.changes {
            let Some(live) = set.get(&change.category).map(|a| a.percentage) else {
                continue;
            };
            set.set_percentage(&change.category, change.to);
            applied.push(SuggestedChange {
                category: change.category.clone(),
                name: change.name.clone(),
                from: live,
                to: change.to,
            });
        }

        let locked: Vec<String> = applied.iter().map(|c| c.category.clone()).collect();
        if set.total() != 100 {
            set = auto_balance(&set, &locked);
        }

        self.set_pending_draft(set.clone());
        DraftSeed { set, applied }
    }

    /// Auto-balance the open draft in place (no locked categories). Returns
    /// the balanced draft, or None when no draft is open.
    pub fn auto_balance_draft(&self) -> Option<AllocationSet> {
        let mut guard = self.draft.lock().expect("draft lock poisoned");
        let draft = guard.as_ref()?;
        let balanced = auto_balance(draft, &[]);
        *guard = Some(balanced.clone());
        Some(balanced)
    }

    /// Replace the store wholesale with the authoritative on-chain columns.
    pub async fn refresh(&self) -> Result<AllocationSet, AllocationError> {
        let columns = self.reader.fetch_allocations().await?;
        let set = AllocationSet::from_columns(columns);
        self.store.replace(set.clone());
        Ok(set)
    }

    /// Submit an explicit candidate set.
    pub async fn submit(
        &self,
        candidate: AllocationSet,
    ) -> Result<SubmitOutcome, AllocationError> {
        self.coordinator.submit(candidate).await
    }

    /// Submit the open draft. With no draft open this is a no-op. The draft
    /// is cleared once it is on-chain or found to match the baseline; it is
    /// kept for another attempt on cancellation or failure.
    pub async fn submit_draft(&self) -> Result<SubmitOutcome, AllocationError> {
        let Some(draft) = self.pending_draft() else {
            return Ok(SubmitOutcome::NoChange);
        };

        let outcome = self.coordinator.submit(draft).await?;
        match outcome {
            SubmitOutcome::Submitted { .. } | SubmitOutcome::NoChange => self.clear_draft(),
            SubmitOutcome::Cancelled => {}
        }
        Ok(outcome)
    }
}
