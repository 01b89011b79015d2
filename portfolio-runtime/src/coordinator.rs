//! Submission pipeline: validate a candidate set, detect a real change,
//! apply it optimistically, broadcast, and reconcile with the confirmation
//! outcome — rolling back whenever the chain does not confirm.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::diff::has_changes;
use crate::error::AllocationError;
use crate::onchain::{ChainWriter, ConfirmationStatus, ConfirmationWatcher, WriteError};
use crate::store::AllocationStore;
use crate::types::{AllocationSet, SubmissionRecord, SubmissionStatus};

/// Result of a submission attempt that did not error.
///
/// A candidate equal to the baseline and a user-cancelled signing are both
/// ordinary outcomes, not errors: nothing was written and nothing is broken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted { tx_hash: String },
    NoChange,
    Cancelled,
}

pub struct SubmissionCoordinator {
    store: Arc<AllocationStore>,
    writer: Arc<dyn ChainWriter>,
    watcher: Arc<dyn ConfirmationWatcher>,
    /// Single-slot re-entrancy guard: held for the whole submission,
    /// including rollback, so no new submission can race one in flight.
    in_flight: Mutex<()>,
    history: StdMutex<Vec<SubmissionRecord>>,
    confirmation_timeout: Option<Duration>,
}

impl SubmissionCoordinator {
    pub fn new(
        store: Arc<AllocationStore>,
        writer: Arc<dyn ChainWriter>,
        watcher: Arc<dyn ConfirmationWatcher>,
    ) -> Self {
        Self {
            store,
            writer,
            watcher,
            in_flight: Mutex::new(()),
            history: StdMutex::new(Vec::new()),
            confirmation_timeout: None,
        }
    }

    /// Bound the wait for a confirmation event. Unset, a submission stays
    /// pending until the watcher resolves.
    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = Some(timeout);
        self
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// All submission records, oldest first.
    pub fn records(&self) -> Vec<SubmissionRecord> {
        self.history.lock().expect("history lock poisoned").clone()
    }

    /// Submit a candidate allocation set on-chain.
    ///
    /// Preconditions are checked in order: no submission already in flight,
    /// total exactly 100, and a real difference against the store. The store
    /// is updated optimistically before broadcast and restored to the prior
    /// snapshot on cancellation, broadcast failure, failed confirmation, or
    /// timeout.
    pub async fn submit(
        &self,
        candidate: AllocationSet,
    ) -> Result<SubmitOutcome, AllocationError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            return Err(AllocationError::AlreadyInProgress);
        };

        let total = candidate.total();
        if total != 100 {
            return Err(AllocationError::InvalidTotal { total });
        }

        let prior = self.store.current();
        if !has_changes(&candidate, &prior) {
            tracing::debug!("candidate matches current allocations, skipping submission");
            return Ok(SubmitOutcome::NoChange);
        }

        let record_id = self.push_pending(&candidate, &prior);

        // Optimistic apply so readers see the candidate immediately.
        self.store.replace(candidate.clone());

        let (categories, percentages) = candidate.to_columns();
        tracing::info!(categories = categories.len(), "submitting allocation update");

        let handle = match self.writer.broadcast(&categories, &percentages).await {
            Ok(handle) => handle,
            Err(WriteError::Cancelled) => {
                self.finish(record_id, SubmissionStatus::Failed, None, Some("cancelled by user"));
                self.store.replace(prior);
                tracing::info!("allocation update cancelled at signing, rolled back");
                return Ok(SubmitOutcome::Cancelled);
            }
            Err(WriteError::Other(message)) => {
                self.finish(record_id, SubmissionStatus::Failed, None, Some(&message));
                self.store.replace(prior);
                tracing::warn!(%message, "allocation broadcast failed, rolled back");
                return Err(AllocationError::ChainWrite { message });
            }
        };

        self.set_tx_hash(record_id, &handle.hash);
        tracing::info!(tx_hash = %handle.hash, "allocation update broadcast");

        let status = match self.confirmation_timeout {
            Some(timeout) => {
                match tokio::time::timeout(timeout, self.watcher.wait_for(&handle.hash)).await {
                    Ok(status) => status,
                    Err(_) => {
                        self.finish(
                            record_id,
                            SubmissionStatus::Failed,
                            Some(&handle.hash),
                            Some("confirmation timed out"),
                        );
                        self.store.replace(prior);
                        tracing::warn!(tx_hash = %handle.hash, "no confirmation in time, rolled back");
                        return Err(AllocationError::ConfirmationTimeout {
                            secs: timeout.as_secs(),
                        });
                    }
                }
            }
            None => self.watcher.wait_for(&handle.hash).await,
        };

        match status {
            Ok(ConfirmationStatus::Success) => {
                self.finish(record_id, SubmissionStatus::Confirmed, Some(&handle.hash), None);
                tracing::info!(tx_hash = %handle.hash, "allocation update confirmed");
                Ok(SubmitOutcome::Submitted {
                    tx_hash: handle.hash,
                })
            }
            Ok(ConfirmationStatus::Failure) => {
                let message = "transaction reverted on-chain".to_string();
                self.finish(record_id, SubmissionStatus::Failed, Some(&handle.hash), Some(&message));
                self.store.replace(prior);
                tracing::warn!(tx_hash = %handle.hash, "allocation update reverted, rolled back");
                Err(AllocationError::ChainWrite { message })
            }
            Err(e) => {
                let message = e.to_string();
                self.finish(record_id, SubmissionStatus::Failed, Some(&handle.hash), Some(&message));
                self.store.replace(prior);
                tracing::warn!(tx_hash = %handle.hash, %message, "confirmation watch failed, rolled back");
                Err(AllocationError::ChainWrite { message })
            }
        }
    }

    fn push_pending(&self, requested: &AllocationSet, prior: &AllocationSet) -> Uuid {
        let record = SubmissionRecord {
            id: Uuid::new_v4(),
            status: SubmissionStatus::Pending,
            requested_set: requested.clone(),
            prior_set: prior.clone(),
            tx_hash: None,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        };
        let id = record.id;
        self.history
            .lock()
            .expect("history lock poisoned")
            .push(record);
        id
    }

    fn set_tx_hash(&self, record_id: Uuid, tx_hash: &str) {
        let mut history = self.history.lock().expect("history lock poisoned");
        if let Some(record) = history.iter_mut().find(|r| r.id == record_id) {
            record.tx_hash = Some(tx_hash.to_string());
        }
    }

    fn finish(
        &self,
        record_id: Uuid,
        status: SubmissionStatus,
        tx_hash: Option<&str>,
        error: Option<&str>,
    ) {
        let mut history = self.history.lock().expect("history lock poisoned");
        if let Some(record) = history.iter_mut().find(|r| r.id == record_id) {
            debug_assert!(!record.status.is_terminal());
            record.status = status;
            record.finished_at = Some(Utc::now());
            if let Some(hash) = tx_hash {
                record.tx_hash = Some(hash.to_string());
            }
            record.error = error.map(str::to_string);
        }
    }
}
