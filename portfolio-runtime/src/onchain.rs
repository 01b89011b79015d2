//! Collaborator seams for everything that touches the chain. The submission
//! coordinator only ever talks to these traits; production wires them to the
//! alloy-backed [`crate::portfolio_client::PortfolioContractClient`], tests
//! wire them to in-process mocks.

use crate::error::AllocationError;
use async_trait::async_trait;
use thiserror::Error;

/// Handle for a broadcast transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxHandle {
    /// 0x-prefixed transaction hash.
    pub hash: String,
}

/// Outcome reported for a watched transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Success,
    Failure,
}

/// Broadcast failure, with user cancellation at the signing step kept
/// distinct from real errors: cancellation rolls back silently and is never
/// surfaced as an application error.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("transaction cancelled by user")]
    Cancelled,
    #[error("{0}")]
    Other(String),
}

/// Signs and broadcasts an allocation update. `categories` and
/// `percentages` are positionally paired and equal length.
#[async_trait]
pub trait ChainWriter: Send + Sync {
    async fn broadcast(
        &self,
        categories: &[String],
        percentages: &[u32],
    ) -> Result<TxHandle, WriteError>;
}

/// Reads the authoritative allocation columns from the contract.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn fetch_allocations(&self) -> Result<Vec<(String, u32)>, AllocationError>;
}

/// Resolves once the chain reports an outcome for a broadcast transaction.
#[async_trait]
pub trait ConfirmationWatcher: Send + Sync {
    async fn wait_for(&self, tx_hash: &str) -> Result<ConfirmationStatus, AllocationError>;
}
