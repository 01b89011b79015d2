pub mod error;
pub mod types;
pub mod balance;
pub mod diff;
pub mod store;
pub mod coordinator;
pub mod session;
pub mod onchain;
pub mod contracts;
pub mod portfolio_client;
pub mod advisor;
pub mod prices;
pub mod config;

pub use balance::auto_balance;
pub use coordinator::{SubmissionCoordinator, SubmitOutcome};
pub use diff::has_changes;
pub use error::AllocationError;
pub use session::PortfolioSession;
pub use store::AllocationStore;
pub use types::*;
