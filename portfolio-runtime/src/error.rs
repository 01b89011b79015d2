use thiserror::Error;

#[derive(Error, Debug)]
pub enum AllocationError {
    #[error("Total allocation must equal 100%. Current total: {total}%")]
    InvalidTotal { total: u32 },

    #[error("An allocation update is already in flight")]
    AlreadyInProgress,

    #[error("Connected signer is not the portfolio owner")]
    NotOwner,

    #[error("Chain write failed: {message}")]
    ChainWrite { message: String },

    #[error("Chain read failed: {0}")]
    ChainRead(String),

    #[error("No confirmation within {secs}s")]
    ConfirmationTimeout { secs: u64 },

    #[error("Advisor error: {0}")]
    Advisor(String),

    #[error("Market data unavailable: {0}")]
    MarketDataUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),
}

impl From<reqwest::Error> for AllocationError {
    fn from(e: reqwest::Error) -> Self {
        AllocationError::HttpError(e.to_string())
    }
}

impl From<serde_json::Error> for AllocationError {
    fn from(e: serde_json::Error) -> Self {
        AllocationError::SerializationError(e.to_string())
    }
}
