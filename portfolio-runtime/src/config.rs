//! Environment-driven runtime configuration.

use std::time::Duration;

use crate::error::AllocationError;

pub const MONAD_TESTNET_CHAIN_ID: u64 = 10143;
pub const DEFAULT_EXPLORER_URL: &str = "https://testnet.monadexplorer.com";

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Hex address of the AutomatedPortfolio contract.
    pub portfolio_address: String,
    /// Hex address of the test USDC token, if deployed.
    pub usdc_address: Option<String>,
    /// JSON-RPC endpoint.
    pub rpc_url: String,
    /// Hex-encoded operator private key.
    pub operator_key: String,
    pub chain_id: u64,
    pub explorer_url: String,
    /// Base URL of the advisor service, if one is configured.
    pub advisor_url: Option<String>,
    /// Base URL of the market-data service, if one is configured.
    pub market_data_url: Option<String>,
    /// How long to wait for a transaction confirmation before giving up and
    /// rolling back. Unset means wait indefinitely.
    pub confirmation_timeout: Option<Duration>,
}

impl RuntimeConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, AllocationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AllocationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AllocationError::ConfigError(format!("{name} is not set")))
        };

        let chain_id = match lookup("CHAIN_ID") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                AllocationError::ConfigError(format!("Invalid CHAIN_ID '{raw}': {e}"))
            })?,
            None => MONAD_TESTNET_CHAIN_ID,
        };

        let confirmation_timeout = match lookup("CONFIRMATION_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.parse::<u64>().map_err(|e| {
                    AllocationError::ConfigError(format!(
                        "Invalid CONFIRMATION_TIMEOUT_SECS '{raw}': {e}"
                    ))
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            portfolio_address: require("PORTFOLIO_CONTRACT_ADDRESS")?,
            usdc_address: lookup("USDC_CONTRACT_ADDRESS").filter(|v| !v.is_empty()),
            rpc_url: require("RPC_URL")?,
            operator_key: require("OPERATOR_PRIVATE_KEY")?,
            chain_id,
            explorer_url: lookup("EXPLORER_URL")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_EXPLORER_URL.to_string()),
            advisor_url: lookup("ADVISOR_URL").filter(|v| !v.is_empty()),
            market_data_url: lookup("MARKET_DATA_URL").filter(|v| !v.is_empty()),
            confirmation_timeout,
        })
    }

    /// Explorer link for a transaction hash.
    pub fn tx_url(&self, hash: &str) -> String {
        format!("{}/tx/{hash}", self.explorer_url.trim_end_matches('/'))
    }

    /// Explorer link for an account or contract address.
    pub fn address_url(&self, address: &str) -> String {
        format!("{}/address/{address}", self.explorer_url.trim_end_matches('/'))
    }
}
