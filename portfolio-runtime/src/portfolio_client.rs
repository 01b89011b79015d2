//! Alloy-backed implementation of the chain collaborators: reads and writes
//! the AutomatedPortfolio contract and watches transaction receipts.

use std::time::Duration;

use alloy::network::{Ethereum, EthereumWallet};
use alloy::primitives::{Address, B256, U256};
use alloy::providers::fillers::{
    BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller,
};
use alloy::providers::{Identity, Provider, ProviderBuilder, RootProvider};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;

use crate::config::RuntimeConfig;
use crate::contracts::{IAutomatedPortfolio, ITestUSDC};
use crate::error::AllocationError;
use crate::onchain::{ChainReader, ChainWriter, ConfirmationStatus, ConfirmationWatcher, TxHandle, WriteError};

/// The concrete provider type produced by
/// `ProviderBuilder::new().wallet(...).connect_http(...)`: fills nonce, gas,
/// and chain ID, and signs with the supplied wallet.
pub type HttpProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider<Ethereum>,
    Ethereum,
>;

/// Gas limit used for allocation updates once estimation has passed.
const UPDATE_GAS_LIMIT: u64 = 300_000;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct PortfolioContractClient {
    provider: HttpProvider,
    operator: Address,
    portfolio_address: Address,
    usdc_address: Option<Address>,
    chain_id: u64,
    receipt_poll_interval: Duration,
}

impl PortfolioContractClient {
    pub fn new(config: &RuntimeConfig) -> Result<Self, AllocationError> {
        let signer: PrivateKeySigner = config.operator_key.parse().map_err(|e| {
            AllocationError::ConfigError(format!("Invalid operator private key: {e}"))
        })?;
        let operator = signer.address();
        let wallet = EthereumWallet::from(signer);

        let url: url::Url = config
            .rpc_url
            .parse()
            .map_err(|e| AllocationError::ConfigError(format!("Invalid RPC URL: {e}")))?;

        let provider = ProviderBuilder::new().wallet(wallet).connect_http(url);

        let portfolio_address = parse_address(&config.portfolio_address, "portfolio contract")?;
        let usdc_address = config
            .usdc_address
            .as_deref()
            .map(|a| parse_address(a, "USDC contract"))
            .transpose()?;

        Ok(Self {
            provider,
            operator,
            portfolio_address,
            usdc_address,
            chain_id: config.chain_id,
            receipt_poll_interval: RECEIPT_POLL_INTERVAL,
        })
    }

    pub fn operator(&self) -> Address {
        self.operator
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// The contract's owner, the only account allowed to update allocations.
    pub async fn owner(&self) -> Result<Address, AllocationError> {
        let portfolio = IAutomatedPortfolio::new(self.portfolio_address, &self.provider);
        portfolio
            .owner()
            .call()
            .await
            .map_err(|e| AllocationError::ChainRead(format!("owner() failed: {e}")))
    }

    /// Fail with [`AllocationError::NotOwner`] unless the configured signer
    /// owns the portfolio contract.
    pub async fn ensure_owner(&self) -> Result<(), AllocationError> {
        let owner = self.owner().await?;
        if owner != self.operator {
            tracing::warn!(operator = %self.operator, owner = %owner, "signer does not own the portfolio contract");
            return Err(AllocationError::NotOwner);
        }
        Ok(())
    }

    /// Balance of the test USDC token for an account.
    pub async fn usdc_balance(&self, account: Address) -> Result<U256, AllocationError> {
        let usdc = ITestUSDC::new(self.usdc_token()?, &self.provider);
        usdc.balanceOf(account)
            .call()
            .await
            .map_err(|e| AllocationError::ChainRead(format!("balanceOf failed: {e}")))
    }

    /// Claim from the test USDC faucet; returns the transaction hash.
    pub async fn claim_usdc(&self) -> Result<String, AllocationError> {
        let usdc = ITestUSDC::new(self.usdc_token()?, &self.provider);
        let pending = usdc.faucet().send().await.map_err(|e| {
            AllocationError::ChainWrite {
                message: format!("faucet call failed: {e}"),
            }
        })?;
        Ok(format_tx_hash(pending.tx_hash()))
    }

    /// Approve a spender for the test USDC token; returns the transaction hash.
    pub async fn approve_usdc(
        &self,
        spender: Address,
        amount: U256,
    ) -> Result<String, AllocationError> {
        let usdc = ITestUSDC::new(self.usdc_token()?, &self.provider);
        let pending = usdc.approve(spender, amount).send().await.map_err(|e| {
            AllocationError::ChainWrite {
                message: format!("approve call failed: {e}"),
            }
        })?;
        Ok(format_tx_hash(pending.tx_hash()))
    }

    fn usdc_token(&self) -> Result<Address, AllocationError> {
        self.usdc_address.ok_or_else(|| {
            AllocationError::ConfigError("USDC_CONTRACT_ADDRESS is not set".into())
        })
    }
}

#[async_trait]
impl ChainReader for PortfolioContractClient {
    async fn fetch_allocations(&self) -> Result<Vec<(String, u32)>, AllocationError> {
        let portfolio = IAutomatedPortfolio::new(self.portfolio_address, &self.provider);
        let ret = portfolio
            .getAllocations()
            .call()
            .await
            .map_err(|e| AllocationError::ChainRead(format!("getAllocations() failed: {e}")))?;

        if ret.categories.len() != ret.percentages.len() {
            return Err(AllocationError::ChainRead(format!(
                "mismatched allocation columns: {} categories, {} percentages",
                ret.categories.len(),
                ret.percentages.len()
            )));
        }

        ret.categories
            .into_iter()
            .zip(ret.percentages)
            .map(|(category, pct)| {
                let pct = u32::try_from(pct).map_err(|_| {
                    AllocationError::ChainRead(format!(
                        "percentage for '{category}' does not fit in u32"
                    ))
                })?;
                Ok((category, pct))
            })
            .collect()
    }
}

#[async_trait]
impl ChainWriter for PortfolioContractClient {
    async fn broadcast(
        &self,
        categories: &[String],
        percentages: &[u32],
    ) -> Result<TxHandle, WriteError> {
        let portfolio = IAutomatedPortfolio::new(self.portfolio_address, &self.provider);
        let pcts: Vec<U256> = percentages.iter().map(|p| U256::from(*p)).collect();
        let call = portfolio.updateAllocations(categories.to_vec(), pcts);

        // Estimate first so a transaction that would revert never reaches
        // the signer.
        if let Err(e) = call.estimate_gas().await {
            return Err(WriteError::Other(format!("Transaction would fail: {e}")));
        }

        let pending = call
            .gas(UPDATE_GAS_LIMIT)
            .send()
            .await
            .map_err(|e| classify_send_error(&e.to_string()))?;

        Ok(TxHandle {
            hash: format_tx_hash(pending.tx_hash()),
        })
    }
}

#[async_trait]
impl ConfirmationWatcher for PortfolioContractClient {
    async fn wait_for(&self, tx_hash: &str) -> Result<ConfirmationStatus, AllocationError> {
        let hash: B256 = tx_hash
            .parse()
            .map_err(|e| AllocationError::ChainRead(format!("Invalid tx hash '{tx_hash}': {e}")))?;

        loop {
            match self.provider.get_transaction_receipt(hash).await {
                Ok(Some(receipt)) => {
                    return Ok(if receipt.status() {
                        ConfirmationStatus::Success
                    } else {
                        ConfirmationStatus::Failure
                    });
                }
                Ok(None) => tokio::time::sleep(self.receipt_poll_interval).await,
                Err(e) => {
                    return Err(AllocationError::ChainRead(format!(
                        "receipt fetch failed: {e}"
                    )));
                }
            }
        }
    }
}

fn parse_address(raw: &str, what: &str) -> Result<Address, AllocationError> {
    raw.parse::<Address>()
        .map_err(|e| AllocationError::ConfigError(format!("Invalid {what} address '{raw}': {e}")))
}

fn format_tx_hash(hash: &B256) -> String {
    format!("0x{}", hex::encode(hash.as_slice()))
}

/// Map a send error onto the write taxonomy: wallet rejections count as user
/// cancellation, everything else is a real failure.
fn classify_send_error(message: &str) -> WriteError {
    let lower = message.to_lowercase();
    let cancelled = lower.contains("user denied")
        || lower.contains("user rejected")
        || lower.contains("rejected by user")
        || lower.contains("cancelled")
        || lower.contains("canceled");
    if cancelled {
        WriteError::Cancelled
    } else {
        WriteError::Other(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_EXPLORER_URL, MONAD_TESTNET_CHAIN_ID};

    fn test_config() -> RuntimeConfig {
        RuntimeConfig {
            portfolio_address: "0x1111111111111111111111111111111111111111".into(),
            usdc_address: Some("0x2222222222222222222222222222222222222222".into()),
            rpc_url: "http://localhost:8545".into(),
            // Well-known test private key (Hardhat account #0).
            operator_key: "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
                .into(),
            chain_id: MONAD_TESTNET_CHAIN_ID,
            explorer_url: DEFAULT_EXPLORER_URL.into(),
            advisor_url: None,
            market_data_url: None,
            confirmation_timeout: None,
        }
    }

    #[test]
    fn test_client_creation() {
        let client = PortfolioContractClient::new(&test_config()).unwrap();
        assert_eq!(client.chain_id(), MONAD_TESTNET_CHAIN_ID);
        assert_eq!(
            client.operator().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_invalid_private_key() {
        let mut config = test_config();
        config.operator_key = "not-a-key".into();
        assert!(PortfolioContractClient::new(&config).is_err());
    }

    #[test]
    fn test_invalid_rpc_url() {
        let mut config = test_config();
        config.rpc_url = "not a url".into();
        assert!(PortfolioContractClient::new(&config).is_err());
    }

    #[test]
    fn test_invalid_contract_address() {
        let mut config = test_config();
        config.portfolio_address = "0x123".into();
        assert!(PortfolioContractClient::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_usdc_surface_requires_configuration() {
        let mut config = test_config();
        config.usdc_address = None;
        let client = PortfolioContractClient::new(&config).unwrap();

        let err = client.usdc_balance(client.operator()).await.unwrap_err();
        assert!(matches!(err, AllocationError::ConfigError(_)));
        assert!(matches!(
            client.claim_usdc().await.unwrap_err(),
            AllocationError::ConfigError(_)
        ));
        assert!(matches!(
            client
                .approve_usdc(client.operator(), U256::from(1u64))
                .await
                .unwrap_err(),
            AllocationError::ConfigError(_)
        ));
    }

    #[test]
    fn test_classify_send_error() {
        assert!(matches!(
            classify_send_error("MetaMask Tx Signature: User denied transaction signature"),
            WriteError::Cancelled
        ));
        assert!(matches!(
            classify_send_error("request was cancelled"),
            WriteError::Cancelled
        ));
        assert!(matches!(
            classify_send_error("insufficient funds for gas"),
            WriteError::Other(_)
        ));
    }

    #[test]
    fn test_format_tx_hash() {
        let hash = B256::from([0xab; 32]);
        let formatted = format_tx_hash(&hash);
        assert!(formatted.starts_with("0x"));
        assert_eq!(formatted.len(), 66);
    }
}
