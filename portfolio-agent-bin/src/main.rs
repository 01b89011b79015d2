//! Portfolio allocation agent.
//!
//! Hydrates the allocation store from the AutomatedPortfolio contract, logs
//! market context, and — when an advisor is configured — asks it for a
//! rebalance suggestion, seeds a draft from it, and submits the result
//! on-chain.

use std::sync::Arc;

use portfolio_runtime::advisor::AdvisorClient;
use portfolio_runtime::config::RuntimeConfig;
use portfolio_runtime::diff::diff;
use portfolio_runtime::error::AllocationError;
use portfolio_runtime::portfolio_client::PortfolioContractClient;
use portfolio_runtime::prices::PriceFeed;
use portfolio_runtime::store::AllocationStore;
use portfolio_runtime::types::default_allocations;
use portfolio_runtime::{PortfolioSession, SubmitOutcome};

fn setup_log() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};
    if tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .is_err()
    {}
}

#[tokio::main]
async fn main() -> Result<(), AllocationError> {
    setup_log();

    let config = RuntimeConfig::from_env()?;
    let client = Arc::new(PortfolioContractClient::new(&config)?);
    tracing::info!(
        operator = %client.operator(),
        chain_id = client.chain_id(),
        portfolio = %config.address_url(&config.portfolio_address),
        "portfolio agent starting"
    );

    let store = Arc::new(AllocationStore::new(default_allocations()));
    let session = {
        let session = PortfolioSession::new(store, client.clone(), client.clone(), client.clone());
        match config.confirmation_timeout {
            Some(timeout) => session.with_confirmation_timeout(timeout),
            None => session,
        }
    };

    match session.refresh().await {
        Ok(set) => {
            for allocation in set.iter() {
                tracing::info!(
                    category = %allocation.id,
                    percentage = allocation.percentage,
                    "on-chain allocation"
                );
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not read on-chain allocations, using defaults");
        }
    }

    if config.usdc_address.is_some() {
        match client.usdc_balance(client.operator()).await {
            Ok(balance) => tracing::info!(%balance, "operator USDC balance"),
            Err(e) => tracing::warn!(error = %e, "could not read USDC balance"),
        }
    }

    if let Some(market_data_url) = &config.market_data_url {
        let feed = PriceFeed::new(market_data_url.clone());
        for allocation in session.current_set().iter() {
            for quote in feed.category_quotes(&allocation.id).await {
                tracing::info!(
                    category = %allocation.id,
                    token = %quote.symbol,
                    price_usd = %quote.price_usd,
                    "market context"
                );
            }
        }
    }

    let Some(advisor_url) = &config.advisor_url else {
        tracing::info!("no advisor configured, nothing to do");
        return Ok(());
    };

    let message = std::env::var("ADVISOR_MESSAGE")
        .unwrap_or_else(|_| "Suggest a portfolio rebalance for current market conditions".into());

    let advisor = AdvisorClient::new(advisor_url.clone());
    let reply = advisor.advise(&message, &[]).await?;
    tracing::info!(content = %reply.content, "advisor reply");

    let Some(action) = reply.action else {
        tracing::info!("advisor made no actionable suggestion");
        return Ok(());
    };

    client.ensure_owner().await?;

    let seed = session.seed_draft(&action);
    for delta in diff(&seed.set, &session.current_set()) {
        tracing::info!(
            category = %delta.id,
            from = delta.from,
            to = delta.to,
            "proposed change"
        );
    }

    match session.submit_draft().await {
        Ok(SubmitOutcome::Submitted { tx_hash }) => {
            tracing::info!(explorer = %config.tx_url(&tx_hash), "allocation update confirmed");
        }
        Ok(SubmitOutcome::NoChange) => {
            tracing::info!("allocations already match the suggestion, nothing submitted");
        }
        Ok(SubmitOutcome::Cancelled) => {
            tracing::info!("update cancelled at signing, no changes were made");
        }
        Err(e) => {
            tracing::error!(error = %e, "allocation update failed");
            return Err(e);
        }
    }

    Ok(())
}
