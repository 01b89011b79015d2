//! Spot-price feed used to put a USD value next to the allocation view.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::AllocationError;
use crate::types::{TokenPrice, category_tokens};

#[derive(Debug, Clone)]
pub struct PriceFeed {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    price: f64,
    #[allow(dead_code)]
    symbol: String,
}

impl PriceFeed {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Fetch the quote for a single token symbol.
    pub async fn quote(&self, symbol: &str) -> Result<TokenPrice, AllocationError> {
        let url = format!("{}/price/{}", self.base_url.trim_end_matches('/'), symbol);
        let resp: QuoteResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| AllocationError::MarketDataUnavailable(e.to_string()))?;

        Ok(TokenPrice {
            symbol: symbol.to_string(),
            price_usd: Decimal::try_from(resp.price)
                .map_err(|e| AllocationError::MarketDataUnavailable(e.to_string()))?,
            source: self.base_url.clone(),
            timestamp: Utc::now(),
        })
    }

    /// Fetch quotes for several symbols; tokens that fail are logged and
    /// skipped.
    pub async fn quote_many(&self, symbols: &[String]) -> Vec<TokenPrice> {
        let futures: Vec<_> = symbols.iter().map(|s| self.quote(s)).collect();
        let results = futures::future::join_all(futures).await;

        let mut quotes = Vec::new();
        for (symbol, result) in symbols.iter().zip(results) {
            match result {
                Ok(quote) => quotes.push(quote),
                Err(e) => tracing::warn!(%symbol, error = %e, "price fetch failed"),
            }
        }
        quotes
    }

    /// Quotes for the representative tokens of one portfolio category.
    pub async fn category_quotes(&self, category: &str) -> Vec<TokenPrice> {
        let symbols: Vec<String> = category_tokens(category)
            .iter()
            .map(|s| s.to_string())
            .collect();
        self.quote_many(&symbols).await
    }
}
