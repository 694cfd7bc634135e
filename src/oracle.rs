//! Price oracle
//!
//! Thin read layer over the chain client. Keeps the last observed quote per
//! (pair, router) for diagnostics — bounded by the configured pair × router
//! grid, values overwritten in place.
//!
//! Author: AI-Generated
//! Created: 2026-07-29

use crate::chain::ChainClient;
use crate::error::ChainError;
use crate::types::{PriceQuote, TradingPair};
use alloy::primitives::Address;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

pub struct PriceOracle {
    chain: Arc<dyn ChainClient>,
    last_quotes: DashMap<(String, Address), PriceQuote>,
}

impl PriceOracle {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self {
            chain,
            last_quotes: DashMap::new(),
        }
    }

    /// Fetch a fresh quote and update the last-value cache.
    pub async fn fetch(
        &self,
        pair: &TradingPair,
        router: Address,
    ) -> Result<PriceQuote, ChainError> {
        let price = self.chain.get_price(pair, router).await?;

        let quote = PriceQuote {
            router,
            price,
            observed_at: Utc::now(),
        };
        self.last_quotes
            .insert((pair.symbol.clone(), router), quote.clone());

        Ok(quote)
    }

    /// Last quote observed for a pair on a router, if any
    pub fn last_quote(&self, symbol: &str, router: Address) -> Option<PriceQuote> {
        self.last_quotes
            .get(&(symbol.to_string(), router))
            .map(|entry| entry.value().clone())
    }

    pub fn cached_quote_count(&self) -> usize {
        self.last_quotes.len()
    }
}
