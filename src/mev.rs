//! MEV protection
//!
//! Turns a raw opportunity into a signed, replay-protected order: unique
//! nonce, gas-price ceiling, execution deadline, EIP-712 signature, and a
//! replay hash the contract (and this process) use to reject duplicates.
//!
//! The nonce is probabilistic (keccak of pair + nanosecond timestamp,
//! truncated to 64 bits). A collision is detectable — the replay guard or
//! the contract rejects it — and the next scan cycle simply rebuilds the
//! order, so collision-freedom is not assumed.
//!
//! Author: AI-Generated
//! Created: 2026-07-30
//! Modified: 2026-08-02 (issued replay hashes guarded for process lifetime)

use crate::chain::ChainClient;
use crate::contracts::{ExecuteFlashLoan, STRATEGY_ARBITRAGE};
use crate::error::ProtectError;
use crate::signer::Signer;
use crate::types::{from_wei, to_wei, Opportunity, ProtectedOrder};
use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::sol_types::{Eip712Domain, SolStruct, SolValue};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Order validity window
const ORDER_DEADLINE_SECS: u64 = 300;

/// EIP-712 domain constants — must match the deployed contract
const DOMAIN_NAME: &str = "FlashLoanArbitrage";
const DOMAIN_VERSION: &str = "1.0.0";

#[derive(Debug, Clone)]
pub struct ProtectorConfig {
    pub chain_id: u64,
    /// Verifying contract for the EIP-712 domain
    pub contract: Address,
    /// Absolute gas price ceiling in wei
    pub max_gas_price_absolute: u128,
    /// Minimum profit bound into the signed message, in wei
    pub min_profit: U256,
    /// Slippage tolerance as a fraction applied to minimum leg outputs
    pub max_slippage: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct ProtectorStats {
    pub protected_orders: u64,
}

pub struct OrderProtector {
    chain: Arc<dyn ChainClient>,
    signer: Arc<dyn Signer>,
    config: ProtectorConfig,
    issued_hashes: Mutex<HashSet<B256>>,
    stats: Mutex<ProtectorStats>,
}

impl OrderProtector {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        signer: Arc<dyn Signer>,
        config: ProtectorConfig,
    ) -> Self {
        Self {
            chain,
            signer,
            config,
            issued_hashes: Mutex::new(HashSet::new()),
            stats: Mutex::new(ProtectorStats::default()),
        }
    }

    /// Wrap an opportunity with MEV protection and sign it.
    pub async fn protect(&self, opportunity: Opportunity) -> Result<ProtectedOrder, ProtectError> {
        let nonce = unique_nonce(&opportunity);
        let timestamp = Utc::now().timestamp() as u64;
        let max_gas_price = self.gas_ceiling().await?;
        let deadline = timestamp + ORDER_DEADLINE_SECS;

        let (min_out_buy, min_out_sell) = self.min_outputs(&opportunity)?;

        let message = ExecuteFlashLoan {
            strategy: STRATEGY_ARBITRAGE,
            loanAsset: opportunity.pair.base,
            loanAmount: opportunity.trade_size,
            dexRouter1: opportunity.buy_router,
            dexRouter2: opportunity.sell_router,
            buyPathHash: path_hash(&[opportunity.pair.base, opportunity.pair.quote]),
            sellPathHash: path_hash(&[opportunity.pair.quote, opportunity.pair.base]),
            minOutBuy: min_out_buy,
            minOutSell: min_out_sell,
            minProfit: self.config.min_profit,
            profitToken: opportunity.pair.base,
            nonce: U256::from(nonce),
            deadline: U256::from(deadline),
            maxGasPrice: U256::from(max_gas_price),
        };

        let domain = self.domain();
        let digest = message.eip712_signing_hash(&domain);
        let signature = self.signer.sign_order_digest(digest).await?;

        let replay_hash = replay_hash(
            opportunity.pair.base,
            opportunity.trade_size,
            nonce,
            timestamp,
            self.signer.address(),
        );
        self.claim_replay_hash(replay_hash)?;

        self.stats.lock().unwrap().protected_orders += 1;
        debug!(
            "Protected order for {}: nonce={}, max_gas={} wei, deadline={}",
            opportunity.pair, nonce, max_gas_price, deadline
        );

        Ok(ProtectedOrder {
            opportunity,
            nonce,
            timestamp,
            max_gas_price,
            deadline,
            signature: Bytes::copy_from_slice(&signature.as_bytes()),
            replay_hash,
            min_out_buy,
            min_out_sell,
        })
    }

    /// min(current * 1.2, absolute ceiling)
    async fn gas_ceiling(&self) -> Result<u128, ProtectError> {
        let current = self.chain.get_gas_price().await?;
        let padded = current.saturating_mul(12) / 10;
        Ok(padded.min(self.config.max_gas_price_absolute))
    }

    /// Slippage-adjusted minimum outputs for both legs, in minor units.
    /// Buy leg: base -> quote at the buy price. Sell leg: quote -> base,
    /// round trip at sell/buy.
    fn min_outputs(&self, opp: &Opportunity) -> Result<(U256, U256), ProtectError> {
        let size = from_wei(opp.trade_size).ok_or_else(|| {
            ProtectError::AmountConversion(format!("trade size {}", opp.trade_size))
        })?;
        let tolerance = Decimal::ONE - self.config.max_slippage;

        let expected_buy = size * opp.buy_price;
        let expected_sell = size * opp.sell_price / opp.buy_price;

        let min_buy = to_wei(expected_buy * tolerance)
            .ok_or_else(|| ProtectError::AmountConversion("buy leg output".to_string()))?;
        let min_sell = to_wei(expected_sell * tolerance)
            .ok_or_else(|| ProtectError::AmountConversion("sell leg output".to_string()))?;

        Ok((min_buy, min_sell))
    }

    /// Record the hash as issued, failing if it was seen before.
    fn claim_replay_hash(&self, hash: B256) -> Result<(), ProtectError> {
        let mut issued = self.issued_hashes.lock().unwrap();
        if !issued.insert(hash) {
            return Err(ProtectError::ReplayHashReuse(format!("{hash:?}")));
        }
        Ok(())
    }

    fn domain(&self) -> Eip712Domain {
        Eip712Domain::new(
            Some(DOMAIN_NAME.into()),
            Some(DOMAIN_VERSION.into()),
            Some(U256::from(self.config.chain_id)),
            Some(self.config.contract),
            None,
        )
    }

    pub fn stats(&self) -> ProtectorStats {
        self.stats.lock().unwrap().clone()
    }
}

/// 64-bit nonce from a keccak over the pair and a nanosecond timestamp.
fn unique_nonce(opportunity: &Opportunity) -> u64 {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let seed = format!(
        "{}{}{}",
        opportunity.pair.base, opportunity.pair.quote, nanos
    );
    let hash = keccak256(seed.as_bytes());
    u64::from_be_bytes(hash[..8].try_into().expect("keccak output is 32 bytes"))
}

/// Deterministic order fingerprint used to detect duplicate submission.
fn replay_hash(asset: Address, size: U256, nonce: u64, timestamp: u64, submitter: Address) -> B256 {
    keccak256((asset, size, nonce, timestamp, submitter).abi_encode())
}

fn path_hash(path: &[Address]) -> B256 {
    keccak256(path.to_vec().abi_encode())
}
