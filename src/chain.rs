//! Chain client
//!
//! Read/submit access to the network behind a trait so components and tests
//! never talk to a provider directly. Two HTTP endpoints: the public node
//! for reads and confirmation polling, the private relay for MEV-protected
//! submission.
//!
//! Author: AI-Generated
//! Created: 2026-07-29

use crate::contracts::{IFlashLoanArbitrage, IUniswapV2Router02};
use crate::error::ChainError;
use crate::types::{from_wei, TradingPair, WEI_DECIMALS};
use alloy::primitives::{Address, Log, B256, U256};
use alloy::providers::{Provider, RootProvider};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::fmt;

/// Which endpoint a raw transaction goes out on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitChannel {
    Public,
    Private,
}

impl fmt::Display for SubmitChannel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SubmitChannel::Public => write!(f, "public"),
            SubmitChannel::Private => write!(f, "private"),
        }
    }
}

/// Receipt fields the executor needs, detached from provider types so mock
/// clients can fabricate them.
#[derive(Debug, Clone)]
pub struct ReceiptInfo {
    /// true = success, false = reverted
    pub status: bool,
    pub gas_used: u64,
    pub effective_gas_price: u128,
    pub logs: Vec<Log>,
}

/// External chain collaborator consumed by the pipeline
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Spot price of `pair.base` in quote units on the given router,
    /// probed with a fixed one-token input.
    async fn get_price(&self, pair: &TradingPair, router: Address) -> Result<Decimal, ChainError>;

    /// Current gas price in wei
    async fn get_gas_price(&self) -> Result<u128, ChainError>;

    async fn get_balance(&self, address: Address) -> Result<U256, ChainError>;

    async fn get_transaction_count(&self, address: Address) -> Result<u64, ChainError>;

    /// Submit a raw signed transaction. No automatic retry.
    async fn send_raw_transaction(
        &self,
        raw: &[u8],
        channel: SubmitChannel,
    ) -> Result<B256, ChainError>;

    async fn get_transaction_receipt(&self, tx_hash: B256)
        -> Result<Option<ReceiptInfo>, ChainError>;

    async fn is_connected(&self, channel: SubmitChannel) -> bool;

    async fn is_contract_paused(&self) -> Result<bool, ChainError>;
}

/// alloy-backed implementation over two HTTP providers
pub struct EvmChainClient {
    public: RootProvider,
    private: RootProvider,
    contract: Address,
}

impl EvmChainClient {
    pub fn new(public_url: &str, private_url: &str, contract: Address) -> Result<Self, ChainError> {
        let public_url = public_url
            .parse()
            .map_err(|e| ChainError::Rpc(format!("invalid public RPC url: {e}")))?;
        let private_url = private_url
            .parse()
            .map_err(|e| ChainError::Rpc(format!("invalid private RPC url: {e}")))?;

        Ok(Self {
            public: RootProvider::new_http(public_url),
            private: RootProvider::new_http(private_url),
            contract,
        })
    }

    fn provider(&self, channel: SubmitChannel) -> &RootProvider {
        match channel {
            SubmitChannel::Public => &self.public,
            SubmitChannel::Private => &self.private,
        }
    }
}

#[async_trait]
impl ChainClient for EvmChainClient {
    async fn get_price(&self, pair: &TradingPair, router: Address) -> Result<Decimal, ChainError> {
        let probe = U256::from(10u128.pow(WEI_DECIMALS));
        let router = IUniswapV2Router02::new(router, &self.public);

        let amounts = router
            .getAmountsOut(probe, vec![pair.base, pair.quote])
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))?;

        let out = amounts.get(1).copied().ok_or(ChainError::EmptyQuote)?;
        if out.is_zero() {
            return Err(ChainError::EmptyQuote);
        }

        from_wei(out).ok_or_else(|| ChainError::AmountOverflow(out.to_string()))
    }

    async fn get_gas_price(&self) -> Result<u128, ChainError> {
        self.public
            .get_gas_price()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn get_balance(&self, address: Address) -> Result<U256, ChainError> {
        self.public
            .get_balance(address)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64, ChainError> {
        self.public
            .get_transaction_count(address)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn send_raw_transaction(
        &self,
        raw: &[u8],
        channel: SubmitChannel,
    ) -> Result<B256, ChainError> {
        let pending = self
            .provider(channel)
            .send_raw_transaction(raw)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(*pending.tx_hash())
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: B256,
    ) -> Result<Option<ReceiptInfo>, ChainError> {
        let receipt = self
            .public
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        Ok(receipt.map(|r| ReceiptInfo {
            status: r.status(),
            gas_used: r.gas_used,
            effective_gas_price: r.effective_gas_price,
            logs: r.inner.logs().iter().map(|l| l.inner.clone()).collect(),
        }))
    }

    async fn is_connected(&self, channel: SubmitChannel) -> bool {
        self.provider(channel).get_block_number().await.is_ok()
    }

    async fn is_contract_paused(&self) -> Result<bool, ChainError> {
        IFlashLoanArbitrage::new(self.contract, &self.public)
            .paused()
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))
    }
}
