//! Transaction executor
//!
//! Builds, signs, submits, and confirms one flash loan transaction at a
//! time. The call is synchronous with respect to the execution loop — the
//! loop owns the single-flight guarantee by not selecting another trade
//! until this returns a terminal outcome.
//!
//! Submission failures return without a transaction hash and are never
//! retried here; a fresh scan cycle rediscovers the economics if they still
//! hold.
//!
//! Author: AI-Generated
//! Created: 2026-07-31
//! Modified: 2026-08-03 (actual profit decoded from FlashLoanExecuted event)

use crate::chain::{ChainClient, SubmitChannel};
use crate::contracts::{IFlashLoanArbitrage, STRATEGY_ARBITRAGE};
use crate::signer::Signer;
use crate::types::{ExecutionOutcome, ExecutionReceipt, Trade};
use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{Address, Log, TxKind, U256};
use alloy::sol_types::{SolCall, SolEvent, SolValue};
use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub chain_id: u64,
    pub contract: Address,
    /// Minimum profit bound into the contract call, in wei
    pub min_profit: U256,
    pub use_private_tx: bool,
    /// Conservative fixed gas limit
    pub gas_limit: u64,
    pub receipt_poll_interval: Duration,
    pub confirmation_timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutorStats {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    pub total_gas_used: u64,
    pub total_gas_cost_wei: u128,
}

pub struct TransactionExecutor {
    chain: Arc<dyn ChainClient>,
    signer: Arc<dyn Signer>,
    config: ExecutorConfig,
    stats: Mutex<ExecutorStats>,
}

impl TransactionExecutor {
    pub fn new(chain: Arc<dyn ChainClient>, signer: Arc<dyn Signer>, config: ExecutorConfig) -> Self {
        Self {
            chain,
            signer,
            config,
            stats: Mutex::new(ExecutorStats::default()),
        }
    }

    /// Drive one trade to a terminal outcome: build, sign, submit, confirm.
    pub async fn execute(&self, trade: &Trade) -> ExecutionOutcome {
        let raw = match self.build_and_sign(trade).await {
            Ok(raw) => raw,
            Err(e) => {
                return self.record(ExecutionOutcome::SubmitFailed {
                    reason: format!("build/sign failed: {e:#}"),
                })
            }
        };

        let channel = if self.config.use_private_tx {
            SubmitChannel::Private
        } else {
            SubmitChannel::Public
        };

        let tx_hash = match self.chain.send_raw_transaction(&raw, channel).await {
            Ok(hash) => hash,
            Err(e) => {
                return self.record(ExecutionOutcome::SubmitFailed {
                    reason: format!("submission failed on {channel} channel: {e}"),
                })
            }
        };

        info!("📤 Transaction sent via {} channel: {:?}", channel, tx_hash);

        let outcome = self.await_confirmation(tx_hash).await;
        self.record(outcome)
    }

    /// Encode the executeFlashLoan call and sign an EIP-1559 envelope.
    async fn build_and_sign(&self, trade: &Trade) -> Result<Vec<u8>> {
        let order = &trade.order;
        let opp = &order.opportunity;

        let params = IFlashLoanArbitrage::FlashLoanParams {
            strategy: STRATEGY_ARBITRAGE,
            loanAsset: opp.pair.base,
            loanAmount: opp.trade_size,
            dexRouter1: opp.buy_router,
            dexRouter2: opp.sell_router,
            buyPath: vec![opp.pair.base, opp.pair.quote],
            sellPath: vec![opp.pair.quote, opp.pair.base],
            minOutBuy: order.min_out_buy,
            minOutSell: order.min_out_sell,
            minProfit: self.config.min_profit,
            profitToken: opp.pair.base,
            nonce: U256::from(order.nonce),
            deadline: U256::from(order.deadline),
            maxGasPrice: U256::from(order.max_gas_price),
        };

        let input = IFlashLoanArbitrage::executeFlashLoanCall {
            params,
            signature: order.signature.clone(),
        }
        .abi_encode();

        let sender = self.signer.address();
        let nonce = self
            .chain
            .get_transaction_count(sender)
            .await
            .context("account nonce lookup")?;
        let gas_price = self.chain.get_gas_price().await.context("gas price lookup")?;

        let mut tx = TxEip1559 {
            chain_id: self.config.chain_id,
            nonce,
            gas_limit: self.config.gas_limit,
            max_fee_per_gas: order.max_gas_price,
            max_priority_fee_per_gas: gas_price.min(order.max_gas_price),
            to: TxKind::Call(self.config.contract),
            value: U256::ZERO,
            access_list: Default::default(),
            input: input.into(),
        };

        let signature = self.signer.sign_transaction(&mut tx).await?;
        let signed: TxEnvelope = tx.into_signed(signature).into();
        Ok(signed.encoded_2718())
    }

    /// Poll for a receipt until success/revert or the confirmation timeout.
    async fn await_confirmation(&self, tx_hash: alloy::primitives::B256) -> ExecutionOutcome {
        let deadline = tokio::time::Instant::now() + self.config.confirmation_timeout;

        loop {
            match self.chain.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    let execution_receipt = ExecutionReceipt {
                        tx_hash,
                        confirmed: receipt.status,
                        gas_used: receipt.gas_used,
                        effective_gas_price: receipt.effective_gas_price,
                        reverted: !receipt.status,
                    };

                    if receipt.status {
                        info!("✅ Transaction confirmed: {:?}", tx_hash);
                        let actual_profit = decode_actual_profit(&receipt.logs);
                        if actual_profit.is_none() {
                            debug!("No decodable FlashLoanExecuted event - actual profit unknown");
                        }
                        return ExecutionOutcome::Confirmed {
                            receipt: execution_receipt,
                            actual_profit,
                        };
                    }

                    warn!("❌ Transaction reverted: {:?}", tx_hash);
                    return ExecutionOutcome::Reverted { receipt: execution_receipt };
                }
                Ok(None) => {}
                Err(e) => debug!("Waiting for receipt: {}", e),
            }

            if tokio::time::Instant::now() >= deadline {
                warn!("⏰ Confirmation timeout: {:?}", tx_hash);
                return ExecutionOutcome::TimedOut { tx_hash };
            }

            tokio::time::sleep(self.config.receipt_poll_interval).await;
        }
    }

    /// Fold the outcome into the running stats and pass it through.
    fn record(&self, outcome: ExecutionOutcome) -> ExecutionOutcome {
        let mut stats = self.stats.lock().unwrap();
        stats.total_executions += 1;
        match &outcome {
            ExecutionOutcome::Confirmed { receipt, .. } => {
                stats.successful_executions += 1;
                stats.total_gas_used += receipt.gas_used;
                stats.total_gas_cost_wei += receipt.gas_cost();
            }
            ExecutionOutcome::Reverted { receipt } => {
                stats.failed_executions += 1;
                stats.total_gas_used += receipt.gas_used;
                stats.total_gas_cost_wei += receipt.gas_cost();
            }
            ExecutionOutcome::TimedOut { .. } | ExecutionOutcome::SubmitFailed { .. } => {
                stats.failed_executions += 1;
            }
        }
        outcome
    }

    pub fn stats(&self) -> ExecutorStats {
        self.stats.lock().unwrap().clone()
    }
}

/// Extract the realized profit from the FlashLoanExecuted event, if the
/// receipt carries one. None means unknown, which callers must not collapse
/// into zero.
fn decode_actual_profit(logs: &[Log]) -> Option<U256> {
    for log in logs {
        if log.data.topics().first()
            == Some(&IFlashLoanArbitrage::FlashLoanExecuted::SIGNATURE_HASH)
        {
            if let Ok((_amount, profit)) = <(U256, U256)>::abi_decode(&log.data.data) {
                return Some(profit);
            }
        }
    }
    None
}
