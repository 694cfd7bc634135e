//! Core data structures for the trade lifecycle pipeline
//!
//! Opportunity records are immutable once created; Trade records are owned
//! and mutated exclusively by the lifecycle manager — everything else gets
//! clones.
//!
//! Author: AI-Generated
//! Created: 2026-07-28
//! Modified: 2026-07-31 (execution outcome split: reverted vs timed out)

use alloy::primitives::{Address, Bytes, B256, U256};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minor units per whole token. All on-chain amounts assume 18 decimals,
/// matching the loan assets the contract supports.
pub const WEI_DECIMALS: u32 = 18;

/// Convert a whole-token Decimal amount into integer minor units.
/// Returns None on overflow or negative input.
pub fn to_wei(amount: Decimal) -> Option<U256> {
    if amount.is_sign_negative() {
        return None;
    }
    let scale = Decimal::from_i128_with_scale(10i128.pow(WEI_DECIMALS), 0);
    let scaled = amount.checked_mul(scale)?.trunc();
    scaled.to_u128().map(U256::from)
}

/// Convert integer minor units back to a whole-token Decimal.
/// Returns None if the value exceeds Decimal's 96-bit coefficient.
pub fn from_wei(amount: U256) -> Option<Decimal> {
    let v: u128 = amount.try_into().ok()?;
    if v >> 96 != 0 {
        return None;
    }
    Some(Decimal::from_i128_with_scale(v as i128, WEI_DECIMALS))
}

/// Trading pair loaded from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingPair {
    pub base: Address,
    pub quote: Address,
    pub symbol: String,
}

impl TradingPair {
    pub fn new(base: Address, quote: Address, symbol: String) -> Self {
        Self { base, quote, symbol }
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// A single router's price observation for a pair.
/// Ephemeral — kept only in the oracle's last-value cache for diagnostics.
#[derive(Debug, Clone)]
pub struct PriceQuote {
    pub router: Address,
    /// Base expressed in quote units for the fixed probe size
    pub price: Decimal,
    pub observed_at: DateTime<Utc>,
}

/// Arbitrage direction. The scanner always normalizes opportunities to
/// buy-on-the-cheaper-router / sell-on-the-dearer-router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbDirection {
    BuyLowSellHigh,
}

impl fmt::Display for ArbDirection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ArbDirection::BuyLowSellHigh => write!(f, "buy_low_sell_high"),
        }
    }
}

/// A profitable price discrepancy detected by the scanner.
/// Immutable once created; amounts are integer minor units.
#[derive(Debug, Clone)]
pub struct Opportunity {
    pub pair: TradingPair,
    pub direction: ArbDirection,
    pub buy_router: Address,
    pub sell_router: Address,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    /// Fractional spread: |p_i - p_j| / min(p_i, p_j)
    pub price_diff_percent: Decimal,
    /// Loan size in minor units
    pub trade_size: U256,
    /// Expected gross profit in minor units (always > 0 when emitted)
    pub expected_profit: U256,
    pub discovered_at: DateTime<Utc>,
}

/// An opportunity wrapped with MEV protection: unique nonce, gas ceiling,
/// deadline, EIP-712 signature, and the replay hash used as idempotency key.
#[derive(Debug, Clone)]
pub struct ProtectedOrder {
    pub opportunity: Opportunity,
    pub nonce: u64,
    /// Unix seconds at protection time
    pub timestamp: u64,
    /// Fee ceiling in wei per gas unit
    pub max_gas_price: u128,
    /// Unix seconds after which the contract rejects the order
    pub deadline: u64,
    /// 65-byte EIP-712 signature over the order message
    pub signature: Bytes,
    /// keccak256(asset, size, nonce, timestamp, executor) — never reused
    pub replay_hash: B256,
    /// Minimum acceptable output of the buy leg (slippage-adjusted)
    pub min_out_buy: U256,
    /// Minimum acceptable output of the sell leg (slippage-adjusted)
    pub min_out_sell: U256,
}

/// Trade state machine. Transitions are strictly monotonic; the three
/// terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeState {
    Discovered,
    Protected,
    Pending,
    Executing,
    Confirmed,
    Failed,
    TimedOut,
}

impl TradeState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TradeState::Confirmed | TradeState::Failed | TradeState::TimedOut
        )
    }

    /// Rank within the state machine; terminal states share the final rank.
    fn rank(&self) -> u8 {
        match self {
            TradeState::Discovered => 0,
            TradeState::Protected => 1,
            TradeState::Pending => 2,
            TradeState::Executing => 3,
            TradeState::Confirmed | TradeState::Failed | TradeState::TimedOut => 4,
        }
    }

    /// Whether `self -> to` is a legal single step forward.
    pub fn can_transition(&self, to: TradeState) -> bool {
        if self.is_terminal() {
            return false;
        }
        to.rank() == self.rank() + 1
    }
}

impl fmt::Display for TradeState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A trade owned by the lifecycle manager
#[derive(Debug, Clone)]
pub struct Trade {
    /// Unique for the process lifetime: pair symbol + creation millis + seq
    pub id: String,
    pub order: ProtectedOrder,
    pub state: TradeState,
    /// Expected profit net of the gas estimate at admission, minor units
    pub estimated_profit: U256,
    pub created_at: DateTime<Utc>,
    pub tx_hash: Option<B256>,
    pub execution_started_at: Option<DateTime<Utc>>,
    pub execution_ended_at: Option<DateTime<Utc>>,
    /// None = unknown (event not decodable), never fabricated as zero
    pub actual_profit: Option<U256>,
    pub error: Option<String>,
}

impl Trade {
    pub fn new(id: String, order: ProtectedOrder, estimated_profit: U256) -> Self {
        Self {
            id,
            order,
            state: TradeState::Pending,
            estimated_profit,
            created_at: Utc::now(),
            tx_hash: None,
            execution_started_at: None,
            execution_ended_at: None,
            actual_profit: None,
            error: None,
        }
    }

    /// Wall-clock execution duration, if the trade ran
    pub fn execution_duration_ms(&self) -> Option<i64> {
        match (self.execution_started_at, self.execution_ended_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}

/// Condensed trade record for the shutdown snapshot and alert windows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSummary {
    pub id: String,
    pub pair: String,
    pub state: TradeState,
    pub created_at: DateTime<Utc>,
    pub estimated_profit_wei: String,
    pub actual_profit_wei: Option<String>,
    pub tx_hash: Option<String>,
    pub error: Option<String>,
}

impl From<&Trade> for TradeSummary {
    fn from(trade: &Trade) -> Self {
        Self {
            id: trade.id.clone(),
            pair: trade.order.opportunity.pair.symbol.clone(),
            state: trade.state,
            created_at: trade.created_at,
            estimated_profit_wei: trade.estimated_profit.to_string(),
            actual_profit_wei: trade.actual_profit.map(|p| p.to_string()),
            tx_hash: trade.tx_hash.map(|h| format!("{h:?}")),
            error: trade.error.clone(),
        }
    }
}

/// What happened to a submitted transaction
#[derive(Debug, Clone)]
pub struct ExecutionReceipt {
    pub tx_hash: B256,
    pub confirmed: bool,
    pub gas_used: u64,
    pub effective_gas_price: u128,
    pub reverted: bool,
}

impl ExecutionReceipt {
    /// gas_used × effective_gas_price, in wei
    pub fn gas_cost(&self) -> u128 {
        self.gas_used as u128 * self.effective_gas_price
    }
}

/// Terminal result of one execution attempt, consumed once by `finalize`
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    Confirmed {
        receipt: ExecutionReceipt,
        /// Decoded from the FlashLoanExecuted event; None = unknown
        actual_profit: Option<U256>,
    },
    Reverted {
        receipt: ExecutionReceipt,
    },
    TimedOut {
        tx_hash: B256,
    },
    SubmitFailed {
        reason: String,
    },
}

impl ExecutionOutcome {
    /// Terminal state this outcome maps to
    pub fn terminal_state(&self) -> TradeState {
        match self {
            ExecutionOutcome::Confirmed { .. } => TradeState::Confirmed,
            ExecutionOutcome::Reverted { .. } | ExecutionOutcome::SubmitFailed { .. } => {
                TradeState::Failed
            }
            ExecutionOutcome::TimedOut { .. } => TradeState::TimedOut,
        }
    }
}
