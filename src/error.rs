//! Error taxonomy
//!
//! Component-level errors. Each scheduling loop handles these at its own
//! boundary (skip the item, finalize the trade, or raise an alert) — none of
//! them is allowed to take a loop down.
//!
//! Author: AI-Generated
//! Created: 2026-07-28

use thiserror::Error;

/// Chain client failures (RPC transport, ABI decoding, contract calls)
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Contract call failed: {0}")]
    Contract(String),

    #[error("Response decode failed: {0}")]
    Decode(String),

    #[error("Price probe returned no output amount")]
    EmptyQuote,

    #[error("Amount out of range: {0}")]
    AmountOverflow(String),
}

/// Signer collaborator failures
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("Signer rejected request: {0}")]
    Rejected(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),
}

/// Order protection failures
#[derive(Debug, Error)]
pub enum ProtectError {
    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error("Replay hash already issued for this process: {0}")]
    ReplayHashReuse(String),

    #[error("Gas price lookup failed: {0}")]
    GasPrice(#[from] ChainError),

    #[error("Order amount conversion failed: {0}")]
    AmountConversion(String),
}

/// Admission rejections — observable reasons why an opportunity never
/// became a pending trade.
#[derive(Debug, Error)]
pub enum AdmitRejection {
    #[error("Net profit {net_wei} wei below minimum {min_wei} wei")]
    BelowMinProfit { net_wei: i128, min_wei: u128 },

    #[error(transparent)]
    Protect(#[from] ProtectError),

    #[error("Gas cost estimate failed: {0}")]
    GasEstimate(#[from] ChainError),
}

/// Trade table transition failures
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Trade not found: {0}")]
    NotFound(String),

    #[error("Another trade is already executing: {0}")]
    AlreadyExecuting(String),

    #[error("Invalid transition for trade {id}: {from:?} -> {to:?}")]
    InvalidTransition {
        id: String,
        from: crate::types::TradeState,
        to: crate::types::TradeState,
    },
}

/// Fatal configuration errors — abort startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing config field: {0}")]
    MissingField(&'static str),

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
