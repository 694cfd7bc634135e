//! Flash Loan Arbitrage Bot Library
//!
//! Trade lifecycle pipeline: opportunity scanning, MEV-aware protection
//! and signing, serialized on-chain execution, confirmation tracking.
//!
//! Author: AI-Generated
//! Created: 2026-07-28

pub mod alerts;
pub mod bot;
pub mod chain;
pub mod config;
pub mod contracts;
pub mod error;
pub mod executor;
pub mod lifecycle;
pub mod metrics;
pub mod mev;
pub mod oracle;
pub mod scanner;
pub mod signer;
pub mod snapshot;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export commonly used types
pub use bot::ArbBot;
pub use config::BotConfig;
pub use types::{ExecutionOutcome, Opportunity, ProtectedOrder, Trade, TradeState};
