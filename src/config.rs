//! Configuration management
//!
//! TOML configuration with validation at startup. Missing required fields
//! abort the process; everything tunable has a conservative default.
//! The executor key can be supplied via the EXECUTOR_PRIVATE_KEY environment
//! variable (loaded through dotenv) instead of the config file.
//!
//! Author: AI-Generated
//! Created: 2026-07-28
//! Modified: 2026-08-01 (alert thresholds, snapshot path)

use crate::error::ConfigError;
use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Top-level bot configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub rpc: RpcConfig,
    #[serde(default)]
    pub keys: KeysConfig,
    pub contract: ContractConfig,
    pub trading: TradingConfig,
    #[serde(default)]
    pub mev: MevConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// RPC endpoints: the public node for reads and the private relay for
/// MEV-protected submission.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    pub public_url: String,
    pub private_url: String,
}

/// Key material. Prefer EXECUTOR_PRIVATE_KEY in the environment over
/// committing a key to the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeysConfig {
    #[serde(default)]
    pub executor: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractConfig {
    /// Flash loan arbitrage contract address
    pub address: Address,
    pub chain_id: u64,
}

/// A configured trading pair
#[derive(Debug, Clone, Deserialize)]
pub struct TradingPairConfig {
    pub base: Address,
    pub quote: Address,
    pub symbol: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    pub pairs: Vec<TradingPairConfig>,
    pub enabled_routers: Vec<Address>,
    /// Minimum fractional spread to consider (e.g. 0.02 = 2%)
    #[serde(default = "default_min_price_diff")]
    pub min_price_diff_percent: f64,
    /// Loan size in whole tokens
    #[serde(default = "default_trade_size")]
    pub default_trade_size: f64,
    /// Per-swap DEX fee as a fraction (0.003 = 0.30%)
    #[serde(default = "default_dex_fee")]
    pub dex_fee_percent: f64,
    /// Minimum net profit (after estimated gas) to admit a trade, in wei
    pub min_profit_wei: u128,
    /// Slippage tolerance in percent applied to minimum leg outputs
    pub max_slippage_percent: f64,
    pub check_interval_secs: u64,
    #[serde(default = "default_min_executor_balance")]
    pub min_executor_balance_wei: u128,
}

fn default_min_price_diff() -> f64 { 0.01 }
fn default_trade_size() -> f64 { 1000.0 }
fn default_dex_fee() -> f64 { 0.003 }
fn default_min_executor_balance() -> u128 { 100_000_000_000_000_000 } // 0.1 native

/// MEV protection parameters
#[derive(Debug, Clone, Deserialize)]
pub struct MevConfig {
    /// Absolute gas price ceiling in gwei
    #[serde(default = "default_max_gas_gwei")]
    pub max_gas_price_gwei: u64,
}

fn default_max_gas_gwei() -> u64 { 500 }

impl Default for MevConfig {
    fn default() -> Self {
        Self { max_gas_price_gwei: default_max_gas_gwei() }
    }
}

impl MevConfig {
    pub fn max_gas_price_wei(&self) -> u128 {
        self.max_gas_price_gwei as u128 * 1_000_000_000
    }
}

/// Execution parameters
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_true")]
    pub use_private_tx: bool,
    /// Conservative fixed gas limit for the flash loan transaction
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    /// Gas units assumed when estimating cost at admission time
    #[serde(default = "default_gas_units_estimate")]
    pub gas_units_estimate: u64,
    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_interval_ms: u64,
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,
}

fn default_true() -> bool { true }
fn default_gas_limit() -> u64 { 1_000_000 }
fn default_gas_units_estimate() -> u64 { 500_000 }
fn default_receipt_poll_ms() -> u64 { 500 }
fn default_confirmation_timeout() -> u64 { 120 }

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            use_private_tx: true,
            gas_limit: default_gas_limit(),
            gas_units_estimate: default_gas_units_estimate(),
            receipt_poll_interval_ms: default_receipt_poll_ms(),
            confirmation_timeout_secs: default_confirmation_timeout(),
        }
    }
}

impl ExecutionConfig {
    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}

/// Alert channel configuration. Channels without credentials stay disabled.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
    pub webhook_url: Option<String>,
    pub telegram: Option<TelegramConfig>,
    /// High-profit alert threshold over the recent success window, in wei
    #[serde(default = "default_high_profit_threshold")]
    pub high_profit_threshold_wei: u128,
    /// Consecutive-failure alert threshold over the recent window
    #[serde(default = "default_failure_threshold")]
    pub failure_alert_threshold: usize,
}

fn default_high_profit_threshold() -> u128 { 1_000_000_000_000_000_000 } // 1 token
fn default_failure_threshold() -> usize { 3 }

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            telegram: None,
            high_profit_threshold_wei: default_high_profit_threshold(),
            failure_alert_threshold: default_failure_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
    /// Log the statistics banner every N executed trades
    #[serde(default = "default_stats_log_every")]
    pub stats_log_every_trades: u64,
}

fn default_snapshot_path() -> String { "logs/bot_state.json".to_string() }
fn default_stats_log_every() -> u64 { 10 }

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            stats_log_every_trades: default_stats_log_every(),
        }
    }
}

impl BotConfig {
    /// Load and validate configuration from a TOML file.
    /// EXECUTOR_PRIVATE_KEY in the environment overrides `keys.executor`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: Self =
            toml::from_str(&content).context("Failed to parse TOML configuration")?;

        if let Ok(key) = std::env::var("EXECUTOR_PRIVATE_KEY") {
            config.keys.executor = key;
        }

        config.validate()?;
        Ok(config)
    }

    /// Startup validation. Any failure here is fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc.public_url.is_empty() {
            return Err(ConfigError::MissingField("rpc.public_url"));
        }
        if self.rpc.private_url.is_empty() {
            return Err(ConfigError::MissingField("rpc.private_url"));
        }
        if self.keys.executor.is_empty() {
            return Err(ConfigError::MissingField(
                "keys.executor (or EXECUTOR_PRIVATE_KEY)",
            ));
        }
        if self.trading.pairs.is_empty() {
            return Err(ConfigError::MissingField("trading.pairs"));
        }
        if self.trading.enabled_routers.len() < 2 {
            return Err(ConfigError::InvalidValue {
                field: "trading.enabled_routers",
                reason: "at least two routers are required for spread comparison".to_string(),
            });
        }
        if self.trading.default_trade_size <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "trading.default_trade_size",
                reason: "must be positive".to_string(),
            });
        }
        if !(0.0..1.0).contains(&self.trading.dex_fee_percent) {
            return Err(ConfigError::InvalidValue {
                field: "trading.dex_fee_percent",
                reason: "must be a fraction in [0, 1)".to_string(),
            });
        }
        if self.trading.min_price_diff_percent <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "trading.min_price_diff_percent",
                reason: "must be positive".to_string(),
            });
        }
        if !(0.0..100.0).contains(&self.trading.max_slippage_percent) {
            return Err(ConfigError::InvalidValue {
                field: "trading.max_slippage_percent",
                reason: "must be a percentage in [0, 100)".to_string(),
            });
        }
        if self.trading.check_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "trading.check_interval_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.mev.max_gas_price_gwei == 0 {
            return Err(ConfigError::InvalidValue {
                field: "mev.max_gas_price_gwei",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [rpc]
        public_url = "https://polygon-rpc.example"
        private_url = "https://private-relay.example"

        [keys]
        executor = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

        [contract]
        address = "0x1111111111111111111111111111111111111111"
        chain_id = 137

        [trading]
        pairs = [
            { base = "0x2222222222222222222222222222222222222222", quote = "0x3333333333333333333333333333333333333333", symbol = "WMATIC/USDC" },
        ]
        enabled_routers = [
            "0x4444444444444444444444444444444444444444",
            "0x5555555555555555555555555555555555555555",
        ]
        min_profit_wei = 1000000000000000000
        max_slippage_percent = 0.5
        check_interval_secs = 5
    "#;

    #[test]
    fn test_parse_and_defaults() {
        let config: BotConfig = toml::from_str(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.contract.chain_id, 137);
        assert_eq!(config.trading.pairs.len(), 1);
        // Defaults kick in for everything unspecified
        assert_eq!(config.trading.dex_fee_percent, 0.003);
        assert!(config.execution.use_private_tx);
        assert_eq!(config.execution.confirmation_timeout_secs, 120);
        assert_eq!(config.mev.max_gas_price_gwei, 500);
        assert_eq!(config.mev.max_gas_price_wei(), 500_000_000_000);
        // A missing [alerts] section must not zero the thresholds
        assert_eq!(config.alerts.failure_alert_threshold, 3);
        assert_eq!(config.alerts.high_profit_threshold_wei, 1_000_000_000_000_000_000);
    }

    #[test]
    fn test_validate_requires_two_routers() {
        let mut config: BotConfig = toml::from_str(SAMPLE).unwrap();
        config.trading.enabled_routers.truncate(1);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "trading.enabled_routers", .. })
        ));
    }

    #[test]
    fn test_validate_requires_pairs() {
        let mut config: BotConfig = toml::from_str(SAMPLE).unwrap();
        config.trading.pairs.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField("trading.pairs"))
        ));
    }

    #[test]
    fn test_validate_requires_key() {
        let mut config: BotConfig = toml::from_str(SAMPLE).unwrap();
        config.keys.executor.clear();
        assert!(config.validate().is_err());
    }
}
