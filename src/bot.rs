//! Bot orchestration
//!
//! Wires the pipeline together and runs the four scheduling loops:
//! scanning, execution, monitoring, health check. Loops interleave only at
//! await points and share the trade table through the lifecycle manager's
//! named transitions.
//!
//! Shutdown is an explicit cancellation context (watch channel) checked at
//! iteration boundaries: no new iterations start, but an in-flight
//! execution runs to its own terminal state or confirmation timeout first.
//!
//! Author: AI-Generated
//! Created: 2026-08-01
//! Modified: 2026-08-04 (statistics banner cadence)

use crate::alerts::AlertSink;
use crate::chain::{ChainClient, SubmitChannel};
use crate::config::BotConfig;
use crate::error::AdmitRejection;
use crate::executor::{ExecutorConfig, TransactionExecutor};
use crate::lifecycle::{LifecycleConfig, TradeLifecycleManager, HISTORY_CAPACITY};
use crate::metrics::MetricsRegistry;
use crate::mev::{OrderProtector, ProtectorConfig};
use crate::oracle::PriceOracle;
use crate::scanner::{OpportunityScanner, ScannerConfig};
use crate::signer::Signer;
use crate::snapshot::BotSnapshot;
use crate::types::{ExecutionOutcome, TradeState};
use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Execution loop poll cadence
const EXECUTION_POLL: Duration = Duration::from_millis(100);
/// Monitoring loop cadence
const MONITORING_INTERVAL: Duration = Duration::from_secs(30);
/// Health-check loop cadence
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(60);
/// Backoff after an unexpected execution-loop failure
const EXECUTION_ERROR_BACKOFF: Duration = Duration::from_secs(1);
/// History window for the high-profit alert
const PROFIT_ALERT_WINDOW: usize = 10;
/// History window for the consecutive-failure alert
const FAILURE_ALERT_WINDOW: usize = 5;

pub struct ArbBot {
    config: BotConfig,
    chain: Arc<dyn ChainClient>,
    executor_address: Address,
    scanner: Arc<OpportunityScanner>,
    lifecycle: Arc<TradeLifecycleManager>,
    executor: Arc<TransactionExecutor>,
    alerts: Arc<dyn AlertSink>,
    metrics: Arc<MetricsRegistry>,
}

impl ArbBot {
    pub fn new(
        config: BotConfig,
        chain: Arc<dyn ChainClient>,
        signer: Arc<dyn Signer>,
        alerts: Arc<dyn AlertSink>,
    ) -> Result<Self> {
        let min_profit = U256::from(config.trading.min_profit_wei);
        let max_slippage = Decimal::from_f64(config.trading.max_slippage_percent)
            .context("max_slippage_percent is not representable")?
            / Decimal::from(100);

        let oracle = Arc::new(PriceOracle::new(Arc::clone(&chain)));
        let scanner = Arc::new(OpportunityScanner::new(
            oracle,
            ScannerConfig::from_trading(&config.trading)?,
        ));

        let protector = Arc::new(OrderProtector::new(
            Arc::clone(&chain),
            Arc::clone(&signer),
            ProtectorConfig {
                chain_id: config.contract.chain_id,
                contract: config.contract.address,
                max_gas_price_absolute: config.mev.max_gas_price_wei(),
                min_profit,
                max_slippage,
            },
        ));

        let lifecycle = Arc::new(TradeLifecycleManager::new(
            Arc::clone(&chain),
            protector,
            Arc::clone(&alerts),
            LifecycleConfig {
                min_profit,
                gas_units_estimate: config.execution.gas_units_estimate,
                history_capacity: HISTORY_CAPACITY,
            },
        ));

        let executor = Arc::new(TransactionExecutor::new(
            Arc::clone(&chain),
            Arc::clone(&signer),
            ExecutorConfig {
                chain_id: config.contract.chain_id,
                contract: config.contract.address,
                min_profit,
                use_private_tx: config.execution.use_private_tx,
                gas_limit: config.execution.gas_limit,
                receipt_poll_interval: config.execution.receipt_poll_interval(),
                confirmation_timeout: config.execution.confirmation_timeout(),
            },
        ));

        Ok(Self {
            executor_address: signer.address(),
            config,
            chain,
            scanner,
            lifecycle,
            executor,
            alerts,
            metrics: Arc::new(MetricsRegistry::new()),
        })
    }

    /// Run all four loops until the shutdown signal flips, then persist the
    /// state snapshot.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        info!("🚀 Starting Flash Loan Arbitrage Bot...");
        info!("📋 Contract: {}", self.config.contract.address);
        info!("⚡ Executor: {}", self.executor_address);
        info!("Trading pairs: {}", self.config.trading.pairs.len());
        info!("Routers: {}", self.config.trading.enabled_routers.len());
        info!(
            "Check interval: {}s | private tx: {}",
            self.config.trading.check_interval_secs, self.config.execution.use_private_tx
        );

        tokio::join!(
            self.scanning_loop(shutdown.clone()),
            self.execution_loop(shutdown.clone()),
            self.monitoring_loop(shutdown.clone()),
            self.health_check_loop(shutdown),
        );

        self.save_snapshot();
        info!("🛑 Flash Loan Arbitrage Bot stopped");
    }

    /// Scan pairs on the configured cadence and admit what qualifies.
    async fn scanning_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(Duration::from_secs(self.config.trading.check_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    let started = Instant::now();
                    let report = self.scanner.scan().await;
                    self.metrics.record_scan(started.elapsed(), report.opportunities.len());

                    for failure in &report.router_failures {
                        debug!(
                            "Router {} excluded for {} this cycle: {}",
                            failure.router, failure.pair, failure.error
                        );
                    }
                    for skip in &report.skips {
                        debug!("Pair {} skipped: {:?}", skip.pair, skip.reason);
                    }

                    if !report.opportunities.is_empty() {
                        info!("🔍 Found {} opportunities", report.opportunities.len());
                    }

                    for opportunity in report.opportunities {
                        let pair = opportunity.pair.symbol.clone();
                        match self.lifecycle.admit(opportunity).await {
                            Ok(id) => debug!("Admitted {} as {}", pair, id),
                            Err(AdmitRejection::BelowMinProfit { net_wei, min_wei }) => {
                                debug!(
                                    "{}: net profit {} wei below minimum {} wei",
                                    pair, net_wei, min_wei
                                );
                            }
                            Err(e) => warn!("Opportunity for {} dropped: {}", pair, e),
                        }
                    }
                }
            }
        }
        debug!("Scanning loop stopped");
    }

    /// Drive the best pending trade to a terminal state, one at a time.
    async fn execution_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(EXECUTION_POLL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    let Some(selected) = self.lifecycle.select_next() else {
                        continue;
                    };

                    let trade = match self.lifecycle.mark_executing(&selected.id) {
                        Ok(trade) => trade,
                        Err(e) => {
                            // Lost a race with another transition; settle down
                            warn!("Could not start {}: {}", selected.id, e);
                            tokio::time::sleep(EXECUTION_ERROR_BACKOFF).await;
                            continue;
                        }
                    };

                    info!(
                        "🚀 Executing trade {} (estimated net profit {} wei)",
                        trade.id, trade.estimated_profit
                    );

                    let started = Instant::now();
                    let outcome = self.executor.execute(&trade).await;

                    let (success, profit_wei, gas_cost_wei) = match &outcome {
                        ExecutionOutcome::Confirmed { receipt, actual_profit } => (
                            true,
                            actual_profit.and_then(|p| p.try_into().ok()),
                            receipt.gas_cost(),
                        ),
                        ExecutionOutcome::Reverted { receipt } => (false, None, receipt.gas_cost()),
                        _ => (false, None, 0),
                    };

                    if let Err(e) = self.lifecycle.finalize(&trade.id, outcome).await {
                        error!("Failed to finalize {}: {}", trade.id, e);
                        tokio::time::sleep(EXECUTION_ERROR_BACKOFF).await;
                    }
                    self.metrics
                        .record_execution(started.elapsed(), success, profit_wei, gas_cost_wei);
                }
            }
        }
        debug!("Execution loop stopped");
    }

    /// Refresh gauges, evaluate alert windows, log the statistics banner.
    async fn monitoring_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(MONITORING_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_logged_trades = 0u64;

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    self.metrics.set_active_trades(self.lifecycle.active_count());
                    self.check_alert_windows().await;

                    let executed = self.metrics.trades_executed();
                    let every = self.config.monitoring.stats_log_every_trades.max(1);
                    if executed > last_logged_trades && executed % every == 0 {
                        self.metrics.log_statistics();
                        last_logged_trades = executed;
                    }
                }
            }
        }
        debug!("Monitoring loop stopped");
    }

    /// Profit and consecutive-failure alerts over the recent history.
    async fn check_alert_windows(&self) {
        let recent = self.lifecycle.recent_history(PROFIT_ALERT_WINDOW);
        let successes: Vec<_> = recent
            .iter()
            .filter(|t| t.state == TradeState::Confirmed)
            .collect();

        if !successes.is_empty() {
            let total_profit = successes
                .iter()
                .filter_map(|t| t.actual_profit)
                .fold(U256::ZERO, |acc, p| acc + p);
            if total_profit > U256::from(self.config.alerts.high_profit_threshold_wei) {
                self.alerts
                    .send_profit_alert(total_profit, successes.len())
                    .await;
            }
        }

        let failures = self
            .lifecycle
            .recent_history(FAILURE_ALERT_WINDOW)
            .iter()
            .filter(|t| matches!(t.state, TradeState::Failed | TradeState::TimedOut))
            .count();
        if failures >= self.config.alerts.failure_alert_threshold {
            self.alerts.send_failure_alert(failures).await;
        }
    }

    /// RPC connectivity, executor balance, and contract pause checks.
    async fn health_check_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(HEALTH_CHECK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => self.health_check_once().await,
            }
        }
        debug!("Health check loop stopped");
    }

    /// One health-check pass. Degradations raise system alerts; scanning and
    /// execution keep running and fail per-trade until the condition clears.
    async fn health_check_once(&self) {
        if !self.chain.is_connected(SubmitChannel::Public).await {
            error!("⚠️ Public RPC connection lost");
            self.alerts.send_system_alert("Public RPC disconnected").await;
        }
        if !self.chain.is_connected(SubmitChannel::Private).await {
            error!("⚠️ Private RPC connection lost");
            self.alerts.send_system_alert("Private RPC disconnected").await;
        }

        match self.chain.get_balance(self.executor_address).await {
            Ok(balance) => {
                let minimum = U256::from(self.config.trading.min_executor_balance_wei);
                if balance < minimum {
                    warn!("⚠️ Low executor balance: {} wei", balance);
                    self.alerts
                        .send_system_alert(&format!("Low executor balance: {balance} wei"))
                        .await;
                }
            }
            Err(e) => warn!("Balance check failed: {}", e),
        }

        match self.chain.is_contract_paused().await {
            Ok(true) => {
                warn!("⚠️ Contract is paused");
                self.alerts.send_system_alert("Contract is paused").await;
            }
            Ok(false) => {}
            Err(e) => warn!("Contract check failed: {}", e),
        }
    }

    fn save_snapshot(&self) {
        let snapshot = BotSnapshot::new(
            self.metrics.snapshot(),
            self.lifecycle.history_summaries(HISTORY_CAPACITY),
            self.lifecycle.active_ids(),
        );

        match snapshot.write_to_file(&self.config.monitoring.snapshot_path) {
            Ok(()) => info!("💾 Bot state saved to {}", self.config.monitoring.snapshot_path),
            Err(e) => error!("Error saving bot state: {:#}", e),
        }
    }

    pub fn metrics(&self) -> Arc<MetricsRegistry> {
        Arc::clone(&self.metrics)
    }
}
