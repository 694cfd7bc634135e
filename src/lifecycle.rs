//! Trade lifecycle manager
//!
//! Sole owner of the trade table. Every mutation goes through one of four
//! named transitions (admit / select_next / mark_executing / finalize), each
//! a single lock-guarded step with no I/O inside the critical section, so
//! the table is always consistent at suspension points.
//!
//! Invariants enforced here:
//! - trade ids are unique for the process lifetime
//! - states move strictly forward; terminal states are absorbing
//! - at most one trade is Executing at any instant
//!
//! Author: AI-Generated
//! Created: 2026-07-30
//! Modified: 2026-08-03 (history eviction + alert emission after finalize)

use crate::alerts::AlertSink;
use crate::chain::ChainClient;
use crate::error::{AdmitRejection, LifecycleError};
use crate::mev::OrderProtector;
use crate::types::{ExecutionOutcome, Opportunity, Trade, TradeState, TradeSummary};
use alloy::primitives::U256;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Completed trades kept for alert windows and the shutdown snapshot
pub const HISTORY_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Minimum net profit (after estimated gas) to admit, in wei
    pub min_profit: U256,
    /// Gas units assumed for the admission cost estimate
    pub gas_units_estimate: u64,
    pub history_capacity: usize,
}

#[derive(Default)]
struct TradeTable {
    active: HashMap<String, Trade>,
    history: VecDeque<Trade>,
    executing: Option<String>,
    seq: u64,
}

pub struct TradeLifecycleManager {
    chain: Arc<dyn ChainClient>,
    protector: Arc<OrderProtector>,
    alerts: Arc<dyn AlertSink>,
    config: LifecycleConfig,
    table: Mutex<TradeTable>,
}

impl TradeLifecycleManager {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        protector: Arc<OrderProtector>,
        alerts: Arc<dyn AlertSink>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            chain,
            protector,
            alerts,
            config,
            table: Mutex::new(TradeTable::default()),
        }
    }

    /// Admit an opportunity: net-profit gate, protection, insert as Pending.
    /// A signing failure is reported to the caller and the opportunity is
    /// dropped — it never enters the table.
    pub async fn admit(&self, opportunity: Opportunity) -> Result<String, AdmitRejection> {
        let gas_price = self.chain.get_gas_price().await?;
        let gas_cost = U256::from(gas_price.saturating_mul(self.config.gas_units_estimate as u128));

        let net = match opportunity.expected_profit.checked_sub(gas_cost) {
            Some(net) if net >= self.config.min_profit => net,
            _ => {
                let expected: u128 = opportunity.expected_profit.try_into().unwrap_or(u128::MAX);
                let cost: u128 = gas_cost.try_into().unwrap_or(u128::MAX);
                return Err(AdmitRejection::BelowMinProfit {
                    net_wei: expected as i128 - cost as i128,
                    min_wei: self.config.min_profit.try_into().unwrap_or(u128::MAX),
                });
            }
        };

        let pair = opportunity.pair.symbol.clone();
        let order = self.protector.protect(opportunity).await?;

        let mut table = self.table.lock().unwrap();
        table.seq += 1;
        let id = format!(
            "{}-{}-{}",
            pair.replace('/', "_"),
            Utc::now().timestamp_millis(),
            table.seq
        );
        table.active.insert(id.clone(), Trade::new(id.clone(), order, net));
        drop(table);

        info!("✅ Queued trade {} - estimated net profit {} wei", id, net);
        Ok(id)
    }

    /// Best pending trade: maximum estimated profit, ties broken by earliest
    /// creation. None while another trade is executing or nothing is pending.
    pub fn select_next(&self) -> Option<Trade> {
        let table = self.table.lock().unwrap();
        if table.executing.is_some() {
            return None;
        }

        let mut best: Option<&Trade> = None;
        for trade in table.active.values() {
            if trade.state != TradeState::Pending {
                continue;
            }
            let better = match best {
                None => true,
                Some(current) => {
                    trade.estimated_profit > current.estimated_profit
                        || (trade.estimated_profit == current.estimated_profit
                            && trade.created_at < current.created_at)
                }
            };
            if better {
                best = Some(trade);
            }
        }
        best.cloned()
    }

    /// Pending -> Executing, enforcing the single-flight invariant.
    pub fn mark_executing(&self, id: &str) -> Result<Trade, LifecycleError> {
        let mut table = self.table.lock().unwrap();

        if let Some(current) = &table.executing {
            return Err(LifecycleError::AlreadyExecuting(current.clone()));
        }

        let trade = table
            .active
            .get_mut(id)
            .ok_or_else(|| LifecycleError::NotFound(id.to_string()))?;

        if !trade.state.can_transition(TradeState::Executing) {
            return Err(LifecycleError::InvalidTransition {
                id: id.to_string(),
                from: trade.state,
                to: TradeState::Executing,
            });
        }

        trade.state = TradeState::Executing;
        trade.execution_started_at = Some(Utc::now());
        let snapshot = trade.clone();
        table.executing = Some(id.to_string());
        Ok(snapshot)
    }

    /// Apply a terminal outcome, move the trade into the bounded history,
    /// release the executing slot, and emit the trade alert.
    pub async fn finalize(
        &self,
        id: &str,
        outcome: ExecutionOutcome,
    ) -> Result<Trade, LifecycleError> {
        let finalized = {
            let mut table = self.table.lock().unwrap();

            let mut trade = table
                .active
                .remove(id)
                .ok_or_else(|| LifecycleError::NotFound(id.to_string()))?;

            let terminal = outcome.terminal_state();
            if !trade.state.can_transition(terminal) {
                let from = trade.state;
                table.active.insert(id.to_string(), trade);
                return Err(LifecycleError::InvalidTransition {
                    id: id.to_string(),
                    from,
                    to: terminal,
                });
            }

            trade.state = terminal;
            trade.execution_ended_at = Some(Utc::now());
            match &outcome {
                ExecutionOutcome::Confirmed { receipt, actual_profit } => {
                    trade.tx_hash = Some(receipt.tx_hash);
                    trade.actual_profit = *actual_profit;
                }
                ExecutionOutcome::Reverted { receipt } => {
                    trade.tx_hash = Some(receipt.tx_hash);
                    trade.error = Some("transaction reverted".to_string());
                }
                ExecutionOutcome::TimedOut { tx_hash } => {
                    trade.tx_hash = Some(*tx_hash);
                    trade.error = Some("confirmation timeout".to_string());
                }
                ExecutionOutcome::SubmitFailed { reason } => {
                    trade.error = Some(reason.clone());
                }
            }

            if table.executing.as_deref() == Some(id) {
                table.executing = None;
            }

            table.history.push_back(trade.clone());
            while table.history.len() > self.config.history_capacity {
                table.history.pop_front();
            }

            trade
        };

        match finalized.state {
            TradeState::Confirmed => info!(
                "Trade {} confirmed in {}ms",
                finalized.id,
                finalized.execution_duration_ms().unwrap_or(0)
            ),
            state => warn!(
                "Trade {} finalized as {}: {}",
                finalized.id,
                state,
                finalized.error.as_deref().unwrap_or("-")
            ),
        }

        self.alerts.send_trade_alert(&finalized).await;
        Ok(finalized)
    }

    pub fn pending_count(&self) -> usize {
        self.table
            .lock()
            .unwrap()
            .active
            .values()
            .filter(|t| t.state == TradeState::Pending)
            .count()
    }

    pub fn active_count(&self) -> usize {
        self.table.lock().unwrap().active.len()
    }

    pub fn executing_id(&self) -> Option<String> {
        self.table.lock().unwrap().executing.clone()
    }

    pub fn active_ids(&self) -> Vec<String> {
        self.table.lock().unwrap().active.keys().cloned().collect()
    }

    /// Most recent completed trades, oldest first, at most `limit`
    pub fn recent_history(&self, limit: usize) -> Vec<Trade> {
        let table = self.table.lock().unwrap();
        let skip = table.history.len().saturating_sub(limit);
        table.history.iter().skip(skip).cloned().collect()
    }

    pub fn history_summaries(&self, limit: usize) -> Vec<TradeSummary> {
        self.recent_history(limit)
            .iter()
            .map(TradeSummary::from)
            .collect()
    }
}
