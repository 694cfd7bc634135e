//! Alert delivery
//!
//! Webhook notifications for trade outcomes and system health. Channels
//! without credentials stay disabled; delivery failures are logged and
//! swallowed — alerting must never take a loop down.
//!
//! Author: AI-Generated
//! Created: 2026-07-30

use crate::config::AlertsConfig;
use crate::types::{from_wei, Trade, TradeState};
use alloy::primitives::U256;
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

/// Alert severity, mapped to embed colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Success,
    Error,
    Warning,
    Critical,
    Info,
}

impl AlertLevel {
    fn color(&self) -> u32 {
        match self {
            AlertLevel::Success => 0x00ff00,
            AlertLevel::Error | AlertLevel::Critical => 0xff0000,
            AlertLevel::Warning => 0xffa500,
            AlertLevel::Info => 0x0080ff,
        }
    }
}

/// Alert collaborator produced-to by the lifecycle manager and the
/// monitoring/health loops.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send_trade_alert(&self, trade: &Trade);
    async fn send_profit_alert(&self, total_profit: U256, trade_count: usize);
    async fn send_failure_alert(&self, failure_count: usize);
    async fn send_system_alert(&self, message: &str);
}

/// Webhook message structures (Discord-compatible embeds)
#[derive(Serialize)]
struct WebhookMessage {
    embeds: Vec<WebhookEmbed>,
}

#[derive(Serialize)]
struct WebhookEmbed {
    title: String,
    description: String,
    color: u32,
    timestamp: String,
}

/// Webhook + optional Telegram alert delivery
pub struct WebhookAlerter {
    config: AlertsConfig,
    client: reqwest::Client,
}

impl WebhookAlerter {
    pub fn new(config: AlertsConfig) -> Self {
        if config.webhook_url.is_some() {
            info!("Webhook alerts enabled");
        } else {
            warn!("No webhook_url configured - webhook alerts disabled");
        }
        if config.telegram.is_some() {
            info!("Telegram alerts enabled");
        }

        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn format_trade_alert(trade: &Trade) -> String {
        let tx = trade
            .tx_hash
            .map(|h| {
                let s = format!("{h:?}");
                format!("{}...", &s[..20.min(s.len())])
            })
            .unwrap_or_else(|| "N/A".to_string());

        if trade.state == TradeState::Confirmed {
            let profit = trade
                .actual_profit
                .and_then(from_wei)
                .map(|p| format!("{p:.4}"))
                .unwrap_or_else(|| "unknown".to_string());
            format!(
                "Trade {} SUCCESSFUL\nProfit: {} MATIC\nExecution time: {}ms\nTX: {}",
                trade.id,
                profit,
                trade.execution_duration_ms().unwrap_or(0),
                tx,
            )
        } else {
            format!(
                "Trade {} {}\nError: {}\nTX: {}",
                trade.id,
                trade.state,
                trade.error.as_deref().unwrap_or("Unknown"),
                tx,
            )
        }
    }

    async fn dispatch(&self, message: &str, level: AlertLevel) {
        if let Some(url) = &self.config.webhook_url {
            self.send_webhook(url, message, level).await;
        }
        if let Some(telegram) = &self.config.telegram {
            self.send_telegram(&telegram.token, &telegram.chat_id, message)
                .await;
        }
        info!("ALERT: {}", message);
    }

    async fn send_webhook(&self, url: &str, message: &str, level: AlertLevel) {
        let payload = WebhookMessage {
            embeds: vec![WebhookEmbed {
                title: "Flash Loan Bot Alert".to_string(),
                description: message.to_string(),
                color: level.color(),
                timestamp: Utc::now().to_rfc3339(),
            }],
        };

        match self.client.post(url).json(&payload).send().await {
            Ok(response) if !response.status().is_success() => {
                error!("Webhook alert rejected: HTTP {}", response.status());
            }
            Err(e) => error!("Webhook alert failed: {}", e),
            _ => {}
        }
    }

    async fn send_telegram(&self, token: &str, chat_id: &str, message: &str) {
        let url = format!("https://api.telegram.org/bot{token}/sendMessage");
        let payload = serde_json::json!({
            "chat_id": chat_id,
            "text": message,
        });

        if let Err(e) = self.client.post(&url).json(&payload).send().await {
            error!("Telegram alert failed: {}", e);
        }
    }
}

#[async_trait]
impl AlertSink for WebhookAlerter {
    async fn send_trade_alert(&self, trade: &Trade) {
        let message = Self::format_trade_alert(trade);
        let level = if trade.state == TradeState::Confirmed {
            AlertLevel::Success
        } else {
            AlertLevel::Error
        };
        let prefix = if trade.state == TradeState::Confirmed { "✅" } else { "❌" };
        self.dispatch(&format!("{prefix} {message}"), level).await;
    }

    async fn send_profit_alert(&self, total_profit: U256, trade_count: usize) {
        let profit = from_wei(total_profit)
            .map(|p| format!("{p:.4}"))
            .unwrap_or_else(|| total_profit.to_string());
        let message = format!(
            "🚨 HIGH PROFIT ALERT\nTotal profit: {profit} MATIC\nTrades: {trade_count}"
        );
        self.dispatch(&message, AlertLevel::Warning).await;
    }

    async fn send_failure_alert(&self, failure_count: usize) {
        let message = format!(
            "⚠️ CONSECUTIVE FAILURES\nFailed trades: {failure_count}\nCheck bot immediately!"
        );
        self.dispatch(&message, AlertLevel::Critical).await;
    }

    async fn send_system_alert(&self, message: &str) {
        let message = format!(
            "🔧 SYSTEM ALERT\nIssue: {}\nTime: {}",
            message,
            Utc::now().to_rfc3339()
        );
        self.dispatch(&message, AlertLevel::Info).await;
    }
}
