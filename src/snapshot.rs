//! Shutdown state snapshot
//!
//! Written once at shutdown for operator inspection. Never read back
//! automatically — reconciliation of in-flight trades across restarts is
//! an external concern.
//!
//! Author: AI-Generated
//! Created: 2026-08-01

use crate::metrics::MetricsSnapshot;
use crate::types::TradeSummary;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSnapshot {
    pub shutdown_at: DateTime<Utc>,
    pub metrics: MetricsSnapshot,
    /// Last completed trades, oldest first
    pub trade_history: Vec<TradeSummary>,
    /// Trades still active at shutdown (possibly in flight on-chain)
    pub active_trade_ids: Vec<String>,
}

impl BotSnapshot {
    pub fn new(
        metrics: MetricsSnapshot,
        trade_history: Vec<TradeSummary>,
        active_trade_ids: Vec<String>,
    ) -> Self {
        Self {
            shutdown_at: Utc::now(),
            metrics,
            trade_history,
            active_trade_ids,
        }
    }

    /// Write to a temp file, then rename (atomic on the same filesystem).
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize snapshot")?;

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context("Failed to create snapshot directory")?;
            }
        }

        let temp_path = path.as_ref().with_extension("tmp");
        std::fs::write(&temp_path, &json).context("Failed to write temp snapshot")?;
        std::fs::rename(&temp_path, path.as_ref()).context("Failed to rename snapshot")?;

        Ok(())
    }
}
