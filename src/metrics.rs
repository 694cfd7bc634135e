//! Bot metrics
//!
//! In-process counters, gauges, and fixed-bound duration histograms.
//! The monitoring loop refreshes gauges and logs the statistics banner;
//! the snapshot is serialized to disk at shutdown. There is deliberately
//! no HTTP exporter here.
//!
//! Author: AI-Generated
//! Created: 2026-07-31

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

/// Histogram bucket upper bounds in milliseconds
const DURATION_BUCKETS_MS: [u64; 8] = [50, 100, 250, 500, 1_000, 5_000, 30_000, 120_000];

/// Fixed-bound duration histogram with an implicit overflow bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationHistogram {
    /// Counts per bucket; one extra slot for values over the last bound
    pub bucket_counts: Vec<u64>,
    pub count: u64,
    pub sum_ms: u64,
    pub max_ms: u64,
}

impl Default for DurationHistogram {
    fn default() -> Self {
        Self {
            bucket_counts: vec![0; DURATION_BUCKETS_MS.len() + 1],
            count: 0,
            sum_ms: 0,
            max_ms: 0,
        }
    }
}

impl DurationHistogram {
    pub fn record(&mut self, duration: Duration) {
        let ms = duration.as_millis() as u64;
        let bucket = DURATION_BUCKETS_MS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(DURATION_BUCKETS_MS.len());
        self.bucket_counts[bucket] += 1;
        self.count += 1;
        self.sum_ms += ms;
        self.max_ms = self.max_ms.max(ms);
    }

    pub fn mean_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum_ms as f64 / self.count as f64
        }
    }
}

/// Counters and gauges mirrored into the shutdown snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotStats {
    pub started_at: DateTime<Utc>,
    pub total_scans: u64,
    pub opportunities_found: u64,
    pub trades_executed: u64,
    pub trades_successful: u64,
    pub total_profit_wei: u128,
    pub total_gas_cost_wei: u128,
    pub active_trades: usize,
    pub last_scan_duration_ms: u64,
}

impl Default for BotStats {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            total_scans: 0,
            opportunities_found: 0,
            trades_executed: 0,
            trades_successful: 0,
            total_profit_wei: 0,
            total_gas_cost_wei: 0,
            active_trades: 0,
            last_scan_duration_ms: 0,
        }
    }
}

/// Full metrics snapshot for the statistics banner and the shutdown dump
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: i64,
    pub stats: BotStats,
    pub scan_duration: DurationHistogram,
    pub execution_duration: DurationHistogram,
}

#[derive(Default)]
struct MetricsInner {
    stats: BotStats,
    scan_duration: DurationHistogram,
    execution_duration: DurationHistogram,
}

pub struct MetricsRegistry {
    inner: Mutex<MetricsInner>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsInner::default()),
        }
    }

    pub fn record_scan(&self, duration: Duration, opportunities_found: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.stats.total_scans += 1;
        inner.stats.opportunities_found += opportunities_found as u64;
        inner.stats.last_scan_duration_ms = duration.as_millis() as u64;
        inner.scan_duration.record(duration);
    }

    pub fn record_execution(
        &self,
        duration: Duration,
        success: bool,
        actual_profit_wei: Option<u128>,
        gas_cost_wei: u128,
    ) {
        let mut inner = self.inner.lock().unwrap();
        inner.stats.trades_executed += 1;
        if success {
            inner.stats.trades_successful += 1;
        }
        if let Some(profit) = actual_profit_wei {
            inner.stats.total_profit_wei += profit;
        }
        inner.stats.total_gas_cost_wei += gas_cost_wei;
        inner.execution_duration.record(duration);
    }

    pub fn set_active_trades(&self, count: usize) {
        self.inner.lock().unwrap().stats.active_trades = count;
    }

    pub fn trades_executed(&self) -> u64 {
        self.inner.lock().unwrap().stats.trades_executed
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock().unwrap();
        MetricsSnapshot {
            uptime_secs: (Utc::now() - inner.stats.started_at).num_seconds(),
            stats: inner.stats.clone(),
            scan_duration: inner.scan_duration.clone(),
            execution_duration: inner.execution_duration.clone(),
        }
    }

    /// Statistics banner, logged periodically by the monitoring loop.
    pub fn log_statistics(&self) {
        let snapshot = self.snapshot();
        let stats = &snapshot.stats;

        info!("============================================================");
        info!("📊 BOT STATISTICS");
        info!("Uptime: {}s", snapshot.uptime_secs);
        info!("Total scans: {}", stats.total_scans);
        info!("Opportunities found: {}", stats.opportunities_found);
        info!("Trades executed: {}", stats.trades_executed);
        info!("Successful trades: {}", stats.trades_successful);
        if stats.trades_executed > 0 {
            let rate = stats.trades_successful as f64 / stats.trades_executed as f64 * 100.0;
            info!("Success rate: {:.2}%", rate);
        }
        info!("Total profit: {} wei", stats.total_profit_wei);
        info!("Total gas cost: {} wei", stats.total_gas_cost_wei);
        info!(
            "Net profit: {} wei",
            stats.total_profit_wei as i128 - stats.total_gas_cost_wei as i128
        );
        info!("Active trades: {}", stats.active_trades);
        info!(
            "Scan duration: avg {:.1}ms / max {}ms",
            snapshot.scan_duration.mean_ms(),
            snapshot.scan_duration.max_ms
        );
        info!("============================================================");
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
