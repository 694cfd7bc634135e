//! Opportunity Scanner
//!
//! Scans every configured pair across all enabled routers and emits
//! normalized buy-cheap/sell-dear opportunities. Per-router fetch failures
//! and per-pair skips are explicit records in the scan report, never silent —
//! a misconfigured router shows up in the report, not in a swallowed log line.
//!
//! Author: AI-Generated
//! Created: 2026-07-29
//! Modified: 2026-08-02 (router failures surfaced in the scan report)

use crate::config::TradingConfig;
use crate::error::ConfigError;
use crate::oracle::PriceOracle;
use crate::types::{to_wei, ArbDirection, Opportunity, PriceQuote, TradingPair};
use alloy::primitives::Address;
use chrono::Utc;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Scanner parameters, converted once from the TOML config
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub pairs: Vec<TradingPair>,
    pub routers: Vec<Address>,
    /// Minimum fractional spread (0.02 = 2%)
    pub min_price_diff: Decimal,
    /// Loan size in whole tokens
    pub trade_size: Decimal,
    /// Per-swap DEX fee fraction
    pub dex_fee: Decimal,
}

impl ScannerConfig {
    pub fn from_trading(trading: &TradingConfig) -> Result<Self, ConfigError> {
        let decimal = |field: &'static str, v: f64| {
            Decimal::from_f64(v).ok_or(ConfigError::InvalidValue {
                field,
                reason: format!("{v} is not representable"),
            })
        };

        Ok(Self {
            pairs: trading
                .pairs
                .iter()
                .map(|p| TradingPair::new(p.base, p.quote, p.symbol.clone()))
                .collect(),
            routers: trading.enabled_routers.clone(),
            min_price_diff: decimal(
                "trading.min_price_diff_percent",
                trading.min_price_diff_percent,
            )?,
            trade_size: decimal("trading.default_trade_size", trading.default_trade_size)?,
            dex_fee: decimal("trading.dex_fee_percent", trading.dex_fee_percent)?,
        })
    }
}

/// Why a pair produced no comparison this cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Fewer than two routers returned a usable quote
    InsufficientQuotes { valid: usize },
}

#[derive(Debug, Clone)]
pub struct PairSkip {
    pub pair: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub struct RouterFailure {
    pub pair: String,
    pub router: Address,
    pub error: String,
}

/// Outcome of one scan cycle. Opportunities plus every per-item skip.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub opportunities: Vec<Opportunity>,
    pub skips: Vec<PairSkip>,
    pub router_failures: Vec<RouterFailure>,
}

#[derive(Debug, Clone, Default)]
pub struct ScannerStats {
    pub total_scans: u64,
    pub profitable_opportunities: u64,
    /// Largest expected profit seen so far, in wei
    pub best_profit_wei: u128,
}

pub struct OpportunityScanner {
    oracle: Arc<PriceOracle>,
    config: ScannerConfig,
    stats: Mutex<ScannerStats>,
}

impl OpportunityScanner {
    pub fn new(oracle: Arc<PriceOracle>, config: ScannerConfig) -> Self {
        Self {
            oracle,
            config,
            stats: Mutex::new(ScannerStats::default()),
        }
    }

    /// Scan all configured pairs across all enabled routers.
    pub async fn scan(&self) -> ScanReport {
        let mut report = ScanReport::default();

        for pair in &self.config.pairs {
            let quotes = self.collect_quotes(pair, &mut report).await;

            if quotes.len() < 2 {
                debug!("{}: {}/{} usable quotes, skipping", pair, quotes.len(), self.config.routers.len());
                report.skips.push(PairSkip {
                    pair: pair.symbol.clone(),
                    reason: SkipReason::InsufficientQuotes { valid: quotes.len() },
                });
                continue;
            }

            self.compare_quotes(pair, &quotes, &mut report.opportunities);
        }

        let mut stats = self.stats.lock().unwrap();
        stats.total_scans += 1;
        stats.profitable_opportunities += report.opportunities.len() as u64;
        for opp in &report.opportunities {
            let profit: u128 = opp.expected_profit.try_into().unwrap_or(u128::MAX);
            if profit > stats.best_profit_wei {
                stats.best_profit_wei = profit;
            }
        }

        report
    }

    /// Fetch quotes from every router concurrently; individual failures are
    /// recorded and that router sits this pair out.
    async fn collect_quotes(&self, pair: &TradingPair, report: &mut ScanReport) -> Vec<PriceQuote> {
        let oracle = &self.oracle;
        let fetches = self.config.routers.iter().map(|&router| async move {
            (router, oracle.fetch(pair, router).await)
        });

        let mut quotes = Vec::new();
        for (router, result) in futures::future::join_all(fetches).await {
            match result {
                Ok(quote) => quotes.push(quote),
                Err(e) => {
                    debug!("Price fetch failed for {} on {}: {}", pair, router, e);
                    report.router_failures.push(RouterFailure {
                        pair: pair.symbol.clone(),
                        router,
                        error: e.to_string(),
                    });
                }
            }
        }
        quotes
    }

    /// Pairwise spread comparison over the usable quotes.
    fn compare_quotes(
        &self,
        pair: &TradingPair,
        quotes: &[PriceQuote],
        out: &mut Vec<Opportunity>,
    ) {
        for i in 0..quotes.len() {
            for j in (i + 1)..quotes.len() {
                let (a, b) = (&quotes[i], &quotes[j]);

                let diff = price_diff_percent(a.price, b.price);
                if diff < self.config.min_price_diff {
                    continue;
                }

                // Buy on the cheaper router, sell on the dearer one
                let (buy, sell) = if a.price < b.price { (a, b) } else { (b, a) };

                let profit = expected_profit(
                    self.config.trade_size,
                    buy.price,
                    sell.price,
                    self.config.dex_fee,
                );
                if profit <= Decimal::ZERO {
                    continue;
                }

                let (Some(profit_wei), Some(size_wei)) =
                    (to_wei(profit), to_wei(self.config.trade_size))
                else {
                    warn!("{}: profit {} not convertible to wei, discarding", pair, profit);
                    continue;
                };

                out.push(Opportunity {
                    pair: pair.clone(),
                    direction: ArbDirection::BuyLowSellHigh,
                    buy_router: buy.router,
                    sell_router: sell.router,
                    buy_price: buy.price,
                    sell_price: sell.price,
                    price_diff_percent: diff,
                    trade_size: size_wei,
                    expected_profit: profit_wei,
                    discovered_at: Utc::now(),
                });
            }
        }
    }

    pub fn stats(&self) -> ScannerStats {
        self.stats.lock().unwrap().clone()
    }
}

/// Fractional spread between two prices: |p1 - p2| / min(p1, p2).
/// Symmetric in its arguments by construction.
pub(crate) fn price_diff_percent(p1: Decimal, p2: Decimal) -> Decimal {
    let min = p1.min(p2);
    if min <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (p1 - p2).abs() / min
}

/// Expected gross profit in whole tokens:
/// sell_amount = size * sell / buy, less the DEX fee, minus the loan size.
pub(crate) fn expected_profit(
    trade_size: Decimal,
    buy_price: Decimal,
    sell_price: Decimal,
    fee: Decimal,
) -> Decimal {
    if buy_price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let sell_amount = trade_size * sell_price / buy_price;
    let sell_amount = sell_amount * (Decimal::ONE - fee);
    sell_amount - trade_size
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainClient;
    use crate::testutil::{router_addr, test_pair, MockChainClient};
    use alloy::primitives::U256;
    use rust_decimal_macros::dec;

    fn scanner_with(
        chain: Arc<MockChainClient>,
        pairs: Vec<TradingPair>,
        routers: Vec<Address>,
        min_diff: Decimal,
        fee: Decimal,
    ) -> OpportunityScanner {
        let oracle = Arc::new(PriceOracle::new(chain as Arc<dyn ChainClient>));
        OpportunityScanner::new(
            oracle,
            ScannerConfig {
                pairs,
                routers,
                min_price_diff: min_diff,
                trade_size: dec!(1000),
                dex_fee: fee,
            },
        )
    }

    #[test]
    fn test_price_diff_is_symmetric() {
        let d1 = price_diff_percent(dec!(1.00), dec!(1.05));
        let d2 = price_diff_percent(dec!(1.05), dec!(1.00));
        assert_eq!(d1, d2);
        assert_eq!(d1, dec!(0.05));
    }

    #[test]
    fn test_expected_profit_formula_exact() {
        // 1000 * 110/100 = 1100, after 0.3% fee 1096.7, profit 96.7
        let profit = expected_profit(dec!(1000), dec!(100), dec!(110), dec!(0.003));
        assert_eq!(profit, dec!(96.7));
    }

    #[test]
    fn test_expected_profit_nonpositive_when_fee_eats_spread() {
        // sell * (1 - fee) <= buy  =>  profit <= 0
        let profit = expected_profit(dec!(1000), dec!(100), dec!(100.2), dec!(0.003));
        assert!(profit <= Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_scan_finds_single_opportunity() {
        // R1 @ 1.00, R2 @ 1.05, threshold 2%, fee 0 -> buy R1, sell R2, profit 50
        let chain = Arc::new(MockChainClient::new());
        let pair = test_pair("BASE/QUOTE");
        let (r1, r2) = (router_addr(1), router_addr(2));
        chain.set_price(&pair.symbol, r1, dec!(1.00));
        chain.set_price(&pair.symbol, r2, dec!(1.05));

        let scanner = scanner_with(
            chain,
            vec![pair.clone()],
            vec![r1, r2],
            dec!(0.02),
            Decimal::ZERO,
        );
        let report = scanner.scan().await;

        assert_eq!(report.opportunities.len(), 1);
        let opp = &report.opportunities[0];
        assert_eq!(opp.buy_router, r1);
        assert_eq!(opp.sell_router, r2);
        assert_eq!(opp.expected_profit, U256::from(50_000_000_000_000_000_000u128));
        assert_eq!(opp.trade_size, U256::from(1_000_000_000_000_000_000_000u128));
        assert!(report.skips.is_empty());
    }

    #[tokio::test]
    async fn test_scan_rejects_below_threshold() {
        // R1 @ 1.00, R2 @ 1.01, threshold 2% -> nothing
        let chain = Arc::new(MockChainClient::new());
        let pair = test_pair("BASE/QUOTE");
        let (r1, r2) = (router_addr(1), router_addr(2));
        chain.set_price(&pair.symbol, r1, dec!(1.00));
        chain.set_price(&pair.symbol, r2, dec!(1.01));

        let scanner = scanner_with(
            chain,
            vec![pair],
            vec![r1, r2],
            dec!(0.02),
            Decimal::ZERO,
        );
        let report = scanner.scan().await;
        assert!(report.opportunities.is_empty());
    }

    #[tokio::test]
    async fn test_scan_never_emits_nonpositive_profit() {
        // Spread above threshold but the fee eats it entirely
        let chain = Arc::new(MockChainClient::new());
        let pair = test_pair("BASE/QUOTE");
        let (r1, r2) = (router_addr(1), router_addr(2));
        chain.set_price(&pair.symbol, r1, dec!(1.000));
        chain.set_price(&pair.symbol, r2, dec!(1.004));

        let scanner = scanner_with(
            chain,
            vec![pair],
            vec![r1, r2],
            dec!(0.001),
            dec!(0.01),
        );
        let report = scanner.scan().await;
        assert!(report.opportunities.is_empty());
    }

    #[tokio::test]
    async fn test_failed_router_is_excluded_not_fatal() {
        // Three routers, one broken: the other two still compare
        let chain = Arc::new(MockChainClient::new());
        let pair = test_pair("BASE/QUOTE");
        let (r1, r2, r3) = (router_addr(1), router_addr(2), router_addr(3));
        chain.set_price(&pair.symbol, r1, dec!(1.00));
        chain.set_price(&pair.symbol, r2, dec!(1.05));
        chain.fail_router(r3);

        let scanner = scanner_with(
            chain,
            vec![pair],
            vec![r1, r2, r3],
            dec!(0.02),
            Decimal::ZERO,
        );
        let report = scanner.scan().await;

        assert_eq!(report.opportunities.len(), 1);
        assert_eq!(report.router_failures.len(), 1);
        assert_eq!(report.router_failures[0].router, r3);
    }

    #[tokio::test]
    async fn test_pair_skipped_when_under_two_quotes() {
        let chain = Arc::new(MockChainClient::new());
        let pair = test_pair("BASE/QUOTE");
        let (r1, r2) = (router_addr(1), router_addr(2));
        chain.set_price(&pair.symbol, r1, dec!(1.00));
        chain.fail_router(r2);

        let scanner = scanner_with(
            chain,
            vec![pair.clone()],
            vec![r1, r2],
            dec!(0.02),
            Decimal::ZERO,
        );
        let report = scanner.scan().await;

        assert!(report.opportunities.is_empty());
        assert_eq!(report.skips.len(), 1);
        assert_eq!(report.skips[0].pair, pair.symbol);
        assert_eq!(
            report.skips[0].reason,
            SkipReason::InsufficientQuotes { valid: 1 }
        );
    }

    #[tokio::test]
    async fn test_stats_track_best_profit() {
        let chain = Arc::new(MockChainClient::new());
        let pair = test_pair("BASE/QUOTE");
        let (r1, r2) = (router_addr(1), router_addr(2));
        chain.set_price(&pair.symbol, r1, dec!(1.00));
        chain.set_price(&pair.symbol, r2, dec!(1.05));

        let scanner = scanner_with(
            chain,
            vec![pair],
            vec![r1, r2],
            dec!(0.02),
            Decimal::ZERO,
        );
        scanner.scan().await;

        let stats = scanner.stats();
        assert_eq!(stats.total_scans, 1);
        assert_eq!(stats.profitable_opportunities, 1);
        assert_eq!(stats.best_profit_wei, 50_000_000_000_000_000_000u128);
    }
}
