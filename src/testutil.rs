//! Shared test doubles
//!
//! Mock chain client, recording alert sink, and fixture builders used by
//! the unit tests across modules. Compiled only for tests.

use crate::alerts::AlertSink;
use crate::chain::{ChainClient, ReceiptInfo, SubmitChannel};
use crate::config::BotConfig;
use crate::contracts::IFlashLoanArbitrage;
use crate::error::ChainError;
use crate::types::{
    to_wei, ArbDirection, ExecutionReceipt, Opportunity, ProtectedOrder, Trade, TradingPair,
};
use alloy::primitives::{keccak256, Address, Bytes, Log, LogData, B256, U256};
use alloy::sol_types::{SolEvent, SolValue};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Deterministic router address: twenty repeated bytes of `n`
pub fn router_addr(n: u8) -> Address {
    Address::repeat_byte(n)
}

pub fn test_pair(symbol: &str) -> TradingPair {
    TradingPair::new(
        Address::repeat_byte(0xb1),
        Address::repeat_byte(0xb2),
        symbol.to_string(),
    )
}

/// Opportunity fixture: size 1000, buy 1.00 on router 1, sell 1.05 on
/// router 2, expected profit `profit_tokens` whole tokens.
pub fn test_opportunity(symbol: &str, profit_tokens: u64) -> Opportunity {
    Opportunity {
        pair: test_pair(symbol),
        direction: ArbDirection::BuyLowSellHigh,
        buy_router: router_addr(1),
        sell_router: router_addr(2),
        buy_price: dec!(1.00),
        sell_price: dec!(1.05),
        price_diff_percent: dec!(0.05),
        trade_size: to_wei(dec!(1000)).unwrap(),
        expected_profit: to_wei(Decimal::from(profit_tokens)).unwrap(),
        discovered_at: Utc::now(),
    }
}

pub fn test_trade(id: &str, profit_tokens: u64) -> Trade {
    let opportunity = test_opportunity("BASE/QUOTE", profit_tokens);
    let now = Utc::now().timestamp() as u64;
    let order = ProtectedOrder {
        min_out_buy: opportunity.trade_size,
        min_out_sell: opportunity.trade_size,
        opportunity,
        nonce: 1,
        timestamp: now,
        max_gas_price: 100_000_000_000,
        deadline: now + 300,
        signature: Bytes::from(vec![0u8; 65]),
        replay_hash: keccak256(id.as_bytes()),
    };
    let estimated = to_wei(Decimal::from(profit_tokens)).unwrap();
    Trade::new(id.to_string(), order, estimated)
}

pub fn test_receipt(status: bool) -> ExecutionReceipt {
    ExecutionReceipt {
        tx_hash: B256::repeat_byte(0xcc),
        confirmed: status,
        gas_used: 210_000,
        effective_gas_price: 30_000_000_000,
        reverted: !status,
    }
}

pub fn test_receipt_info(status: bool) -> ReceiptInfo {
    ReceiptInfo {
        status,
        gas_used: 210_000,
        effective_gas_price: 30_000_000_000,
        logs: vec![],
    }
}

/// A FlashLoanExecuted log entry carrying the given profit
pub fn profit_event_log(profit: U256) -> Log {
    let topics = vec![
        IFlashLoanArbitrage::FlashLoanExecuted::SIGNATURE_HASH,
        B256::left_padding_from(Address::repeat_byte(0xb1).as_slice()),
    ];
    let data = (U256::from(1_000u64), profit).abi_encode();
    Log {
        address: router_addr(99),
        data: LogData::new_unchecked(topics, data.into()),
    }
}

enum ReceiptScript {
    Never,
    After { remaining: u32, receipt: ReceiptInfo },
}

/// Programmable chain client
pub struct MockChainClient {
    prices: Mutex<HashMap<(String, Address), Decimal>>,
    failing_routers: Mutex<HashSet<Address>>,
    gas_price: Mutex<u128>,
    receipt: Mutex<ReceiptScript>,
    submit_error: Mutex<Option<String>>,
    submissions: Mutex<Vec<(Vec<u8>, SubmitChannel)>>,
    submit_attempts: AtomicUsize,
    paused: AtomicBool,
    connected: AtomicBool,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self {
            prices: Mutex::new(HashMap::new()),
            failing_routers: Mutex::new(HashSet::new()),
            gas_price: Mutex::new(30_000_000_000),
            receipt: Mutex::new(ReceiptScript::Never),
            submit_error: Mutex::new(None),
            submissions: Mutex::new(Vec::new()),
            submit_attempts: AtomicUsize::new(0),
            paused: AtomicBool::new(false),
            connected: AtomicBool::new(true),
        }
    }

    pub fn set_price(&self, symbol: &str, router: Address, price: Decimal) {
        self.prices
            .lock()
            .unwrap()
            .insert((symbol.to_string(), router), price);
    }

    pub fn fail_router(&self, router: Address) {
        self.failing_routers.lock().unwrap().insert(router);
    }

    pub fn set_gas_price(&self, wei: u128) {
        *self.gas_price.lock().unwrap() = wei;
    }

    /// Return the receipt after `polls` empty poll responses
    pub fn set_receipt_after(&self, polls: u32, receipt: ReceiptInfo) {
        *self.receipt.lock().unwrap() = ReceiptScript::After { remaining: polls, receipt };
    }

    pub fn set_submit_error(&self, reason: &str) {
        *self.submit_error.lock().unwrap() = Some(reason.to_string());
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> Vec<(Vec<u8>, SubmitChannel)> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn submit_attempts(&self) -> usize {
        self.submit_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn get_price(&self, pair: &TradingPair, router: Address) -> Result<Decimal, ChainError> {
        if self.failing_routers.lock().unwrap().contains(&router) {
            return Err(ChainError::Rpc("router unavailable".to_string()));
        }
        self.prices
            .lock()
            .unwrap()
            .get(&(pair.symbol.clone(), router))
            .copied()
            .ok_or_else(|| ChainError::Rpc("no price configured".to_string()))
    }

    async fn get_gas_price(&self) -> Result<u128, ChainError> {
        Ok(*self.gas_price.lock().unwrap())
    }

    async fn get_balance(&self, _address: Address) -> Result<U256, ChainError> {
        Ok(U256::from(10_000_000_000_000_000_000u128))
    }

    async fn get_transaction_count(&self, _address: Address) -> Result<u64, ChainError> {
        Ok(7)
    }

    async fn send_raw_transaction(
        &self,
        raw: &[u8],
        channel: SubmitChannel,
    ) -> Result<B256, ChainError> {
        self.submit_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.submit_error.lock().unwrap().clone() {
            return Err(ChainError::Rpc(reason));
        }
        self.submissions.lock().unwrap().push((raw.to_vec(), channel));
        Ok(keccak256(raw))
    }

    async fn get_transaction_receipt(
        &self,
        _tx_hash: B256,
    ) -> Result<Option<ReceiptInfo>, ChainError> {
        let mut script = self.receipt.lock().unwrap();
        match &mut *script {
            ReceiptScript::Never => Ok(None),
            ReceiptScript::After { remaining, receipt } => {
                if *remaining == 0 {
                    Ok(Some(receipt.clone()))
                } else {
                    *remaining -= 1;
                    Ok(None)
                }
            }
        }
    }

    async fn is_connected(&self, _channel: SubmitChannel) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn is_contract_paused(&self) -> Result<bool, ChainError> {
        Ok(self.paused.load(Ordering::SeqCst))
    }
}

/// Alert sink that counts deliveries instead of sending them
pub struct RecordingAlertSink {
    trade_alerts: AtomicUsize,
    profit_alerts: AtomicUsize,
    failure_alerts: AtomicUsize,
    system_alerts: Mutex<Vec<String>>,
}

impl RecordingAlertSink {
    pub fn new() -> Self {
        Self {
            trade_alerts: AtomicUsize::new(0),
            profit_alerts: AtomicUsize::new(0),
            failure_alerts: AtomicUsize::new(0),
            system_alerts: Mutex::new(Vec::new()),
        }
    }

    pub fn trade_alert_count(&self) -> usize {
        self.trade_alerts.load(Ordering::SeqCst)
    }

    pub fn profit_alert_count(&self) -> usize {
        self.profit_alerts.load(Ordering::SeqCst)
    }

    pub fn failure_alert_count(&self) -> usize {
        self.failure_alerts.load(Ordering::SeqCst)
    }

    pub fn system_alerts(&self) -> Vec<String> {
        self.system_alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    async fn send_trade_alert(&self, _trade: &Trade) {
        self.trade_alerts.fetch_add(1, Ordering::SeqCst);
    }

    async fn send_profit_alert(&self, _total_profit: U256, _trade_count: usize) {
        self.profit_alerts.fetch_add(1, Ordering::SeqCst);
    }

    async fn send_failure_alert(&self, _failure_count: usize) {
        self.failure_alerts.fetch_add(1, Ordering::SeqCst);
    }

    async fn send_system_alert(&self, message: &str) {
        self.system_alerts.lock().unwrap().push(message.to_string());
    }
}

/// Lifecycle manager over the mock chain with a real protector and signer
pub fn manager_with(
    chain: Arc<MockChainClient>,
    min_profit: U256,
) -> (
    crate::lifecycle::TradeLifecycleManager,
    Arc<RecordingAlertSink>,
) {
    use crate::lifecycle::{LifecycleConfig, TradeLifecycleManager, HISTORY_CAPACITY};
    use crate::mev::{OrderProtector, ProtectorConfig};
    use crate::signer::LocalSigner;

    let signer = Arc::new(LocalSigner::from_hex(TEST_KEY).unwrap());
    let protector = Arc::new(OrderProtector::new(
        Arc::clone(&chain) as Arc<dyn ChainClient>,
        signer,
        ProtectorConfig {
            chain_id: 137,
            contract: router_addr(99),
            max_gas_price_absolute: 500_000_000_000,
            min_profit,
            max_slippage: Decimal::ZERO,
        },
    ));

    let alerts = Arc::new(RecordingAlertSink::new());
    let manager = TradeLifecycleManager::new(
        chain,
        protector,
        alerts.clone(),
        LifecycleConfig {
            min_profit,
            gas_units_estimate: 500_000,
            history_capacity: HISTORY_CAPACITY,
        },
    );
    (manager, alerts)
}

/// Valid bot configuration over mock addresses, snapshot path in tmp
pub fn test_bot_config() -> BotConfig {
    let toml = r#"
        [rpc]
        public_url = "http://127.0.0.1:18545"
        private_url = "http://127.0.0.1:18546"

        [keys]
        executor = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

        [contract]
        address = "0x6363636363636363636363636363636363636363"
        chain_id = 137

        [trading]
        pairs = [
            { base = "0xb1b1b1b1b1b1b1b1b1b1b1b1b1b1b1b1b1b1b1b1", quote = "0xb2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2", symbol = "BASE/QUOTE" },
        ]
        enabled_routers = [
            "0x0101010101010101010101010101010101010101",
            "0x0202020202020202020202020202020202020202",
        ]
        min_profit_wei = 0
        max_slippage_percent = 0.0
        check_interval_secs = 1
    "#;

    let mut config: BotConfig = toml::from_str(toml).unwrap();
    config.monitoring.snapshot_path = std::env::temp_dir()
        .join("flasharb-test-state.json")
        .to_string_lossy()
        .into_owned();
    config
}
