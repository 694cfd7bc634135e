//! Flash Loan Arbitrage Bot
//!
//! Main entry point. Loads and validates configuration (missing required
//! fields abort startup), wires the chain client, signer, and alert sink,
//! then runs the scanning/execution/monitoring/health loops until SIGINT or
//! SIGTERM. An in-flight trade is allowed to reach a terminal state before
//! the process exits; the state snapshot is written on the way out.
//!
//! Author: AI-Generated
//! Created: 2026-08-01

use anyhow::{Context, Result};
use clap::Parser;
use flasharb_bot::alerts::WebhookAlerter;
use flasharb_bot::chain::EvmChainClient;
use flasharb_bot::signer::LocalSigner;
use flasharb_bot::{ArbBot, BotConfig};
use futures::StreamExt;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Flash Loan Arbitrage Bot — Polygon
#[derive(Parser)]
#[command(name = "flasharb-bot")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "CONFIG_FILE", default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!("===========================================");
    info!("   Flash Loan Arbitrage Bot");
    info!("===========================================");
    info!("Config file: {}", args.config);

    // Missing required configuration is fatal here, before anything runs
    let config = BotConfig::load(&args.config).context("Invalid configuration")?;

    let chain = Arc::new(
        EvmChainClient::new(
            &config.rpc.public_url,
            &config.rpc.private_url,
            config.contract.address,
        )
        .context("Chain client setup failed")?,
    );
    let signer =
        Arc::new(LocalSigner::from_hex(&config.keys.executor).context("Executor key invalid")?);
    let alerts = Arc::new(WebhookAlerter::new(config.alerts.clone()));

    let bot = ArbBot::new(config, chain, signer, alerts)?;

    // Shutdown context: signal handler flips the watch channel, every loop
    // checks it at iteration boundaries.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let signals_handle = signals.handle();
    tokio::spawn(async move {
        if let Some(signal) = signals.next().await {
            info!("Received signal {}, shutting down...", signal);
            let _ = shutdown_tx.send(true);
        }
    });

    bot.run(shutdown_rx).await;
    signals_handle.close();

    Ok(())
}
