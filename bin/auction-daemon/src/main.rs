use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use auction_core::gateway::{DummyOrderGateway, DummyPaymentGateway, TracingNotificationSink};
use auction_core::{
    AuctionService, LifecycleScheduler, MemoryStore, OutboxWorker, SettlementEngine,
};

/// Periodic sweep runner for the auction engine: opens due auctions,
/// settles expired ones, recovers interrupted buy-nows and drains the
/// notification outbox.
#[derive(Debug, Parser)]
#[command(name = "auction-daemon", about = "Auction lifecycle and settlement sweeps")]
struct Args {
    /// Path to a config file (TOML); env vars AUCTION_* override it
    #[arg(long)]
    config: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Settings {
    /// Seconds between SCHEDULED -> RUNNING sweeps
    lifecycle_interval_secs: u64,
    /// Seconds between settlement sweeps
    settlement_interval_secs: u64,
    /// Seconds between buy-now recovery sweeps
    recovery_interval_secs: u64,
    /// Seconds between notification outbox drains
    outbox_interval_secs: u64,
}

impl Settings {
    fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("lifecycle_interval_secs", 10i64)?
            .set_default("settlement_interval_secs", 10i64)?
            .set_default("recovery_interval_secs", 30i64)?
            .set_default("outbox_interval_secs", 5i64)?;
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix("AUCTION"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref())?;
    info!(?settings, "starting auction daemon");

    let store = Arc::new(MemoryStore::new());
    let payments = Arc::new(DummyPaymentGateway::new());
    let orders = Arc::new(DummyOrderGateway::new());
    let sink = Arc::new(TracingNotificationSink);

    let lifecycle = Arc::new(LifecycleScheduler::new(store.clone()));
    let settlement = Arc::new(SettlementEngine::new(
        store.clone(),
        payments.clone(),
        orders.clone(),
    ));
    let bidding = Arc::new(AuctionService::new(
        store.clone(),
        payments.clone(),
        orders.clone(),
    ));
    let outbox = Arc::new(OutboxWorker::new(store.clone(), sink));

    let mut tasks = Vec::new();

    {
        let lifecycle = lifecycle.clone();
        let every = Duration::from_secs(settings.lifecycle_interval_secs);
        tasks.push(tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            loop {
                tick.tick().await;
                let opened = lifecycle.run_once().await;
                if opened > 0 {
                    info!(opened, "lifecycle sweep finished");
                }
            }
        }));
    }

    {
        let settlement = settlement.clone();
        let every = Duration::from_secs(settings.settlement_interval_secs);
        tasks.push(tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            loop {
                tick.tick().await;
                let settled = settlement.run_once().await;
                if settled > 0 {
                    info!(settled, "settlement sweep finished");
                }
            }
        }));
    }

    {
        let bidding = bidding.clone();
        let every = Duration::from_secs(settings.recovery_interval_secs);
        tasks.push(tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            loop {
                tick.tick().await;
                let recovered = bidding.run_buy_now_recovery().await;
                if recovered > 0 {
                    info!(recovered, "buy-now recovery sweep finished");
                }
            }
        }));
    }

    {
        let outbox = outbox.clone();
        let every = Duration::from_secs(settings.outbox_interval_secs);
        tasks.push(tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            loop {
                tick.tick().await;
                outbox.drain().await;
            }
        }));
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    for task in tasks {
        task.abort();
        if let Err(err) = task.await {
            if !err.is_cancelled() {
                error!(error = %err, "sweep task failed");
            }
        }
    }
    Ok(())
}
