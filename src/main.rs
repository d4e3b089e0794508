//! agora - agent-driven market simulation.
//!
//! Runs a headless simulation: a set of traders (noise-driven unless an
//! external decision layer is plugged in) acting on per-asset order books,
//! with every trade and interaction recorded in a SQLite ledger.

mod config;

use std::error::Error;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use agents::{NoiseDecisionSource, NoiseSourceConfig, Portfolio};
use ledger::Ledger;
use market::{EngineConfig, MarketEngine};
use simulation::{RateLimiter, SimulationConfig, SimulationRunner, Trader};
use types::{Cash, Price, Quantity, now_millis};

use config::AppConfig;

/// agora - market simulation with order books, settlement, and a trade ledger
#[derive(Parser, Debug)]
#[command(name = "agora")]
#[command(about = "Agent-driven market simulation substrate")]
#[command(version)]
struct Args {
    /// Ledger database path (use :memory: for an ephemeral run)
    #[arg(long, env = "AGORA_DB")]
    db: Option<String>,

    /// Ticks to run
    #[arg(long, env = "AGORA_TICKS")]
    ticks: Option<u64>,

    /// Number of traders
    #[arg(long, env = "AGORA_TRADERS")]
    traders: Option<usize>,

    /// Traders acting per tick
    #[arg(long, env = "AGORA_TRADERS_PER_TICK")]
    traders_per_tick: Option<usize>,

    /// Comma-separated asset symbols
    #[arg(long, env = "AGORA_ASSETS")]
    assets: Option<String>,

    /// Seed price for every asset
    #[arg(long, env = "AGORA_SEED_PRICE")]
    seed_price: Option<f64>,

    /// Starting cash per trader
    #[arg(long, env = "AGORA_INITIAL_CASH")]
    initial_cash: Option<f64>,

    /// Tick delay in milliseconds
    #[arg(long, env = "AGORA_TICK_DELAY")]
    tick_delay: Option<u64>,

    /// Run identifier (defaults to a clock-derived id)
    #[arg(long, env = "AGORA_RUN_ID")]
    run_id: Option<String>,

    /// Fixed RNG seed for reproducible runs
    #[arg(long, env = "AGORA_SEED")]
    seed: Option<u64>,
}

fn resolve_config(args: Args) -> AppConfig {
    let mut config = AppConfig::default();

    if let Some(db) = args.db {
        config.db_path = db;
    }
    if let Some(ticks) = args.ticks {
        config.ticks = ticks;
    }
    if let Some(traders) = args.traders {
        config.traders = traders.max(1);
    }
    if let Some(per_tick) = args.traders_per_tick {
        config.traders_per_tick = per_tick.max(1);
    }
    if let Some(assets) = args.assets.as_deref() {
        let parsed = AppConfig::parse_assets(assets);
        if !parsed.is_empty() {
            config.assets = parsed;
        }
    }
    if let Some(seed_price) = args.seed_price {
        config.seed_price = seed_price;
    }
    if let Some(cash) = args.initial_cash {
        config.initial_cash = cash;
    }
    if let Some(delay) = args.tick_delay {
        config.tick_delay = Duration::from_millis(delay);
    }
    config.run_id = args
        .run_id
        .unwrap_or_else(|| format!("run_{}", now_millis() / 1000));
    config.rng_seed = args.seed;

    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = resolve_config(Args::parse());
    info!(
        run_id = %config.run_id,
        ticks = config.ticks,
        traders = config.traders,
        assets = ?config.assets,
        "starting simulation"
    );

    let ledger = if config.db_path == ":memory:" {
        Ledger::open_in_memory()?
    } else {
        Ledger::open(&config.db_path)?
    };

    let engine_config = EngineConfig::new(config.assets.clone())
        .with_seed_price(Price::from_float(config.seed_price))
        .with_run_id(config.run_id.clone());
    let engine = MarketEngine::new(ledger, engine_config);

    let traders = (0..config.traders)
        .map(|i| {
            let source = match config.rng_seed {
                Some(seed) => {
                    NoiseDecisionSource::with_seed(NoiseSourceConfig::default(), seed + i as u64)
                }
                None => NoiseDecisionSource::new(NoiseSourceConfig::default()),
            };
            Trader::new(
                format!("Agent_{}", i + 1),
                Portfolio::new(Cash::from_float(config.initial_cash)),
                Box::new(source),
            )
        })
        .collect();

    let sim_config = SimulationConfig::default()
        .with_traders_per_tick(config.traders_per_tick)
        .with_initial_cash(Cash::from_float(config.initial_cash))
        .with_seed_inventory(Quantity(config.seed_inventory));
    let limiter = RateLimiter::new(
        sim_config.max_decisions_per_window,
        sim_config.rate_window,
    );

    let mut runner = SimulationRunner::new(engine, traders, sim_config, limiter);
    runner.seed_inventories();

    for _ in 0..config.ticks {
        runner.run_tick().await;
        let stats = runner.stats();
        if stats.tick.is_multiple_of(10) {
            info!(
                tick = stats.tick,
                trades = stats.trades_executed,
                decisions = stats.decisions,
                "progress"
            );
        }
        if !config.tick_delay.is_zero() {
            tokio::time::sleep(config.tick_delay).await;
        }
    }

    print_summary(&runner, &config);
    Ok(())
}

fn print_summary(runner: &SimulationRunner, config: &AppConfig) {
    let stats = runner.stats();
    println!("\n=== Run {} ===", config.run_id);
    println!(
        "ticks: {}  decisions: {}  trades: {}  holds: {}  missed: {}",
        stats.tick, stats.decisions, stats.trades_executed, stats.holds, stats.missed_decisions
    );

    println!("\n{:<12} {:>12} {:>12} {:>10} {:>8}", "agent", "value", "total pnl", "roi %", "trades");
    for (id, metrics) in runner.agent_summaries() {
        println!(
            "{:<12} {:>12} {:>12} {:>10.2} {:>8}",
            id.as_str(),
            metrics.portfolio_value.to_string(),
            metrics.total_pnl.to_string(),
            metrics.roi,
            metrics.trade_count
        );
    }

    if let Ok(recent) = runner
        .engine()
        .ledger()
        .recent_transactions(5, Some(&config.run_id))
    {
        println!("\nlast trades:");
        for tx in recent {
            println!(
                "  {} {} -> {} @ {}",
                tx.asset,
                tx.seller_id.as_str(),
                tx.buyer_id.as_str(),
                tx.price
            );
        }
    }
}
