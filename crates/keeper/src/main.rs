use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::time;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use hedge_keeper::{create_example_config, Keeper, KeeperConfig, TickOutcome};

#[derive(Parser, Debug)]
#[command(name = "hedge-keeper")]
#[command(about = "Keeper driving the delta-neutral hedge rebalancing engine")]
struct Args {
    /// Path to keeper configuration file
    #[arg(short, long, default_value = "keeper.toml")]
    config: String,

    /// Write an example configuration to the config path and exit
    #[arg(long)]
    init: bool,

    /// Tick interval in seconds, overriding the configuration
    #[arg(short, long)]
    interval: Option<u64>,

    /// Stop after this many ticks
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Dry run mode - evaluate triggers but never rebalance
    #[arg(long)]
    dry_run: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if args.init {
        create_example_config(&args.config)
            .with_context(|| format!("writing example config to {}", args.config))?;
        info!(path = %args.config, "example configuration written");
        return Ok(());
    }

    let config = KeeperConfig::load(&args.config)
        .with_context(|| format!("loading config from {}", args.config))?;
    let interval = args.interval.unwrap_or(config.tick_interval_secs).max(1);

    info!(keeper = %config.engine.keeper, interval, "Starting hedge keeper");
    if args.dry_run {
        warn!("Running in DRY RUN mode - no rebalances will be submitted");
    }

    let mut keeper = Keeper::new(config, args.dry_run)?;
    let mut interval_timer = time::interval(Duration::from_secs(interval));

    loop {
        tokio::select! {
            _ = interval_timer.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }

        match keeper.tick()? {
            TickOutcome::Rebalanced(_) => {
                info!(tick = keeper.stats().ticks, "Rebalance committed");
            }
            TickOutcome::Deferred(_) => {
                if let Some(delay) = keeper.retry_delay() {
                    debug!(?delay, "Backing off before the next attempt");
                    time::sleep(delay).await;
                }
            }
            TickOutcome::Idle | TickOutcome::WouldRebalance(_) => {}
        }

        // Basic health metrics every 100 ticks
        if keeper.stats().ticks % 100 == 0 {
            let health = keeper.health_check()?;
            info!(health = %serde_json::to_string(&health)?, "Keeper health check");
        }

        if args.ticks.is_some_and(|limit| keeper.stats().ticks >= limit) {
            break;
        }
    }

    println!("{}", serde_json::to_string_pretty(keeper.stats())?);
    println!("{}", serde_json::to_string_pretty(&keeper.health_check()?)?);
    Ok(())
}
