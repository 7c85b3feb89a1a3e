//! Cooldown gateway binary.
//!
//! Fronts an npm-compatible registry and delays adoption of freshly
//! published package versions: young versions are hidden from metadata,
//! unpopular packages are rejected, and everything else streams through to
//! the upstream untouched.

use anyhow::Result;
use clap::Parser;
use cooldown_core::{NpmStatsClient, PolicyConfig, PolicyDefaults};
use cooldown_gateway::{start_server, AppState};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "cooldown-gateway")]
#[command(about = "Policy gateway for an npm-compatible registry")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Upstream registry base URL
    #[arg(long, default_value = PolicyDefaults::REGISTRY_URL)]
    registry_url: String,

    /// Download-statistics endpoint base URL
    #[arg(long, default_value = PolicyDefaults::STATS_URL)]
    stats_url: String,

    /// Minimum version age in hours (overridden by MIN_AGE_HOURS)
    #[arg(long, default_value_t = PolicyDefaults::MIN_AGE_HOURS)]
    min_age_hours: u32,

    /// Minimum weekly downloads, 0 disables the popularity gate
    /// (overridden by MIN_WEEKLY_DOWNLOADS)
    #[arg(long, default_value_t = PolicyDefaults::MIN_WEEKLY_DOWNLOADS)]
    min_weekly_downloads: u64,

    /// Package name (or trailing-* prefix) exempt from all checks; repeatable
    #[arg(long = "allow")]
    allow: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    // The environment wins over CLI-provided values.
    let config = PolicyConfig {
        min_age_hours: args.min_age_hours,
        min_weekly_downloads: args.min_weekly_downloads,
        allow: args.allow,
    }
    .apply_env()?;

    info!(
        "Policy: min age {}h, min weekly downloads {}, {} allowlist entries",
        config.min_age_hours,
        config.min_weekly_downloads,
        config.allow.len()
    );
    info!(
        "Upstream registry {}, stats endpoint {}",
        args.registry_url, args.stats_url
    );

    let stats = Arc::new(NpmStatsClient::new(&args.stats_url)?);
    let state = Arc::new(AppState::new(&config, &args.registry_url, stats)?);

    let addr = start_server(state, &args.host, args.port).await?;
    info!("Gateway running on {}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
