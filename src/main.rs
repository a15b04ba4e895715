//! Route tracker - personal driving-route log with batch address ingestion
//!
//! Geocodes uploaded address lists against OpenCage, plans routes with
//! GraphHopper, and persists results to SQLite behind a small HTTP API.

use clap::Parser;
use routetrack::infra::Config;
use routetrack::io::{start_http_server, App, RouteStore};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Route tracker - address batch geocoding and route logging service
#[derive(Parser, Debug)]
#[command(name = "routetrack", version, about)]
struct Args {
    /// Path to TOML configuration file (overrides CONFIG_FILE)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Level configurable via RUST_LOG, default INFO
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(git_hash = %env!("GIT_HASH"), "routetrack starting");

    let args = Args::parse();
    let config_path = Config::resolve_config_path(args.config.as_deref());
    let config = Config::load_from_path(&config_path);

    info!(
        config_file = %config.config_file(),
        http_port = %config.http_port(),
        geocoder_url = %config.geocoder_url(),
        router_url = %config.router_url(),
        db_path = %config.db_path(),
        backup_dir = %config.backup_dir(),
        "config_loaded"
    );

    let store = Arc::new(RouteStore::open(config.db_path())?);
    let app = Arc::new(App::from_config(&config, store));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    start_http_server(config.http_port(), app, shutdown_rx).await?;

    info!("routetrack shutdown complete");
    Ok(())
}
