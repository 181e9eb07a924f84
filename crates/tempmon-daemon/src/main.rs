//! Tempmon Daemon - Main entry point
//!
//! Serves the viewer client, issues view tokens and runs the temperature
//! monitor pipeline against a model snapshot.

mod api;
mod config;
mod server;
mod state;
mod ws;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tempmon_auth::TokenProvider;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "tempmon")]
#[command(about = "Temperature monitor overlay server")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "tempmon.toml")]
    config: PathBuf,

    /// Bind address for web server
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Request a view token from a running server and exit
    #[arg(long, value_name = "URL")]
    fetch_token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG takes precedence
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => args.log_level.to_lowercase(),
        _ => "info".to_string(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Tempmon v{}", env!("CARGO_PKG_VERSION"));

    if let Some(url) = args.fetch_token {
        let provider = TokenProvider::new(&url)?.with_retries(2);
        let token = provider.get_token().await?;
        println!("{}", serde_json::to_string_pretty(&token)?);
        return Ok(());
    }

    // Load configuration
    let mut config = config::load_config(&args.config)?;

    // Override bind address if specified
    if let Some(bind) = args.bind {
        config.daemon.bind = bind;
    }

    info!(
        bind = %config.daemon.bind,
        snapshot = %config.model.snapshot,
        refresh_ms = config.heatmap.refresh_interval_ms,
        "Configuration loaded"
    );

    let state = state::AppState::new(config.clone()).await?;
    server::run(state, &config.daemon.bind, config.daemon.tls.as_ref()).await?;

    Ok(())
}
