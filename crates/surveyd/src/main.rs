//! # Surveyd - Survey Intake Service
//!
//! Accepts visitor survey answers over HTTP, verifies them against
//! Cloudflare Turnstile, validates the payload, and persists each
//! accepted answer under a fresh UUID in Redis.
//!
//! ## Architecture
//! ```text
//! Browser form → Surveyd → Turnstile siteverify
//!                   ↓
//!                 Redis (answers)
//! ```

use anyhow::{Context, Result, ensure};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;
mod respond;
mod routes;
mod state;
mod store;
mod turnstile;

use config::AppConfig;
use state::AppState;

/// Surveyd - survey intake service
#[derive(Parser, Debug)]
#[command(name = "surveyd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/surveyd.toml")]
    config: String,

    /// Redis URL (overrides config)
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Listen address (overrides config)
    #[arg(short, long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// Turnstile secret key (overrides config)
    #[arg(long, env = "TURNSTILE_SECRET_KEY", hide_env_values = true)]
    turnstile_secret: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up .env before clap resolves env-backed arguments
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level, args.json_logs)?;

    info!("🔥 Starting Surveyd v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load(&args.config, &args)?;
    info!("📋 Configuration loaded from {}", args.config);

    ensure!(
        !config.turnstile.secret.is_empty(),
        "Turnstile secret key is required (TURNSTILE_SECRET_KEY or config file)"
    );

    // Initialize application state
    let state = AppState::new(&config).await?;
    info!("✅ Redis connected: {}", config.redis_url);

    // Build router
    let app = routes::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("🚀 Surveyd listening on {}", config.listen_addr);

    // Handle graceful shutdown
    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("🛑 Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    info!("👋 Surveyd shutdown complete");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }

    Ok(())
}
