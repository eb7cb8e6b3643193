//! # Mailgate - form submission relay
//!
//! Relays web form submissions as e-mail. A page first asks for a
//! single-use token bound to its origin; the submission is only accepted
//! against that token, once, and after passing the form's anti-spam,
//! field, and captcha checks.
//!
//! ## Flow
//! ```text
//! Browser ── GET /token/{form} ──▶ Mailgate ──▶ token cache
//!    │                                 ▲
//!    └─ POST /send/{form}/{token} ─────┘──▶ captcha APIs ──▶ SMTP
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cache;
mod captcha;
mod config;
mod error;
mod forms;
mod mail;
mod response;
mod routes;
mod state;
mod submission;
mod token;

#[cfg(test)]
mod test_support;

use config::AppConfig;
use forms::FormDirectory;
use state::AppState;

/// Mailgate - token-bound form submission relay
#[derive(Parser, Debug)]
#[command(name = "mailgate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/mailgate.toml", env = "MAILGATE_CONFIG")]
    config: String,

    /// Listen address (overrides config)
    #[arg(short, long, env = "MAILGATE_LISTEN_ADDR")]
    listen: Option<String>,

    /// Forms directory (overrides config)
    #[arg(short, long, env = "MAILGATE_FORMS_PATH")]
    forms: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up a local .env before reading the environment
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level, args.json_logs)?;

    info!("📮 Starting Mailgate v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load(&args.config, &args)?;
    info!("📋 Configuration loaded from {}", args.config);

    let forms = Arc::new(FormDirectory::new(&config.forms.path));
    info!("📂 Serving forms from {}", config.forms.path);

    let state = AppState::new(config.clone(), forms)?;

    // Background sweep of expired tokens
    let cache = state.cache.clone();
    cache.start().await;
    info!(
        lifetime_secs = cache.lifetime().as_secs(),
        "✅ Token cache ready"
    );

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!("🚀 Mailgate listening on {}", config.listen_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    cache.stop().await;

    info!("👋 Mailgate shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("🛑 Shutdown signal received");
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
