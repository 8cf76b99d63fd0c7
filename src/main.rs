// =============================================================================
// Quant Dashboard: Main Entry Point
// =============================================================================
//
// Serves daily price history and technical indicators (SMA, Bollinger Bands,
// MACD, RSI) over HTTP. Prices come from the configured quote service; the
// indicator engine itself is pure and keeps no state between requests.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod config;
mod errors;
mod indicators;
mod market_data;
mod series;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::AppConfig;
use crate::market_data::YahooClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Quant Dashboard starting up");

    let config_path =
        std::env::var("QUANT_CONFIG").unwrap_or_else(|_| "quant_config.json".to_string());
    let mut config = AppConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(path = %config_path, error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    config.apply_env_overrides();

    // ── 2. Market data provider ──────────────────────────────────────────
    let client = YahooClient::new(&config.provider)?;
    let budget = client.budget();
    info!(
        provider = %config.provider.base_url,
        max_requests_per_minute = config.provider.max_requests_per_minute,
        "market data provider ready"
    );

    // ── 3. Shared state ──────────────────────────────────────────────────
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, Arc::new(client)).with_budget(budget));

    // ── 4. REST API ──────────────────────────────────────────────────────
    let app = api::rest::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
        })
        .await
        .context("API server error")?;

    info!("Quant Dashboard stopped");
    Ok(())
}
