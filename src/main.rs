//! Stock Sentiment Service binary entrypoint.
//! Loads configuration, wires providers and the analyzer, and serves the
//! Axum router (plus `/metrics`).

use shuttle_axum::ShuttleAxum;
use stock_sentiment_analyzer::{app, logging, metrics::Metrics, AppConfig};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    if !logging::init(&logging::LoggingConfig::from_env()) {
        tracing::debug!("tracing subscriber already installed by the runtime");
    }

    let config = AppConfig::load_default().map_err(|e| {
        tracing::error!(error = %e, "configuration error");
        anyhow::Error::new(e)
    })?;
    tracing::info!(
        sectors = config.sectors.len(),
        portfolio = config.portfolio.len(),
        mode = ?config.providers.mode,
        "configuration loaded"
    );

    let metrics = Metrics::init()?;
    let router = app(config)?.merge(metrics.router());

    Ok(router.into())
}
