// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod analyzer;
pub mod api;
pub mod blend;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod logging;
pub mod market;
pub mod metrics;
pub mod portfolio;
pub mod providers;
pub mod sentiment;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{SourceAggregator, SourceItem, SourceKind, SourceSentiment};
pub use crate::analyzer::{AnalysisResult, StockAnalyzer};
pub use crate::api::{create_router, AppState};
pub use crate::blend::{blend, SentimentWeights, WeightedSentiment};
pub use crate::config::AppConfig;
pub use crate::decision::{Recommendation, RecommendationReason, Verdict};
pub use crate::engine::recommend;
pub use crate::error::{AnalysisError, ConfigError, SourceFetchError};
pub use crate::market::{MarketContext, StockContext};
pub use crate::portfolio::{rank_sectors, summarize, PortfolioSummary, SectorSummary};
pub use crate::sentiment::{SentimentAnalyzer, SentimentLabel, TextScore};

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::ProviderMode;
use crate::providers::{InMemoryProvider, RateLimiter, RedditSocial, YahooChartMarket, YahooRssNews};

/// Wire the analyzer to the collaborators selected in `config.providers`.
/// HTTP providers share one client and one rate limiter.
pub fn build_analyzer(config: &AppConfig) -> anyhow::Result<StockAnalyzer> {
    let p = &config.providers;
    let a = config.analysis;

    let analyzer = match p.mode {
        ProviderMode::Offline => {
            info!("using built-in offline sample data");
            StockAnalyzer::with_provider(Arc::new(InMemoryProvider::sample()), config.sentiment_weights, a)
        }
        ProviderMode::Http => {
            let client = reqwest::Client::builder()
                .user_agent(p.user_agent.clone())
                .timeout(Duration::from_secs(p.http_timeout_secs))
                .build()
                .context("building http client")?;
            let limiter = RateLimiter::new(p.max_concurrent_requests, p.requests_per_minute);
            info!(
                requests_per_minute = p.requests_per_minute,
                max_concurrent = p.max_concurrent_requests,
                "using live http providers"
            );
            StockAnalyzer::new(
                Arc::new(YahooRssNews::http(client.clone(), limiter.clone(), a.news_limit)),
                Arc::new(RedditSocial::http(
                    client.clone(),
                    limiter.clone(),
                    p.subreddits.clone(),
                    a.social_limit,
                )),
                Arc::new(YahooChartMarket::http(client, limiter)),
                config.sentiment_weights,
                a,
            )
        }
    };
    Ok(analyzer.with_span(tracing::info_span!("stock_analyzer", mode = ?p.mode)))
}

/// Analyzer + HTTP router for a loaded configuration (without `/metrics`).
pub fn app(config: AppConfig) -> anyhow::Result<axum::Router> {
    let analyzer = build_analyzer(&config)?;
    Ok(create_router(AppState::new(analyzer, config)))
}
