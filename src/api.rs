use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::analyzer::{AnalysisResult, StockAnalyzer};
use crate::config::AppConfig;
use crate::error::AnalysisError;
use crate::portfolio::{rank_sectors, PortfolioReport, RankedSector};
use crate::sentiment::{ScoredText, TextScore};

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<StockAnalyzer>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(analyzer: StockAnalyzer, config: AppConfig) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            config: Arc::new(config),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/score", post(score))
        .route("/score/batch", post(score_batch))
        .route("/analyze/{symbol}", get(analyze))
        .route("/portfolio", post(portfolio))
        .route("/sectors", get(sectors))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Deserialize)]
struct ScoreReq {
    text: String,
}

async fn score(State(state): State<AppState>, Json(body): Json<ScoreReq>) -> Json<TextScore> {
    Json(state.analyzer.aggregator().scorer().score(&body.text))
}

async fn score_batch(
    State(state): State<AppState>,
    Json(texts): Json<Vec<String>>,
) -> Json<Vec<ScoredText>> {
    Json(state.analyzer.aggregator().scorer().score_batch(&texts))
}

async fn analyze(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<AnalysisResult>, AnalysisError> {
    state.analyzer.analyze_symbol(&symbol).await.map(Json)
}

#[derive(Deserialize)]
struct PortfolioReq {
    /// Falls back to the configured portfolio when absent.
    #[serde(default)]
    symbols: Option<Vec<String>>,
}

async fn portfolio(
    State(state): State<AppState>,
    Json(body): Json<PortfolioReq>,
) -> Json<PortfolioReport> {
    let symbols = body.symbols.unwrap_or_else(|| state.config.portfolio.clone());
    Json(state.analyzer.analyze_portfolio(&symbols).await)
}

async fn sectors(State(state): State<AppState>) -> Json<Vec<RankedSector>> {
    let summaries = state.analyzer.sector_sentiment(&state.config.sectors).await;
    Json(rank_sectors(summaries))
}
