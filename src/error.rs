use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::aggregate::SourceKind;

/// A whole symbol could not be analyzed. Batch operations log and skip these.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid symbol {0:?}")]
    InvalidSymbol(String),
    #[error("no market context and no sentiment source available for {symbol}")]
    SymbolUnavailable { symbol: String },
    #[error("analysis of {symbol} timed out after {secs}s")]
    Timeout { symbol: String, secs: u64 },
}

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        let status = match self {
            AnalysisError::InvalidSymbol(_) => StatusCode::BAD_REQUEST,
            AnalysisError::SymbolUnavailable { .. } => StatusCode::NOT_FOUND,
            AnalysisError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// A collaborator call failed. Absorbed by the analyzer: the source degrades
/// to zero evidence (or the market context to unavailable).
#[derive(Debug, Error)]
#[error("{source_name} fetch failed for {symbol}: {error:#}")]
pub struct SourceFetchError {
    pub source_name: &'static str,
    pub symbol: String,
    pub error: anyhow::Error,
}

impl SourceFetchError {
    pub fn new(source_name: &'static str, symbol: &str, error: anyhow::Error) -> Self {
        Self {
            source_name,
            symbol: symbol.to_string(),
            error,
        }
    }

    pub fn for_source(kind: SourceKind, symbol: &str, error: anyhow::Error) -> Self {
        Self::new(kind.as_str(), symbol, error)
    }
}

/// Malformed or missing configuration. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config {path}: {message}")]
    Parse { path: String, message: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}
