// tests/metrics.rs
//
// One process-wide Prometheus recorder per test binary, so everything that
// needs it lives in a single test.

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;

use stock_sentiment_analyzer::config::AnalysisSettings;
use stock_sentiment_analyzer::metrics::Metrics;
use stock_sentiment_analyzer::providers::memory::Feed;
use stock_sentiment_analyzer::providers::InMemoryProvider;
use stock_sentiment_analyzer::{SentimentWeights, SourceItem, SourceKind, StockAnalyzer};

#[tokio::test]
async fn pipeline_series_are_exposed() {
    let metrics = Metrics::init().expect("install recorder");
    assert!(Metrics::init().is_err(), "second recorder must be rejected");

    let analyzer = StockAnalyzer::with_provider(
        Arc::new(
            InMemoryProvider::sample()
                .failing("AAPL", Feed::Social)
                .failing_all("DEAD"),
        ),
        SentimentWeights::default(),
        AnalysisSettings::default(),
    );
    analyzer.analyze_symbol("AAPL").await.unwrap();
    assert!(analyzer.analyze_symbol("DEAD").await.is_err());
    analyzer
        .aggregator()
        .aggregate(SourceKind::News, &[SourceItem::text("  ")]);

    let resp = metrics
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "symbols_analyzed_total",
        "symbol_failures_total",
        "source_fetch_errors_total{source=\"social\"}",
        "items_skipped_total{source=\"news\"}",
        "symbol_analysis_ms",
    ] {
        assert!(text.contains(needle), "metrics exposition missing '{needle}'\n{text}");
    }
}
