//! # Per-symbol analysis
//! Fetches news, social posts and market context for a symbol concurrently,
//! aggregates each source, blends, and applies the recommendation policy.
//!
//! Failure handling:
//! - a failing source degrades to zero evidence and is listed in
//!   `degraded_sources`; a failing market fetch makes the context unavailable
//! - each collaborator fetch runs under the symbol timeout; an elapsed fetch
//!   degrades like any other failed fetch
//! - only when all three collaborators fail is the symbol unavailable (or
//!   timed out, when every one of them elapsed)
//!
//! Batch operations (`analyze_many`, `sector_sentiment`) log and skip symbols
//! that fail; they never abort.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use metrics::{counter, histogram};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::error::Elapsed;
use tracing::{debug, info, warn, Instrument, Span};

use crate::aggregate::{SourceAggregator, SourceItem, SourceKind, SourceSentiment};
use crate::blend::{blend, SentimentWeights, WeightedSentiment};
use crate::config::AnalysisSettings;
use crate::decision::Recommendation;
use crate::engine::recommend;
use crate::error::{AnalysisError, SourceFetchError};
use crate::market::MarketContext;
use crate::portfolio::{PortfolioReport, SectorSummary};
use crate::providers::{MarketDataSource, NewsSource, SocialSource};
use crate::sentiment::SentimentAnalyzer;

/// No price-derived signal is computed yet; the technical term is always 0.
pub const TECHNICAL_SENTIMENT: f64 = 0.0;

/// Everything known about one symbol after analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub sources: BTreeMap<SourceKind, SourceSentiment>,
    pub weighted: WeightedSentiment,
    pub context: MarketContext,
    pub recommendation: Recommendation,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded_sources: Vec<SourceKind>,
}

impl AnalysisResult {
    pub fn source(&self, kind: SourceKind) -> Option<&SourceSentiment> {
        self.sources.get(&kind)
    }
}

pub struct StockAnalyzer {
    news: Arc<dyn NewsSource>,
    social: Arc<dyn SocialSource>,
    market: Arc<dyn MarketDataSource>,
    aggregator: SourceAggregator,
    weights: SentimentWeights,
    settings: AnalysisSettings,
    span: Span,
}

impl StockAnalyzer {
    pub fn new(
        news: Arc<dyn NewsSource>,
        social: Arc<dyn SocialSource>,
        market: Arc<dyn MarketDataSource>,
        weights: SentimentWeights,
        settings: AnalysisSettings,
    ) -> Self {
        let span = tracing::info_span!("stock_analyzer");
        Self {
            news,
            social,
            market,
            aggregator: aggregator_under(&span),
            weights,
            settings,
            span,
        }
    }

    /// One object serving all three feeds (e.g. the in-memory provider).
    pub fn with_provider<P>(provider: Arc<P>, weights: SentimentWeights, settings: AnalysisSettings) -> Self
    where
        P: NewsSource + SocialSource + MarketDataSource + 'static,
    {
        Self::new(
            provider.clone(),
            provider.clone(),
            provider,
            weights,
            settings,
        )
    }

    /// Report under `span`; the aggregator and scorer get child spans of it.
    pub fn with_span(mut self, span: Span) -> Self {
        self.aggregator = aggregator_under(&span);
        self.span = span;
        self
    }

    pub fn aggregator(&self) -> &SourceAggregator {
        &self.aggregator
    }

    pub fn weights(&self) -> &SentimentWeights {
        &self.weights
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub async fn analyze_symbol(&self, symbol: &str) -> Result<AnalysisResult, AnalysisError> {
        let symbol = normalize_symbol(symbol)?;
        let started = Instant::now();
        let span = tracing::info_span!(parent: &self.span, "analyze", symbol = %symbol);

        let result = self.run(&symbol).instrument(span).await;

        histogram!("symbol_analysis_ms").record(started.elapsed().as_secs_f64() * 1000.0);
        match &result {
            Ok(r) => {
                counter!("symbols_analyzed_total").increment(1);
                info!(
                    symbol = %r.symbol,
                    weighted = r.weighted.value,
                    recommendation = %r.recommendation,
                    degraded = r.degraded_sources.len(),
                    "symbol analyzed"
                );
            }
            Err(e) => {
                counter!("symbol_failures_total").increment(1);
                warn!(symbol = %symbol, error = %e, "symbol analysis failed");
            }
        }
        result
    }

    async fn run(&self, symbol: &str) -> Result<AnalysisResult, AnalysisError> {
        let limit = self.settings.symbol_timeout();
        let (news, social, market) = tokio::join!(
            bounded(limit, self.news.fetch_news_texts(symbol)),
            bounded(limit, self.social.fetch_social_posts(symbol)),
            bounded(limit, self.market.fetch_stock_context(symbol)),
        );
        let all_elapsed = [
            news.as_ref().err(),
            social.as_ref().err(),
            market.as_ref().err(),
        ]
        .into_iter()
        .all(|e| e.is_some_and(|e| e.is::<Elapsed>()));

        let mut degraded = Vec::new();
        let mut failures = 0usize;

        let news_items: Option<Vec<SourceItem>> = match news {
            Ok(texts) => Some(
                texts
                    .into_iter()
                    .take(self.settings.news_limit)
                    .map(SourceItem::text)
                    .collect(),
            ),
            Err(e) => {
                failures += 1;
                record_fetch_error(SourceFetchError::for_source(SourceKind::News, symbol, e));
                None
            }
        };

        let social_items: Option<Vec<SourceItem>> = match social {
            Ok(posts) => Some(posts.into_iter().map(SourceItem::from).collect()),
            Err(e) => {
                failures += 1;
                record_fetch_error(SourceFetchError::for_source(SourceKind::Social, symbol, e));
                None
            }
        };

        let context = match market {
            Ok(ctx) => MarketContext::Available(ctx),
            Err(e) => {
                failures += 1;
                let err = SourceFetchError::new("market", symbol, e);
                let reason = format!("{:#}", err.error);
                record_fetch_error(err);
                MarketContext::unavailable(reason)
            }
        };

        if all_elapsed {
            return Err(AnalysisError::Timeout {
                symbol: symbol.to_string(),
                secs: self.settings.symbol_timeout_secs,
            });
        }
        if failures == 3 {
            return Err(AnalysisError::SymbolUnavailable {
                symbol: symbol.to_string(),
            });
        }

        let mut sources = BTreeMap::new();
        for (kind, items) in [(SourceKind::News, news_items), (SourceKind::Social, social_items)] {
            let sentiment = match items {
                Some(items) => self.aggregator.aggregate(kind, &items),
                None => {
                    degraded.push(kind);
                    SourceSentiment::zero_evidence()
                }
            };
            sources.insert(kind, sentiment);
        }

        let weighted = blend(&sources, &self.weights, TECHNICAL_SENTIMENT);
        let recommendation = recommend(weighted.value, &context);
        debug!(value = weighted.value, label = %weighted.label, "blended");

        Ok(AnalysisResult {
            symbol: symbol.to_string(),
            timestamp: Utc::now(),
            sources,
            weighted,
            context,
            recommendation,
            degraded_sources: degraded,
        })
    }

    /// Analyze in input order with bounded concurrency; failures are skipped.
    pub async fn analyze_many<S: AsRef<str>>(&self, symbols: &[S]) -> Vec<AnalysisResult> {
        let owned: Vec<String> = symbols.iter().map(|s| s.as_ref().to_owned()).collect();
        stream::iter(owned)
            .map(|s| async move { self.analyze_symbol(&s).await })
            .buffered(self.settings.max_concurrency.max(1))
            .filter_map(|r| async move { r.ok() })
            .collect()
            .await
    }

    pub async fn analyze_portfolio<S: AsRef<str>>(&self, symbols: &[S]) -> PortfolioReport {
        PortfolioReport::new(self.analyze_many(symbols).await)
    }

    /// Average weighted sentiment per sector. Sectors where no symbol could be
    /// analyzed are left out of the map.
    pub async fn sector_sentiment(
        &self,
        sectors: &BTreeMap<String, Vec<String>>,
    ) -> BTreeMap<String, SectorSummary> {
        let mut out = BTreeMap::new();
        for (sector, symbols) in sectors {
            let results = self.analyze_many(symbols).await;
            match SectorSummary::from_results(&results) {
                Some(summary) => {
                    out.insert(sector.clone(), summary);
                }
                None => {
                    info!(sector = %sector, symbols = symbols.len(), "no symbol analyzed; sector omitted");
                }
            }
        }
        out
    }
}

fn aggregator_under(parent: &Span) -> SourceAggregator {
    let scorer = SentimentAnalyzer::new().with_span(tracing::info_span!(parent: parent, "text_scorer"));
    SourceAggregator::new(scorer).with_span(tracing::info_span!(parent: parent, "source_aggregator"))
}

/// An elapsed fetch becomes an `Elapsed` error the degrade path can recognize.
async fn bounded<T>(
    limit: Duration,
    fetch: impl Future<Output = anyhow::Result<T>>,
) -> anyhow::Result<T> {
    match tokio::time::timeout(limit, fetch).await {
        Ok(r) => r,
        Err(elapsed) => Err(anyhow::Error::new(elapsed)),
    }
}

fn record_fetch_error(err: SourceFetchError) {
    warn!(
        source = err.source_name,
        symbol = %err.symbol,
        error = %err,
        "source fetch failed; degrading"
    );
    counter!("source_fetch_errors_total", "source" => err.source_name).increment(1);
}

/// Trimmed, uppercased ticker. Only ASCII alphanumerics and `. - ^ =` are
/// accepted, so a symbol is always safe inside a provider URL.
pub fn normalize_symbol(raw: &str) -> Result<String, AnalysisError> {
    let s = raw.trim();
    let valid = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=');
    if s.is_empty() || !s.chars().all(valid) {
        return Err(AnalysisError::InvalidSymbol(raw.to_string()));
    }
    Ok(s.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Verdict;
    use crate::providers::memory::Feed;
    use crate::providers::{InMemoryProvider, SocialPost};
    use crate::sentiment::SentimentLabel;

    fn analyzer(p: InMemoryProvider) -> StockAnalyzer {
        StockAnalyzer::with_provider(
            Arc::new(p),
            SentimentWeights::default(),
            AnalysisSettings::default(),
        )
    }

    #[test]
    fn symbols_are_normalized() {
        assert_eq!(normalize_symbol(" aapl ").unwrap(), "AAPL");
        assert!(matches!(normalize_symbol("  "), Err(AnalysisError::InvalidSymbol(_))));
        assert!(normalize_symbol("AA PL").is_err());
        assert_eq!(normalize_symbol("brk.b").unwrap(), "BRK.B");
        assert_eq!(normalize_symbol("^GSPC").unwrap(), "^GSPC");
        for bad in ["AA/PL", "A?B", "X#1", "../etc", "AAPL&x=1"] {
            assert!(normalize_symbol(bad).is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn component_spans_nest_under_analyzer_span() {
        use tracing_subscriber::registry::{LookupSpan, Registry};

        tracing::subscriber::with_default(Registry::default(), || {
            let a = analyzer(InMemoryProvider::new())
                .with_span(tracing::info_span!("portfolio_run"));
            let parent_of = |span: &Span| {
                let id = span.id().expect("span enabled");
                tracing::dispatcher::get_default(|d| {
                    let reg = d.downcast_ref::<Registry>().expect("registry");
                    reg.span(&id).and_then(|s| s.parent()).map(|p| p.name())
                })
            };
            assert_eq!(parent_of(a.aggregator().span()), Some("portfolio_run"));
            assert_eq!(parent_of(a.aggregator().scorer().span()), Some("portfolio_run"));
        });
    }

    #[tokio::test]
    async fn no_evidence_with_context_holds_neutral() {
        let a = analyzer(InMemoryProvider::new().with_price_change("IBM", 0.4));
        let r = a.analyze_symbol("ibm").await.unwrap();
        assert_eq!(r.symbol, "IBM");
        for kind in SourceKind::ALL {
            assert_eq!(r.source(kind), Some(&SourceSentiment::zero_evidence()));
        }
        assert_eq!(r.weighted.value, 0.0);
        assert_eq!(r.weighted.label, SentimentLabel::Neutral);
        assert_eq!(r.recommendation.text, "HOLD - Neutral sentiment");
        assert!(r.degraded_sources.is_empty());
    }

    #[tokio::test]
    async fn missing_market_context_is_insufficient_data() {
        let a = analyzer(
            InMemoryProvider::new().with_news("XYZ", ["Excellent results, a great and amazing quarter"]),
        );
        let r = a.analyze_symbol("XYZ").await.unwrap();
        assert!(!r.context.is_available());
        assert_eq!(r.recommendation.verdict, Verdict::Hold);
        assert_eq!(r.recommendation.text, "HOLD - Insufficient data");
    }

    #[tokio::test]
    async fn failing_source_degrades_to_zero_evidence() {
        let a = analyzer(
            InMemoryProvider::new()
                .with_news("AAPL", ["Apple reports record earnings, beating estimates"])
                .with_price_change("AAPL", 1.0)
                .failing("AAPL", Feed::Social),
        );
        let r = a.analyze_symbol("AAPL").await.unwrap();
        assert_eq!(r.degraded_sources, vec![SourceKind::Social]);
        assert_eq!(r.source(SourceKind::Social).unwrap().confidence, 0.0);
        assert_eq!(r.source(SourceKind::News).unwrap().sample_count, 1);
    }

    #[tokio::test]
    async fn all_collaborators_failing_is_unavailable() {
        let a = analyzer(InMemoryProvider::new().failing_all("GONE"));
        let err = a.analyze_symbol("GONE").await.unwrap_err();
        assert!(matches!(err, AnalysisError::SymbolUnavailable { ref symbol } if symbol == "GONE"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_collaborators_time_out() {
        let settings = AnalysisSettings {
            symbol_timeout_secs: 1,
            ..AnalysisSettings::default()
        };
        let a = StockAnalyzer::with_provider(
            Arc::new(InMemoryProvider::sample().with_delay(Duration::from_secs(5))),
            SentimentWeights::default(),
            settings,
        );
        let err = a.analyze_symbol("AAPL").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Timeout { secs: 1, .. }));
    }

    struct StalledSocial;

    #[async_trait::async_trait]
    impl SocialSource for StalledSocial {
        async fn fetch_social_posts(&self, _symbol: &str) -> anyhow::Result<Vec<SocialPost>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }

        fn name(&self) -> &'static str {
            "stalled"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn one_stalled_collaborator_only_degrades_its_source() {
        let sample = Arc::new(InMemoryProvider::sample());
        let a = StockAnalyzer::new(
            sample.clone(),
            Arc::new(StalledSocial),
            sample,
            SentimentWeights::default(),
            AnalysisSettings {
                symbol_timeout_secs: 1,
                ..AnalysisSettings::default()
            },
        );

        let r = a.analyze_symbol("AAPL").await.unwrap();
        assert_eq!(r.degraded_sources, vec![SourceKind::Social]);
        assert!(r.context.is_available());
        assert!(r.source(SourceKind::News).unwrap().sample_count >= 1);

        let batch = a.analyze_many(&["AAPL", "MSFT"]).await;
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn batch_keeps_order_and_skips_failures() {
        let a = analyzer(InMemoryProvider::sample().failing_all("BAD"));
        let results = a.analyze_many(&["TSLA", "BAD", " ", "AAPL", "MSFT"]).await;
        let symbols: Vec<&str> = results.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, ["TSLA", "AAPL", "MSFT"]);
    }

    #[tokio::test]
    async fn sectors_without_results_are_omitted() {
        let a = analyzer(InMemoryProvider::sample().failing_all("BAD1").failing_all("BAD2"));
        let sectors = BTreeMap::from([
            ("Technology".to_string(), vec!["AAPL".to_string(), "MSFT".to_string(), "BAD1".to_string()]),
            ("Broken".to_string(), vec!["BAD1".to_string(), "BAD2".to_string()]),
        ]);
        let out = a.sector_sentiment(&sectors).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out["Technology"].stocks_analyzed, 2);
    }
}
