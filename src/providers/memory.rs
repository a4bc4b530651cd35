//! Deterministic in-process collaborator: fixed news, posts and market context
//! per symbol. Backs the `offline` provider mode and the test suites.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use super::{MarketDataSource, NewsSource, SocialPost, SocialSource};
use crate::market::StockContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    News,
    Social,
    Market,
}

#[derive(Debug, Default)]
pub struct InMemoryProvider {
    news: RwLock<HashMap<String, Vec<String>>>,
    social: RwLock<HashMap<String, Vec<SocialPost>>>,
    market: RwLock<HashMap<String, StockContext>>,
    failing: RwLock<HashSet<(String, Feed)>>,
    delay: Option<Duration>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch sleeps this long first (exercises timeouts).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_news<S: Into<String>>(self, symbol: &str, texts: impl IntoIterator<Item = S>) -> Self {
        self.news
            .write()
            .insert(key(symbol), texts.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_social(self, symbol: &str, posts: impl IntoIterator<Item = (&'static str, i64)>) -> Self {
        let posts = posts
            .into_iter()
            .map(|(text, popularity)| SocialPost {
                text: text.to_string(),
                popularity,
            })
            .collect();
        self.social.write().insert(key(symbol), posts);
        self
    }

    pub fn with_market(self, symbol: &str, ctx: StockContext) -> Self {
        self.market.write().insert(key(symbol), ctx);
        self
    }

    /// Shortcut for a context with just a price change.
    pub fn with_price_change(self, symbol: &str, change_pct: f64) -> Self {
        self.with_market(
            symbol,
            StockContext {
                current_price: Some(100.0),
                price_change_pct: Some(change_pct),
                volume: Some(1_000_000),
                company_name: Some(symbol.to_string()),
                ..StockContext::default()
            },
        )
    }

    /// Make one feed fail for one symbol.
    pub fn failing(self, symbol: &str, feed: Feed) -> Self {
        self.failing.write().insert((key(symbol), feed));
        self
    }

    /// A symbol whose every feed fails.
    pub fn failing_all(self, symbol: &str) -> Self {
        self.failing(symbol, Feed::News)
            .failing(symbol, Feed::Social)
            .failing(symbol, Feed::Market)
    }

    /// Built-in sample data for `offline` mode.
    pub fn sample() -> Self {
        Self::new()
            .with_news(
                "AAPL",
                [
                    "Apple reports record earnings, beating estimates",
                    "iPhone demand stays strong heading into the holiday quarter",
                ],
            )
            .with_social(
                "AAPL",
                [("Services growth looks great, long-term holder here and very happy", 40)],
            )
            .with_price_change("AAPL", 1.5)
            .with_news("TSLA", ["Tesla shares tumble after deliveries miss expectations"])
            .with_social("TSLA", [("Worried about margins, this quarter looks bad", 12)])
            .with_price_change("TSLA", -2.3)
            .with_news("MSFT", ["Microsoft holds annual shareholder meeting"])
            .with_price_change("MSFT", 0.2)
    }

    async fn pause(&self) {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
    }

    fn check(&self, symbol: &str, feed: Feed) -> Result<()> {
        if self.failing.read().contains(&(key(symbol), feed)) {
            return Err(anyhow!("{feed:?} feed unavailable for {symbol}"));
        }
        Ok(())
    }
}

fn key(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

#[async_trait]
impl NewsSource for InMemoryProvider {
    async fn fetch_news_texts(&self, symbol: &str) -> Result<Vec<String>> {
        self.pause().await;
        self.check(symbol, Feed::News)?;
        Ok(self.news.read().get(&key(symbol)).cloned().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl SocialSource for InMemoryProvider {
    async fn fetch_social_posts(&self, symbol: &str) -> Result<Vec<SocialPost>> {
        self.pause().await;
        self.check(symbol, Feed::Social)?;
        Ok(self.social.read().get(&key(symbol)).cloned().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl MarketDataSource for InMemoryProvider {
    async fn fetch_stock_context(&self, symbol: &str) -> Result<StockContext> {
        self.pause().await;
        self.check(symbol, Feed::Market)?;
        self.market
            .read()
            .get(&key(symbol))
            .cloned()
            .ok_or_else(|| anyhow!("no price data available for {symbol}"))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_symbol_has_no_evidence_but_no_market() {
        let p = InMemoryProvider::new();
        assert!(p.fetch_news_texts("NOPE").await.unwrap().is_empty());
        assert!(p.fetch_social_posts("NOPE").await.unwrap().is_empty());
        assert!(p.fetch_stock_context("NOPE").await.is_err());
    }

    #[tokio::test]
    async fn lookups_are_case_insensitive_and_failures_scoped() {
        let p = InMemoryProvider::new()
            .with_news("aapl", ["x"])
            .failing("AAPL", Feed::Social);
        assert_eq!(p.fetch_news_texts("AAPL").await.unwrap(), vec!["x".to_string()]);
        assert!(p.fetch_social_posts("aapl").await.is_err());
        assert!(p.fetch_social_posts("MSFT").await.is_ok());
    }
}
