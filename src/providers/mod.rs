// src/providers/mod.rs
//! External collaborators: news texts, social posts, market context.
//!
//! The analysis core only sees the traits below. Implementations own their
//! I/O, text cleanup, result limits and rate limiting.

pub mod memory;
pub mod rate_limiter;
pub mod reddit;
pub mod yahoo_chart;
pub mod yahoo_rss;

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::aggregate::SourceItem;
use crate::market::StockContext;

pub use memory::InMemoryProvider;
pub use rate_limiter::{RateLimitGuard, RateLimiter};
pub use reddit::RedditSocial;
pub use yahoo_chart::YahooChartMarket;
pub use yahoo_rss::YahooRssNews;

/// A social post with its popularity (upvote score, may be ≤ 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialPost {
    pub text: String,
    pub popularity: i64,
}

impl From<SocialPost> for SourceItem {
    fn from(p: SocialPost) -> Self {
        SourceItem::weighted(p.text, p.popularity)
    }
}

#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Title + summary concatenations, most recent first.
    async fn fetch_news_texts(&self, symbol: &str) -> Result<Vec<String>>;
    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait SocialSource: Send + Sync {
    async fn fetch_social_posts(&self, symbol: &str) -> Result<Vec<SocialPost>>;
    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// `Err` means the context is unavailable for this symbol.
    async fn fetch_stock_context(&self, symbol: &str) -> Result<StockContext>;
    fn name(&self) -> &'static str;
}

/// Clean provider text: decode entities, strip tags, unify quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, "").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// `"{title}. {body}"`, or whichever part is non-empty.
pub fn join_title_body(title: &str, body: &str) -> String {
    let (t, b) = (title.trim(), body.trim());
    match (t.is_empty(), b.is_empty()) {
        (false, false) => format!("{t}. {b}"),
        (false, true) => t.to_string(),
        (true, false) => b.to_string(),
        (true, true) => String::new(),
    }
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_strips_tags_and_entities() {
        let s = "  <p>Apple&nbsp;&amp; peers   <b>rally</b></p>\n\n \u{201C}again\u{201D} ";
        assert_eq!(normalize_text(s), "Apple & peers rally \"again\"");
    }

    #[test]
    fn join_handles_missing_parts() {
        assert_eq!(join_title_body("Title", "Body"), "Title. Body");
        assert_eq!(join_title_body("Title", "  "), "Title");
        assert_eq!(join_title_body("", "Body"), "Body");
        assert_eq!(join_title_body(" ", ""), "");
    }

    #[test]
    fn social_post_becomes_weighted_item() {
        let item: SourceItem = SocialPost {
            text: "to the moon".into(),
            popularity: 42,
        }
        .into();
        assert_eq!(item.weight, Some(42));
        assert_eq!(item.replication(), 5);
    }
}
