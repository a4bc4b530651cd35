// src/providers/yahoo_rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use super::{join_title_body, normalize_text, NewsSource, RateLimiter};

pub const DEFAULT_FEED_URL: &str = "https://feeds.finance.yahoo.com/rss/2.0/headline";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> i64 {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .map(|dt| dt.unix_timestamp())
        .unwrap_or(0)
}

/// Headline news per symbol from the Yahoo Finance RSS feed.
pub struct YahooRssNews {
    mode: Mode,
    limit: usize,
}

enum Mode {
    Fixture(String),
    Http {
        base_url: String,
        client: reqwest::Client,
        limiter: RateLimiter,
    },
}

impl YahooRssNews {
    /// Parse a fixed RSS document for every symbol (tests, offline runs).
    pub fn from_fixture(xml: &str, limit: usize) -> Self {
        Self {
            mode: Mode::Fixture(xml.to_string()),
            limit,
        }
    }

    pub fn http(client: reqwest::Client, limiter: RateLimiter, limit: usize) -> Self {
        Self::http_with_base(DEFAULT_FEED_URL, client, limiter, limit)
    }

    pub fn http_with_base(
        base_url: impl Into<String>,
        client: reqwest::Client,
        limiter: RateLimiter,
        limit: usize,
    ) -> Self {
        Self {
            mode: Mode::Http {
                base_url: base_url.into(),
                client,
                limiter,
            },
            limit,
        }
    }

    /// Newest first, at most `limit` texts, blanks dropped.
    fn parse_texts(xml: &str, limit: usize) -> Result<Vec<String>> {
        let rss: Rss = from_str(&scrub_html_entities_for_xml(xml)).context("parsing news rss xml")?;

        let mut items: Vec<(i64, String)> = rss
            .channel
            .item
            .into_iter()
            .filter_map(|it| {
                let text = normalize_text(&join_title_body(
                    it.title.as_deref().unwrap_or_default(),
                    it.description.as_deref().unwrap_or_default(),
                ));
                if text.is_empty() {
                    return None;
                }
                let ts = it.pub_date.as_deref().map(parse_rfc2822_to_unix).unwrap_or(0);
                Some((ts, text))
            })
            .collect();

        // Stable sort keeps feed order among equal/missing dates.
        items.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(items.into_iter().take(limit).map(|(_, t)| t).collect())
    }
}

#[async_trait]
impl NewsSource for YahooRssNews {
    async fn fetch_news_texts(&self, symbol: &str) -> Result<Vec<String>> {
        match &self.mode {
            Mode::Fixture(xml) => Self::parse_texts(xml, self.limit),
            Mode::Http {
                base_url,
                client,
                limiter,
            } => {
                let body = {
                    let _guard = limiter.acquire().await?;
                    client
                        .get(base_url.as_str())
                        .query(&[("s", symbol), ("region", "US"), ("lang", "en-US")])
                        .send()
                        .await
                        .context("news rss get()")?
                        .error_for_status()
                        .context("news rss status")?
                        .text()
                        .await
                        .context("news rss .text()")?
                };
                Self::parse_texts(&body, self.limit)
            }
        }
    }

    fn name(&self) -> &'static str {
        "yahoo_rss"
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
