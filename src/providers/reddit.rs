// src/providers/reddit.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::{join_title_body, normalize_text, truncate_chars, RateLimiter, SocialPost, SocialSource};

pub const DEFAULT_BASE_URL: &str = "https://www.reddit.com";

/// Posts with a body this short or shorter carry no opinion worth scoring.
const MIN_BODY_CHARS: usize = 20;
const MAX_BODY_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    score: i64,
}

/// Recent discussion posts from a set of subreddits via the public search API.
pub struct RedditSocial {
    mode: Mode,
    subreddits: Vec<String>,
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

impl RedditSocial {
    /// One fixed listing document answers every subreddit query.
    pub fn from_fixture(json: &str, subreddits: Vec<String>, limit: usize) -> Self {
        Self {
            mode: Mode::Fixture(json.to_string()),
            subreddits,
            limit,
        }
    }

    pub fn http(
        client: reqwest::Client,
        limiter: RateLimiter,
        subreddits: Vec<String>,
        limit: usize,
    ) -> Self {
        Self::http_with_base(DEFAULT_BASE_URL, client, limiter, subreddits, limit)
    }

    pub fn http_with_base(
        base_url: impl Into<String>,
        client: reqwest::Client,
        limiter: RateLimiter,
        subreddits: Vec<String>,
        limit: usize,
    ) -> Self {
        Self {
            mode: Mode::Http {
                base_url: base_url.into(),
                client,
                limiter,
            },
            subreddits,
            limit,
        }
    }

    /// Total limit split evenly across subreddits, at least one each.
    fn per_subreddit_limit(&self) -> usize {
        (self.limit / self.subreddits.len().max(1)).max(1)
    }

    fn parse_posts(json: &str, per_sub: usize) -> Result<Vec<SocialPost>> {
        let listing: Listing = serde_json::from_str(json).context("parsing reddit listing")?;
        Ok(listing
            .data
            .children
            .into_iter()
            .take(per_sub)
            .filter(|c| c.data.selftext.trim().chars().count() > MIN_BODY_CHARS)
            .map(|c| {
                let body = truncate_chars(&c.data.selftext, MAX_BODY_CHARS);
                SocialPost {
                    text: normalize_text(&join_title_body(&c.data.title, &body)),
                    popularity: c.data.score,
                }
            })
            .collect())
    }

    async fn fetch_subreddit(&self, subreddit: &str, symbol: &str) -> Result<Vec<SocialPost>> {
        let per_sub = self.per_subreddit_limit();
        match &self.mode {
            Mode::Fixture(json) => Self::parse_posts(json, per_sub),
            Mode::Http {
                base_url,
                client,
                limiter,
            } => {
                let url = format!("{base_url}/r/{subreddit}/search.json");
                let query = format!("{symbol} OR ${symbol}");
                let limit = per_sub.to_string();
                let body = {
                    let _guard = limiter.acquire().await?;
                    client
                        .get(&url)
                        .query(&[
                            ("q", query.as_str()),
                            ("restrict_sr", "1"),
                            ("t", "week"),
                            ("limit", limit.as_str()),
                        ])
                        .send()
                        .await
                        .with_context(|| format!("reddit get() r/{subreddit}"))?
                        .error_for_status()
                        .with_context(|| format!("reddit status r/{subreddit}"))?
                        .text()
                        .await
                        .context("reddit .text()")?
                };
                Self::parse_posts(&body, per_sub)
            }
        }
    }
}

#[async_trait]
impl SocialSource for RedditSocial {
    /// A failing subreddit is logged and skipped; only if every one fails is
    /// the whole fetch an error.
    async fn fetch_social_posts(&self, symbol: &str) -> Result<Vec<SocialPost>> {
        let mut posts = Vec::new();
        let mut failures = 0usize;

        for sub in &self.subreddits {
            match self.fetch_subreddit(sub, symbol).await {
                Ok(mut v) => posts.append(&mut v),
                Err(e) => {
                    failures += 1;
                    warn!(error = ?e, subreddit = %sub, %symbol, "subreddit fetch failed");
                }
            }
        }

        if !self.subreddits.is_empty() && failures == self.subreddits.len() {
            return Err(anyhow!("all {failures} subreddit queries failed for {symbol}"));
        }
        Ok(posts)
    }

    fn name(&self) -> &'static str {
        "reddit"
    }
}
