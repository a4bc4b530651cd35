// src/providers/yahoo_chart.rs
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::{MarketDataSource, RateLimiter};
use crate::market::{round2, StockContext};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
pub const DEFAULT_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Meta,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Meta {
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryEnvelope {
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    #[serde(default)]
    result: Option<Vec<SummaryResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResult {
    #[serde(default)]
    price: Option<PriceModule>,
    #[serde(default)]
    summary_detail: Option<SummaryDetail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    #[serde(default)]
    market_cap: Option<RawValue>,
    #[serde(default)]
    long_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    #[serde(default)]
    market_cap: Option<RawValue>,
    #[serde(default, rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`, or `{}` when absent.
#[derive(Debug, Default, Deserialize)]
struct RawValue {
    #[serde(default)]
    raw: Option<f64>,
}

impl RawValue {
    fn get(v: &Option<RawValue>) -> Option<f64> {
        v.as_ref().and_then(|r| r.raw).filter(|x| x.is_finite())
    }
}

/// Market cap, P/E and name from the quoteSummary endpoint.
#[derive(Debug, Default, Clone, PartialEq)]
struct Fundamentals {
    market_cap: Option<f64>,
    pe_ratio: Option<f64>,
    company_name: Option<String>,
}

/// Price context from the last five daily bars of the Yahoo chart API, with
/// fundamentals from quoteSummary when available.
pub struct YahooChartMarket {
    mode: Mode,
}

enum Mode {
    Fixture {
        chart: String,
        summary: Option<String>,
    },
    Http {
        base_url: String,
        summary_url: String,
        client: reqwest::Client,
        limiter: RateLimiter,
    },
}

impl YahooChartMarket {
    pub fn from_fixture(json: &str) -> Self {
        Self {
            mode: Mode::Fixture {
                chart: json.to_string(),
                summary: None,
            },
        }
    }

    /// Chart and quoteSummary documents answering every symbol.
    pub fn from_fixtures(chart: &str, summary: &str) -> Self {
        Self {
            mode: Mode::Fixture {
                chart: chart.to_string(),
                summary: Some(summary.to_string()),
            },
        }
    }

    pub fn http(client: reqwest::Client, limiter: RateLimiter) -> Self {
        Self::http_with_base(DEFAULT_BASE_URL, DEFAULT_SUMMARY_URL, client, limiter)
    }

    pub fn http_with_base(
        base_url: impl Into<String>,
        summary_url: impl Into<String>,
        client: reqwest::Client,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            mode: Mode::Http {
                base_url: base_url.into(),
                summary_url: summary_url.into(),
                client,
                limiter,
            },
        }
    }

    fn parse_fundamentals(json: &str, symbol: &str) -> Result<Fundamentals> {
        let env: SummaryEnvelope = serde_json::from_str(json).context("parsing quoteSummary json")?;
        if let Some(err) = env.quote_summary.error {
            bail!("quoteSummary error for {symbol}: {}", err.description);
        }
        let result = env
            .quote_summary
            .result
            .and_then(|mut v| if v.is_empty() { None } else { Some(v.swap_remove(0)) })
            .unwrap_or_default();
        let price = result.price.unwrap_or_default();
        let detail = result.summary_detail.unwrap_or_default();

        Ok(Fundamentals {
            market_cap: RawValue::get(&price.market_cap).or(RawValue::get(&detail.market_cap)),
            pe_ratio: RawValue::get(&detail.trailing_pe).map(round2),
            company_name: price.long_name.filter(|n| !n.trim().is_empty()),
        })
    }

    /// Fundamentals are optional: a failure is logged and leaves them empty.
    fn merge(
        mut ctx: StockContext,
        fundamentals: Result<Fundamentals>,
        symbol: &str,
    ) -> StockContext {
        match fundamentals {
            Ok(f) => {
                ctx.market_cap = f.market_cap;
                ctx.pe_ratio = f.pe_ratio;
                if f.company_name.is_some() {
                    ctx.company_name = f.company_name;
                }
            }
            Err(e) => warn!(error = ?e, %symbol, "quoteSummary unavailable; fundamentals left empty"),
        }
        ctx
    }

    fn parse_context(json: &str, symbol: &str) -> Result<StockContext> {
        let env: ChartEnvelope = serde_json::from_str(json).context("parsing chart json")?;
        if let Some(err) = env.chart.error {
            bail!("chart api error for {symbol}: {}", err.description);
        }
        let result = env
            .chart
            .result
            .and_then(|mut v| if v.is_empty() { None } else { Some(v.swap_remove(0)) })
            .ok_or_else(|| anyhow!("no chart result for {symbol}"))?;

        let quote = result
            .indicators
            .and_then(|mut i| if i.quote.is_empty() { None } else { Some(i.quote.swap_remove(0)) })
            .ok_or_else(|| anyhow!("no price data available for {symbol}"))?;

        // Bars with a missing close are skipped; volume follows the same bar.
        let bars: Vec<(f64, Option<u64>)> = quote
            .close
            .iter()
            .enumerate()
            .filter_map(|(i, c)| (*c).map(|c| (c, quote.volume.get(i).copied().flatten())))
            .collect();

        let Some(&(current, volume)) = bars.last() else {
            bail!("no price data available for {symbol}");
        };
        let previous = if bars.len() > 1 {
            bars[bars.len() - 2].0
        } else {
            current
        };

        Ok(StockContext {
            current_price: Some(round2(current)),
            price_change_pct: StockContext::change_pct(previous, current),
            volume: Some(volume.unwrap_or(0)),
            market_cap: None,
            pe_ratio: None,
            company_name: Some(
                result
                    .meta
                    .long_name
                    .or(result.meta.short_name)
                    .unwrap_or_else(|| symbol.to_string()),
            ),
        })
    }
}

#[async_trait]
impl MarketDataSource for YahooChartMarket {
    async fn fetch_stock_context(&self, symbol: &str) -> Result<StockContext> {
        match &self.mode {
            Mode::Fixture { chart, summary } => {
                let ctx = Self::parse_context(chart, symbol)?;
                Ok(match summary {
                    Some(json) => Self::merge(ctx, Self::parse_fundamentals(json, symbol), symbol),
                    None => ctx,
                })
            }
            Mode::Http {
                base_url,
                summary_url,
                client,
                limiter,
            } => {
                let url = format!("{base_url}/{symbol}");
                let body = {
                    let _guard = limiter.acquire().await?;
                    client
                        .get(&url)
                        .query(&[("range", "5d"), ("interval", "1d")])
                        .send()
                        .await
                        .context("chart get()")?
                        .error_for_status()
                        .context("chart status")?
                        .text()
                        .await
                        .context("chart .text()")?
                };
                let ctx = Self::parse_context(&body, symbol)?;

                let summary = async {
                    let _guard = limiter.acquire().await?;
                    client
                        .get(format!("{summary_url}/{symbol}"))
                        .query(&[("modules", "price,summaryDetail")])
                        .send()
                        .await
                        .context("quoteSummary get()")?
                        .error_for_status()
                        .context("quoteSummary status")?
                        .text()
                        .await
                        .context("quoteSummary .text()")
                }
                .await
                .and_then(|body| Self::parse_fundamentals(&body, symbol));

                Ok(Self::merge(ctx, summary, symbol))
            }
        }
    }

    fn name(&self) -> &'static str {
        "yahoo_chart"
    }
}
