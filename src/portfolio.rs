//! # Portfolio and sector rollups
//! Summaries over already-computed per-symbol analyses. Pure functions; the
//! batch fetching lives in [`crate::analyzer`].
//!
//! Bucketing uses strict bounds: bullish `> 0.1`, bearish `< -0.1`, neutral
//! otherwise (both ±0.1 are neutral).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::analyzer::AnalysisResult;
use crate::sentiment::{label_for, SentimentLabel};

const BUCKET_THRESHOLD: f64 = 0.1;

/// Counts and mean over a set of analyzed symbols.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub count: usize,
    pub average_sentiment: f64,
    pub bullish_count: usize,
    pub bearish_count: usize,
    pub neutral_count: usize,
}

/// Batch results with their summary; what the portfolio endpoint returns.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioReport {
    pub results: Vec<AnalysisResult>,
    pub summary: PortfolioSummary,
}

impl PortfolioReport {
    pub fn new(results: Vec<AnalysisResult>) -> Self {
        let summary = summarize(&results);
        Self { results, summary }
    }
}

/// Empty input → all zeros.
pub fn summarize(results: &[AnalysisResult]) -> PortfolioSummary {
    summarize_values(results.iter().map(|r| r.weighted.value))
}

pub fn summarize_values(values: impl IntoIterator<Item = f64>) -> PortfolioSummary {
    let mut s = PortfolioSummary::default();
    let mut total = 0.0;
    for v in values {
        s.count += 1;
        total += v;
        if v > BUCKET_THRESHOLD {
            s.bullish_count += 1;
        } else if v < -BUCKET_THRESHOLD {
            s.bearish_count += 1;
        } else {
            s.neutral_count += 1;
        }
    }
    if s.count > 0 {
        s.average_sentiment = total / s.count as f64;
    }
    s
}

/// Mean sentiment of the symbols in one sector that analyzed successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorSummary {
    pub average_sentiment: f64,
    pub label: SentimentLabel,
    pub stocks_analyzed: usize,
}

impl SectorSummary {
    /// `None` when nothing in the sector analyzed; such sectors are omitted.
    pub fn from_results(results: &[AnalysisResult]) -> Option<Self> {
        if results.is_empty() {
            return None;
        }
        let average = results.iter().map(|r| r.weighted.value).sum::<f64>() / results.len() as f64;
        Some(Self {
            average_sentiment: average,
            label: label_for(average),
            stocks_analyzed: results.len(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedSector {
    pub sector: String,
    #[serde(flatten)]
    pub summary: SectorSummary,
}

/// Most positive sector first; ties keep name order.
pub fn rank_sectors(sectors: BTreeMap<String, SectorSummary>) -> Vec<RankedSector> {
    let mut ranked: Vec<RankedSector> = sectors
        .into_iter()
        .map(|(sector, summary)| RankedSector { sector, summary })
        .collect();
    ranked.sort_by(|a, b| {
        b.summary
            .average_sentiment
            .partial_cmp(&a.summary.average_sentiment)
            .unwrap_or(Ordering::Equal)
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_portfolio_is_all_zeros() {
        assert_eq!(summarize(&[]), PortfolioSummary::default());
        assert_eq!(summarize_values([]).average_sentiment, 0.0);
    }

    #[test]
    fn boundaries_are_neutral() {
        let s = summarize_values([0.1, -0.1, 0.1000001, -0.1000001, 0.0]);
        assert_eq!(s.count, 5);
        assert_eq!(s.bullish_count, 1);
        assert_eq!(s.bearish_count, 1);
        assert_eq!(s.neutral_count, 3);
    }

    #[test]
    fn counts_add_up_and_mean_is_plain() {
        let vals = [0.4, 0.2, -0.5, 0.05];
        let s = summarize_values(vals);
        assert_eq!(s.bullish_count + s.bearish_count + s.neutral_count, s.count);
        assert!((s.average_sentiment - 0.0375).abs() < 1e-12);
    }

    #[test]
    fn ranking_is_descending() {
        let mk = |v: f64| SectorSummary {
            average_sentiment: v,
            label: label_for(v),
            stocks_analyzed: 1,
        };
        let sectors = BTreeMap::from([
            ("Banking".to_string(), mk(-0.2)),
            ("Technology".to_string(), mk(0.3)),
            ("Energy".to_string(), mk(0.0)),
        ]);
        let names: Vec<String> = rank_sectors(sectors).into_iter().map(|r| r.sector).collect();
        assert_eq!(names, ["Technology", "Energy", "Banking"]);
    }
}
