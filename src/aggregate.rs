//! # Source aggregation
//! Combines many per-text scores from one source (news, social) into a single
//! `SourceSentiment` with an evidence-volume confidence.
//!
//! - Popularity-weighted items are *replicated* in the mean, at most
//!   [`MAX_REPLICATION`] times, so one viral post cannot dominate.
//! - Confidence is `min(sample_count / K, 1)` with a per-source saturation `K`.
//! - No items → the zero-evidence fallback (value 0, confidence 0, neutral).

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::iter;
use tracing::{debug, warn, Span};

use crate::sentiment::{label_for, SentimentAnalyzer, SentimentLabel};

/// Upper bound on how many times one item's score enters the mean.
pub const MAX_REPLICATION: usize = 5;

/// Origin category of text evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    News,
    Social,
}

impl SourceKind {
    pub const ALL: [SourceKind; 2] = [SourceKind::News, SourceKind::Social];

    /// Sample count at which confidence saturates at 1.0.
    pub fn saturation(self) -> usize {
        match self {
            SourceKind::News => 5,
            SourceKind::Social => 10,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::News => "news",
            SourceKind::Social => "social",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One piece of text evidence with an optional popularity weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceItem {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
}

impl SourceItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            weight: None,
        }
    }

    pub fn weighted(text: impl Into<String>, weight: i64) -> Self {
        Self {
            text: text.into(),
            weight: Some(weight),
        }
    }

    /// Copies of this item's score entering the mean: weight clamped to `1..=5`.
    pub fn replication(&self) -> usize {
        match self.weight {
            Some(w) if w > 0 => (w as u64).min(MAX_REPLICATION as u64) as usize,
            _ => 1,
        }
    }
}

/// Aggregated sentiment of one source for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSentiment {
    pub value: f64,
    pub sample_count: usize,
    pub confidence: f64,
    pub label: SentimentLabel,
}

impl SourceSentiment {
    /// Absence of signal: neutral, zero confidence.
    pub fn zero_evidence() -> Self {
        Self {
            value: 0.0,
            sample_count: 0,
            confidence: 0.0,
            label: SentimentLabel::Neutral,
        }
    }
}

impl Default for SourceSentiment {
    fn default() -> Self {
        Self::zero_evidence()
    }
}

/// `min(sample_count / K, 1.0)` for the given source.
pub fn confidence_for(kind: SourceKind, sample_count: usize) -> f64 {
    (sample_count as f64 / kind.saturation() as f64).min(1.0)
}

#[derive(Debug, Clone)]
pub struct SourceAggregator {
    scorer: SentimentAnalyzer,
    span: Span,
}

impl SourceAggregator {
    pub fn new(scorer: SentimentAnalyzer) -> Self {
        Self {
            scorer,
            span: tracing::debug_span!("source_aggregator"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn scorer(&self) -> &SentimentAnalyzer {
        &self.scorer
    }

    /// Score and combine items for one source. Blank items are malformed:
    /// they are skipped, logged and not counted.
    pub fn aggregate(&self, kind: SourceKind, items: &[SourceItem]) -> SourceSentiment {
        let _enter = self.span.enter();

        let mut replicated: Vec<f64> = Vec::with_capacity(items.len());
        let mut sample_count = 0usize;

        for (idx, item) in items.iter().enumerate() {
            if item.text.trim().is_empty() {
                warn!(source = %kind, index = idx, "skipping malformed item: empty text");
                counter!("items_skipped_total", "source" => kind.as_str()).increment(1);
                continue;
            }
            let score = self.scorer.score(&item.text).fused_score;
            replicated.extend(iter::repeat(score).take(item.replication()));
            sample_count += 1;
        }

        if replicated.is_empty() {
            debug!(source = %kind, "no usable items; zero-evidence fallback");
            return SourceSentiment::zero_evidence();
        }

        let value = replicated.iter().sum::<f64>() / replicated.len() as f64;
        let confidence = confidence_for(kind, sample_count);
        debug!(source = %kind, value, sample_count, confidence, "source aggregated");

        SourceSentiment {
            value,
            sample_count,
            confidence,
            label: label_for(value),
        }
    }
}

impl Default for SourceAggregator {
    fn default() -> Self {
        Self::new(SentimentAnalyzer::new())
    }
}
