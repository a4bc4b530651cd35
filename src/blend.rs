//! # Sentiment blending
//! Linear combination of per-source sentiment values with configured weights:
//!
//! `value = news * w_news + social * w_social + technical * w_technical`
//!
//! Weights are not renormalized. A missing source contributes 0 at its
//! configured weight, and per-source confidence plays no part here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aggregate::{SourceKind, SourceSentiment};
use crate::sentiment::{label_for, SentimentLabel};

/// Per-source blend weights, loaded from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentWeights {
    pub news: f64,
    pub social: f64,
    pub technical: f64,
}

impl Default for SentimentWeights {
    fn default() -> Self {
        Self {
            news: 0.6,
            social: 0.3,
            technical: 0.1,
        }
    }
}

impl SentimentWeights {
    pub fn weight_for(&self, kind: SourceKind) -> f64 {
        match kind {
            SourceKind::News => self.news,
            SourceKind::Social => self.social,
        }
    }

    /// Finite and non-negative; the sum is unconstrained.
    pub fn validate(&self) -> Result<(), String> {
        for (name, w) in [
            ("news", self.news),
            ("social", self.social),
            ("technical", self.technical),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(format!(
                    "sentiment_weights.{name} must be a finite number >= 0 (got {w})"
                ));
            }
        }
        Ok(())
    }
}

/// Overall score for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedSentiment {
    pub value: f64,
    pub label: SentimentLabel,
}

/// Weighted sum over every configured source plus the technical term.
pub fn blend(
    sources: &BTreeMap<SourceKind, SourceSentiment>,
    weights: &SentimentWeights,
    technical_sentiment: f64,
) -> WeightedSentiment {
    let from_sources: f64 = SourceKind::ALL
        .iter()
        .map(|&kind| {
            let v = sources.get(&kind).map(|s| s.value).unwrap_or(0.0);
            v * weights.weight_for(kind)
        })
        .sum();

    let value = from_sources + technical_sentiment * weights.technical;
    WeightedSentiment {
        value,
        label: label_for(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src(value: f64, n: usize) -> SourceSentiment {
        SourceSentiment {
            value,
            sample_count: n,
            confidence: (n as f64 / 5.0).min(1.0),
            label: label_for(value),
        }
    }

    fn both(news: f64, social: f64) -> BTreeMap<SourceKind, SourceSentiment> {
        BTreeMap::from([
            (SourceKind::News, src(news, 5)),
            (SourceKind::Social, src(social, 10)),
        ])
    }

    #[test]
    fn weighted_sum_with_default_weights() {
        let w = SentimentWeights::default();
        let out = blend(&both(0.5, -0.2), &w, 0.0);
        assert!((out.value - (0.5 * 0.6 - 0.2 * 0.3)).abs() < 1e-12);
        assert_eq!(out.label, SentimentLabel::Positive);
    }

    #[test]
    fn linear_in_each_source() {
        let w = SentimentWeights {
            news: 0.7,
            social: 0.25,
            technical: 0.05,
        };
        let base = blend(&both(0.2, 0.3), &w, 0.0).value;

        let doubled_news = blend(&both(0.4, 0.3), &w, 0.0).value;
        assert!((doubled_news - base - w.news * 0.2).abs() < 1e-12);

        let doubled_social = blend(&both(0.2, 0.6), &w, 0.0).value;
        assert!((doubled_social - base - w.social * 0.3).abs() < 1e-12);
    }

    #[test]
    fn technical_term_is_weighted() {
        let w = SentimentWeights::default();
        let a = blend(&both(0.0, 0.0), &w, 0.0).value;
        let b = blend(&both(0.0, 0.0), &w, 1.0).value;
        assert!((b - a - 0.1).abs() < 1e-12);
    }

    /// Absent or zero-confidence sources still pull toward neutral at their
    /// full weight; nothing is renormalized.
    #[test]
    fn missing_source_counts_as_zero_without_renormalizing() {
        let w = SentimentWeights::default();
        let only_news = BTreeMap::from([(SourceKind::News, src(0.5, 5))]);
        let out = blend(&only_news, &w, 0.0);
        assert!((out.value - 0.3).abs() < 1e-12);

        let with_empty_social = BTreeMap::from([
            (SourceKind::News, src(0.5, 5)),
            (SourceKind::Social, SourceSentiment::zero_evidence()),
        ]);
        assert_eq!(blend(&with_empty_social, &w, 0.0), out);
    }

    #[test]
    fn weights_validation() {
        assert!(SentimentWeights::default().validate().is_ok());
        let neg = SentimentWeights {
            news: -0.1,
            ..SentimentWeights::default()
        };
        assert!(neg.validate().unwrap_err().contains("news"));
        let nan = SentimentWeights {
            technical: f64::NAN,
            ..SentimentWeights::default()
        };
        assert!(nan.validate().unwrap_err().contains("technical"));
        let heavy = SentimentWeights {
            news: 2.0,
            social: 2.0,
            technical: 2.0,
        };
        assert!(heavy.validate().is_ok());
    }
}
