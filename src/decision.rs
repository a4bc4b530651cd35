//! Recommendation output: a verdict plus the rule that produced it.
//!
//! The rendered form (`"BUY - Positive sentiment detected"`) is what dashboards
//! and reports consume; the structured fields keep it easy to test and filter.

use serde::{Deserialize, Serialize};

/// Market action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Buy,
    Hold,
    Sell,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Buy => "BUY",
            Verdict::Hold => "HOLD",
            Verdict::Sell => "SELL",
        }
    }
}

/// Which policy branch fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationReason {
    InsufficientData,
    StrongPositiveWithMomentum,
    PositiveSentiment,
    StrongNegativeWithDecline,
    NegativeSentiment,
    NeutralSentiment,
}

impl RecommendationReason {
    pub fn verdict(self) -> Verdict {
        match self {
            RecommendationReason::StrongPositiveWithMomentum
            | RecommendationReason::PositiveSentiment => Verdict::Buy,
            RecommendationReason::StrongNegativeWithDecline
            | RecommendationReason::NegativeSentiment => Verdict::Sell,
            RecommendationReason::InsufficientData | RecommendationReason::NeutralSentiment => {
                Verdict::Hold
            }
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            RecommendationReason::InsufficientData => "Insufficient data",
            RecommendationReason::StrongPositiveWithMomentum => {
                "Strong positive sentiment with price momentum"
            }
            RecommendationReason::PositiveSentiment => "Positive sentiment detected",
            RecommendationReason::StrongNegativeWithDecline => {
                "Strong negative sentiment with price decline"
            }
            RecommendationReason::NegativeSentiment => "Negative sentiment detected",
            RecommendationReason::NeutralSentiment => "Neutral sentiment",
        }
    }
}

/// Verdict + reason, rendered as `"<VERDICT> - <message>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub verdict: Verdict,
    pub reason: RecommendationReason,
    /// Rendered form, e.g. "BUY - Positive sentiment detected".
    pub text: String,
}

impl From<RecommendationReason> for Recommendation {
    fn from(reason: RecommendationReason) -> Self {
        let verdict = reason.verdict();
        Self {
            verdict,
            reason,
            text: format!("{} - {}", verdict.as_str(), reason.message()),
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rendered_strings_match_policy_wording() {
        let cases = [
            (RecommendationReason::InsufficientData, "HOLD - Insufficient data"),
            (
                RecommendationReason::StrongPositiveWithMomentum,
                "BUY - Strong positive sentiment with price momentum",
            ),
            (RecommendationReason::PositiveSentiment, "BUY - Positive sentiment detected"),
            (
                RecommendationReason::StrongNegativeWithDecline,
                "SELL - Strong negative sentiment with price decline",
            ),
            (RecommendationReason::NegativeSentiment, "SELL - Negative sentiment detected"),
            (RecommendationReason::NeutralSentiment, "HOLD - Neutral sentiment"),
        ];
        for (reason, expected) in cases {
            assert_eq!(Recommendation::from(reason).to_string(), expected);
        }
    }

    #[test]
    fn serialize_shape() {
        let r = Recommendation::from(RecommendationReason::PositiveSentiment);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["verdict"], json!("BUY"));
        assert_eq!(v["reason"], json!("positive_sentiment"));
        assert_eq!(v["text"], json!("BUY - Positive sentiment detected"));
    }
}
