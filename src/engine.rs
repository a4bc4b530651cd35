//! # Recommendation engine
//! Pure, testable mapping `(weighted sentiment, market context)` → `Recommendation`.
//! No I/O.
//!
//! Branches are evaluated in a fixed order and the first match wins, so the
//! momentum-conjunction branches shadow the plain threshold ones:
//!
//! 1. context unavailable → HOLD (insufficient data)
//! 2. sentiment > 0.3 and price change > 0 → BUY (momentum)
//! 3. sentiment > 0.1 → BUY
//! 4. sentiment < -0.3 and price change < 0 → SELL (decline)
//! 5. sentiment < -0.1 → SELL
//! 6. otherwise → HOLD

use crate::decision::{Recommendation, RecommendationReason};
use crate::market::MarketContext;

const STRONG: f64 = 0.3;
const MILD: f64 = 0.1;

pub fn recommend(sentiment: f64, context: &MarketContext) -> Recommendation {
    recommend_reason(sentiment, context).into()
}

pub fn recommend_reason(sentiment: f64, context: &MarketContext) -> RecommendationReason {
    let Some(stock) = context.stock() else {
        return RecommendationReason::InsufficientData;
    };

    // Missing change counts as flat.
    let change = stock.price_change_pct.unwrap_or(0.0);

    if sentiment > STRONG && change > 0.0 {
        RecommendationReason::StrongPositiveWithMomentum
    } else if sentiment > MILD {
        RecommendationReason::PositiveSentiment
    } else if sentiment < -STRONG && change < 0.0 {
        RecommendationReason::StrongNegativeWithDecline
    } else if sentiment < -MILD {
        RecommendationReason::NegativeSentiment
    } else {
        RecommendationReason::NeutralSentiment
    }
}
