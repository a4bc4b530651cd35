//! Price and fundamentals context for one symbol, as supplied by a market data
//! collaborator. Read-only input to the recommendation policy.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_change_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pe_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

impl StockContext {
    /// Price change from two consecutive closes, in percent rounded to 2 decimals.
    pub fn change_pct(previous: f64, current: f64) -> Option<f64> {
        if previous == 0.0 || !previous.is_finite() || !current.is_finite() {
            return None;
        }
        Some(round2((current - previous) / previous * 100.0))
    }
}

/// Market context as seen by the analysis: either data, or why there is none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MarketContext {
    Available(StockContext),
    Unavailable { reason: String },
}

impl MarketContext {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        MarketContext::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn stock(&self) -> Option<&StockContext> {
        match self {
            MarketContext::Available(ctx) => Some(ctx),
            MarketContext::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, MarketContext::Available(_))
    }
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn change_pct_rounds_to_two_decimals() {
        assert_eq!(StockContext::change_pct(200.0, 203.0), Some(1.5));
        assert_eq!(StockContext::change_pct(3.0, 2.0), Some(-33.33));
        assert_eq!(StockContext::change_pct(0.0, 2.0), None);
    }

    #[test]
    fn serializes_with_status_tag() {
        let ctx = MarketContext::Available(StockContext {
            current_price: Some(101.25),
            price_change_pct: Some(-0.4),
            company_name: Some("Example Corp".into()),
            ..StockContext::default()
        });
        let v = serde_json::to_value(&ctx).unwrap();
        assert_eq!(v["status"], json!("available"));
        assert_eq!(v["current_price"], json!(101.25));
        assert!(v.get("volume").is_none());

        let un = serde_json::to_value(MarketContext::unavailable("no price data")).unwrap();
        assert_eq!(un, json!({"status": "unavailable", "reason": "no price data"}));
    }
}
