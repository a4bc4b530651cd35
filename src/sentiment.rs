//! # Text sentiment scoring
//! Scores one text with two independent methods and fuses them:
//!
//! - `vader`: VADER compound score, tuned for short informal text (posts, headlines),
//!   shifted by market phrases VADER's general lexicon misreads ("beating
//!   estimates" is physical violence to VADER).
//! - `lexicon_polarity`: mean polarity of lexicon words found in the text, with
//!   intensifier and negation handling. General-purpose, better on formal prose.
//!
//! The fused score is the unweighted mean of the method scores. Labels come from
//! [`label_for`], the single threshold function used everywhere in the crate.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, Span};
use vader_sentiment::SentimentIntensityAnalyzer;

static LEXICON: Lazy<HashMap<String, f64>> = Lazy::new(|| {
    let raw = include_str!("../polarity_lexicon.json");
    serde_json::from_str::<HashMap<String, f64>>(raw).expect("valid polarity lexicon")
});

static VADER: Lazy<SentimentIntensityAnalyzer<'static>> =
    Lazy::new(SentimentIntensityAnalyzer::new);

/// Scores at or above this are positive, at or below its negation negative.
pub const LABEL_THRESHOLD: f64 = 0.1;

/// Characters kept in a display preview; scoring always uses the full text.
pub const PREVIEW_CHARS: usize = 100;

/// Market phrases and their bias, matched on whole tokens.
const FINANCE_PHRASES: &[(&str, f64)] = &[
    ("beat estimates", 0.6),
    ("beats estimates", 0.6),
    ("beating estimates", 0.6),
    ("beat expectations", 0.6),
    ("beats expectations", 0.6),
    ("beating expectations", 0.6),
    ("topped estimates", 0.5),
    ("record earnings", 0.4),
    ("record revenue", 0.4),
    ("record profit", 0.4),
    ("raises guidance", 0.5),
    ("raised guidance", 0.5),
    ("all time high", 0.5),
    ("upgrade", 0.3),
    ("upgraded", 0.3),
    ("outperform", 0.3),
    ("rally", 0.4),
    ("rallies", 0.4),
    ("surges", 0.4),
    ("soars", 0.5),
    ("miss estimates", -0.6),
    ("misses estimates", -0.6),
    ("missed estimates", -0.6),
    ("miss expectations", -0.6),
    ("misses expectations", -0.6),
    ("missed expectations", -0.6),
    ("cuts guidance", -0.5),
    ("cut guidance", -0.5),
    ("lowers guidance", -0.5),
    ("profit warning", -0.5),
    ("downgrade", -0.3),
    ("downgraded", -0.3),
    ("underperform", -0.3),
    ("sell off", -0.4),
    ("plunges", -0.4),
];

/// Share of the phrase bias added to the VADER compound.
const FINANCE_BOOST_FACTOR: f64 = 0.5;

const INTENSIFIER_FACTOR: f64 = 1.3;
const NEGATION_FACTOR: f64 = -0.5;
const NEGATION_WINDOW: usize = 3;

/// Categorical bucketing of a continuous sentiment value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        };
        f.write_str(s)
    }
}

/// `v >= 0.1` → positive, `v <= -0.1` → negative, otherwise neutral.
pub fn label_for(value: f64) -> SentimentLabel {
    if value >= LABEL_THRESHOLD {
        SentimentLabel::Positive
    } else if value <= -LABEL_THRESHOLD {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

/// Independent scoring methods fused into one per-text score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMethod {
    Vader,
    LexiconPolarity,
}

/// Immutable per-text result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextScore {
    pub method_scores: BTreeMap<ScoringMethod, f64>,
    pub fused_score: f64,
    pub label: SentimentLabel,
}

impl TextScore {
    fn neutral() -> Self {
        Self {
            method_scores: BTreeMap::from([
                (ScoringMethod::Vader, 0.0),
                (ScoringMethod::LexiconPolarity, 0.0),
            ]),
            fused_score: 0.0,
            label: SentimentLabel::Neutral,
        }
    }
}

/// A scored text paired with a display preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredText {
    pub preview: String,
    #[serde(flatten)]
    pub score: TextScore,
}

#[derive(Debug, Clone)]
pub struct SentimentAnalyzer {
    span: Span,
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self {
            span: tracing::debug_span!("text_scorer"),
        }
    }

    /// Attach the logging context this scorer reports under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Never fails; blank input yields a neutral score.
    pub fn score(&self, text: &str) -> TextScore {
        if text.trim().is_empty() {
            return TextScore::neutral();
        }

        let vader = finite_or_zero(market_vader(text));
        let polarity = finite_or_zero(lexicon_polarity(text));
        let fused = ((vader + polarity) / 2.0).clamp(-1.0, 1.0);

        self.span.in_scope(|| {
            debug!(vader, polarity, fused, chars = text.chars().count(), "text scored");
        });

        TextScore {
            method_scores: BTreeMap::from([
                (ScoringMethod::Vader, vader),
                (ScoringMethod::LexiconPolarity, polarity),
            ]),
            fused_score: fused,
            label: label_for(fused),
        }
    }

    /// Score each text, keeping a truncated preview for display.
    pub fn score_batch<S: AsRef<str>>(&self, texts: &[S]) -> Vec<ScoredText> {
        texts
            .iter()
            .map(|t| {
                let t = t.as_ref();
                ScoredText {
                    preview: preview(t),
                    score: self.score(t),
                }
            })
            .collect()
    }
}

/// First [`PREVIEW_CHARS`] characters, with `...` appended when truncated.
pub fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

fn vader_compound(text: &str) -> f64 {
    let scores = VADER.polarity_scores(text);
    scores.get("compound").copied().unwrap_or(0.0)
}

/// VADER compound plus half the market phrase bias, clamped to [-1, 1].
fn market_vader(text: &str) -> f64 {
    (vader_compound(text) + finance_boost(text) * FINANCE_BOOST_FACTOR).clamp(-1.0, 1.0)
}

fn finance_boost(text: &str) -> f64 {
    let joined = format!(" {} ", tokenize(text).collect::<Vec<_>>().join(" "));
    FINANCE_PHRASES
        .iter()
        .filter(|(phrase, _)| joined.contains(&format!(" {phrase} ")))
        .map(|(_, bias)| bias)
        .sum()
}

/// Mean lexicon polarity over matched tokens, clamped to [-1, 1].
///
/// An intensifier right before a word scales it by 1.3; a negator in the
/// previous 3 tokens flips and halves it.
fn lexicon_polarity(text: &str) -> f64 {
    let tokens: Vec<String> = tokenize(text).collect();
    let mut sum = 0.0;
    let mut matched = 0usize;

    for (i, tok) in tokens.iter().enumerate() {
        let Some(&base) = LEXICON.get(tok.as_str()) else {
            continue;
        };

        let mut p = base;
        if i >= 1 && is_intensifier(&tokens[i - 1]) {
            p *= INTENSIFIER_FACTOR;
        }
        let negated = (1..=NEGATION_WINDOW).any(|k| i >= k && is_negator(&tokens[i - k]));
        if negated {
            p *= NEGATION_FACTOR;
        }

        sum += p.clamp(-1.0, 1.0);
        matched += 1;
    }

    if matched == 0 {
        0.0
    } else {
        (sum / matched as f64).clamp(-1.0, 1.0)
    }
}

/// Lower-cased alphanumeric tokens; apostrophes stay inside words ("isn't").
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "won't"
            | "can't"
            | "cannot"
            | "don't"
            | "doesn't"
            | "didn't"
            | "without"
    )
}

fn is_intensifier(tok: &str) -> bool {
    matches!(
        tok,
        "very" | "extremely" | "really" | "highly" | "incredibly" | "hugely" | "super"
    )
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}
