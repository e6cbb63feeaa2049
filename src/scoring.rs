//! Lead quality scoring.
//!
//! `compute_score` maps extracted fields plus the two call-outcome flags to
//! an integer in `0..=100` used to rank leads. It is a pure function: no I/O,
//! no allocation, no shared state.

use crate::models::{
    Condition, ExtractedFields, Handover, Label, LeadListItem, Negotiation, Sentiment,
};
use serde::Serialize;

/// Score given to every lead whose call failed, is unknown, or needs a recall.
pub const DEPRIORITIZED_SCORE: u8 = 10;

pub const MIN_SCORE: i32 = 0;
pub const MAX_SCORE: i32 = 100;

/// Score threshold for a hot lead.
pub const HOT_THRESHOLD: i32 = 75;
/// Score threshold for a warm lead.
pub const WARM_THRESHOLD: i32 = 50;

/// Computes the lead score.
///
/// Returns [`DEPRIORITIZED_SCORE`] unless `call_successful` is `Some(true)`
/// and `needs_recall` is false. Otherwise sums the five component scores,
/// applies the completeness adjustment and clamps to `0..=100`.
pub fn compute_score(fields: &ExtractedFields, call_successful: Option<bool>, needs_recall: bool) -> u8 {
    if call_successful != Some(true) || needs_recall {
        return DEPRIORITIZED_SCORE;
    }

    let raw = handover_points(fields.expected_handover_date)
        + condition_points(fields.car_condition)
        + negotiation_points(fields.willingness_to_negotiate)
        + sentiment_points(fields.user_sentiment)
        + owner_points(fields.number_of_owners)
        + completeness_adjustment(known_field_count(fields));

    raw.clamp(MIN_SCORE, MAX_SCORE) as u8
}

/// Handover urgency, 0..=30.
pub fn handover_points(handover: Handover) -> i32 {
    match handover {
        Handover::Immediate => 30,
        Handover::OneToTwoWeeks => 24,
        Handover::TwoToFourWeeks => 16,
        Handover::Flexible => 12,
        Handover::Unclear => 8,
    }
}

/// Car condition, 0..=25.
pub fn condition_points(condition: Condition) -> i32 {
    match condition {
        Condition::Excellent => 25,
        Condition::Good => 20,
        Condition::Fair => 12,
        Condition::Poor => 5,
        Condition::Unclear => 10,
    }
}

/// Willingness to negotiate, 0..=20.
pub fn negotiation_points(negotiation: Negotiation) -> i32 {
    match negotiation {
        Negotiation::High => 20,
        Negotiation::Medium => 14,
        Negotiation::Low => 6,
        Negotiation::Unclear => 10,
    }
}

/// Seller sentiment, 0..=10.
pub fn sentiment_points(sentiment: Sentiment) -> i32 {
    match sentiment {
        Sentiment::Positive => 10,
        Sentiment::Neutral => 7,
        Sentiment::Negative => 3,
        Sentiment::Unclear => 6,
    }
}

/// Previous owners, 0..=10. Fewer owners scores higher; zero counts as one.
pub fn owner_points(owners: Option<u32>) -> i32 {
    match owners {
        None => 6,
        Some(0..=1) => 10,
        Some(2) => 8,
        Some(3) => 6,
        Some(_) => 4,
    }
}

/// Number of the six extracted fields that carry a known value.
pub fn known_field_count(fields: &ExtractedFields) -> usize {
    let checks = [
        fields.asking_price.is_some(),
        !fields.willingness_to_negotiate.is_unclear(),
        !fields.expected_handover_date.is_unclear(),
        !fields.car_condition.is_unclear(),
        fields.number_of_owners.is_some(),
        !fields.user_sentiment.is_unclear(),
    ];
    checks.iter().filter(|known| **known).count()
}

/// +5 for five or more known fields, -3 for two or fewer, 0 otherwise.
pub fn completeness_adjustment(known: usize) -> i32 {
    match known {
        5.. => 5,
        0..=2 => -3,
        _ => 0,
    }
}

/// Priority bucket derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreTier {
    Hot,
    Warm,
    Cold,
}

impl ScoreTier {
    pub fn from_score(score: i32) -> Self {
        if score >= HOT_THRESHOLD {
            ScoreTier::Hot
        } else if score >= WARM_THRESHOLD {
            ScoreTier::Warm
        } else {
            ScoreTier::Cold
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreTier::Hot => "Hot",
            ScoreTier::Warm => "Warm",
            ScoreTier::Cold => "Cold",
        }
    }
}

/// Aggregate numbers over a listed set of leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LeadSummary {
    pub total: usize,
    /// Hot leads that do not need a recall.
    pub hot: usize,
    pub needs_recall: usize,
    /// Mean score rounded to the nearest integer, 0 for no leads.
    pub average_score: i32,
}

impl LeadSummary {
    /// Builds a summary from `(score, needs_recall)` pairs.
    pub fn from_scores<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (i32, bool)>,
    {
        let mut summary = LeadSummary::default();
        let mut sum: i64 = 0;

        for (score, needs_recall) in rows {
            summary.total += 1;
            sum += i64::from(score);
            if needs_recall {
                summary.needs_recall += 1;
            } else if score >= HOT_THRESHOLD {
                summary.hot += 1;
            }
        }

        if summary.total > 0 {
            summary.average_score = (sum as f64 / summary.total as f64).round() as i32;
        }

        summary
    }

    pub fn from_leads(leads: &[LeadListItem]) -> Self {
        Self::from_scores(leads.iter().map(|lead| (lead.score, lead.needs_recall)))
    }
}
