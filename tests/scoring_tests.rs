/// Scoring scenarios and component behaviour
use lead_ai::models::{Condition, ExtractedFields, Handover, Label, Negotiation, Sentiment};
use lead_ai::scoring::{compute_score, condition_points, DEPRIORITIZED_SCORE};

fn fields(
    handover: Handover,
    condition: Condition,
    negotiation: Negotiation,
    sentiment: Sentiment,
    owners: Option<u32>,
    asking_price: Option<f64>,
) -> ExtractedFields {
    ExtractedFields {
        asking_price,
        willingness_to_negotiate: negotiation,
        expected_handover_date: handover,
        car_condition: condition,
        number_of_owners: owners,
        user_sentiment: sentiment,
        ..Default::default()
    }
}

fn best_case() -> ExtractedFields {
    fields(
        Handover::Immediate,
        Condition::Excellent,
        Negotiation::High,
        Sentiment::Positive,
        Some(1),
        Some(10_000.0),
    )
}

#[cfg(test)]
mod scenario_tests {
    use super::*;

    #[test]
    fn best_case_lead_is_capped_at_100() {
        // 30 + 25 + 20 + 10 + 10 = 95, six known fields: +5
        assert_eq!(compute_score(&best_case(), Some(true), false), 100);
    }

    #[test]
    fn all_unknown_lead_scores_37() {
        // 8 + 10 + 10 + 6 + 6 = 40, nothing known: -3
        assert_eq!(
            compute_score(&ExtractedFields::default(), Some(true), false),
            37
        );
    }

    #[test]
    fn failed_call_scores_10() {
        assert_eq!(compute_score(&best_case(), Some(false), false), 10);
    }

    #[test]
    fn recall_scores_10_even_for_best_case() {
        assert_eq!(compute_score(&best_case(), Some(true), true), 10);
    }

    #[test]
    fn weak_lead_with_five_known_fields_scores_39() {
        let lead = fields(
            Handover::TwoToFourWeeks,
            Condition::Poor,
            Negotiation::Low,
            Sentiment::Negative,
            Some(4),
            None,
        );
        // 16 + 5 + 6 + 3 + 4 = 34, five known fields: +5
        assert_eq!(compute_score(&lead, Some(true), false), 39);
    }
}

#[cfg(test)]
mod gating_tests {
    use super::*;

    #[test]
    fn unknown_call_result_is_deprioritized() {
        assert_eq!(compute_score(&best_case(), None, false), DEPRIORITIZED_SCORE);
        assert_eq!(compute_score(&best_case(), None, true), DEPRIORITIZED_SCORE);
    }

    #[test]
    fn failed_call_with_recall_is_deprioritized() {
        assert_eq!(
            compute_score(&ExtractedFields::default(), Some(false), true),
            DEPRIORITIZED_SCORE
        );
    }
}

#[cfg(test)]
mod component_tests {
    use super::*;

    #[test]
    fn immediate_handover_beats_flexible_by_18() {
        // Keep the total well under the cap so clamping cannot interfere
        let mut lead = fields(
            Handover::Flexible,
            Condition::Fair,
            Negotiation::Low,
            Sentiment::Neutral,
            Some(2),
            Some(5_000.0),
        );
        let flexible = compute_score(&lead, Some(true), false);

        lead.expected_handover_date = Handover::Immediate;
        let immediate = compute_score(&lead, Some(true), false);

        assert_eq!(i32::from(immediate) - i32::from(flexible), 18);
    }

    #[test]
    fn fifth_known_field_adds_the_completeness_bonus() {
        // Four known fields: price, handover, condition, negotiation
        let mut lead = fields(
            Handover::OneToTwoWeeks,
            Condition::Good,
            Negotiation::Medium,
            Sentiment::Unclear,
            None,
            Some(7_500.0),
        );
        let four_known = compute_score(&lead, Some(true), false);
        // 24 + 20 + 14 + 6 + 6 = 70, +0
        assert_eq!(four_known, 70);

        // Owners = 3 scores the same 6 points as absent, so only the bonus changes
        lead.number_of_owners = Some(3);
        let five_known = compute_score(&lead, Some(true), false);
        assert_eq!(five_known, 75);
    }

    #[test]
    fn three_known_fields_have_no_penalty() {
        let lead = fields(
            Handover::Flexible,
            Condition::Unclear,
            Negotiation::Unclear,
            Sentiment::Neutral,
            Some(2),
            None,
        );
        // 12 + 10 + 10 + 7 + 8 = 47, three known: 0
        assert_eq!(compute_score(&lead, Some(true), false), 47);
    }

    #[test]
    fn two_known_fields_take_the_penalty() {
        let lead = fields(
            Handover::Flexible,
            Condition::Unclear,
            Negotiation::Unclear,
            Sentiment::Neutral,
            None,
            None,
        );
        // 12 + 10 + 10 + 7 + 6 = 45, two known: -3
        assert_eq!(compute_score(&lead, Some(true), false), 42);
    }

    #[test]
    fn zero_owners_count_as_known_single_owner() {
        let mut lead = ExtractedFields::default();
        lead.number_of_owners = Some(0);
        // 8 + 10 + 10 + 6 + 10 = 44, one known: -3
        assert_eq!(compute_score(&lead, Some(true), false), 41);
    }

    #[test]
    fn out_of_domain_condition_scores_like_unclear() {
        let parsed = Condition::from_label("like new, barely driven");
        assert_eq!(parsed, Condition::Unclear);
        assert_eq!(condition_points(parsed), 10);

        let from_json: ExtractedFields = serde_json::from_value(serde_json::json!({
            "car_condition": "mint"
        }))
        .unwrap();
        assert_eq!(
            compute_score(&from_json, Some(true), false),
            compute_score(&ExtractedFields::default(), Some(true), false)
        );
    }

    #[test]
    fn scoring_is_deterministic() {
        let lead = best_case();
        let first = compute_score(&lead, Some(true), false);
        for _ in 0..100 {
            assert_eq!(compute_score(&lead, Some(true), false), first);
        }
    }
}
