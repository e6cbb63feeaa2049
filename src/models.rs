use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::collections::HashMap;
use uuid::Uuid;

// ============ Extraction Models ============

/// A closed set of labels produced by the extraction provider.
///
/// `from_label` is total: anything outside the known set maps to the
/// `unclear` marker, since labels come from an unreliable classifier.
pub trait Label: Sized + Copy {
    /// The explicit unknown marker.
    const UNCLEAR: Self;

    /// Canonical lowercase label, as stored in the database.
    fn as_str(&self) -> &'static str;

    /// Parses a known label (case and surrounding whitespace ignored).
    fn parse_known(label: &str) -> Option<Self>;

    fn from_label(label: &str) -> Self {
        Self::parse_known(label.trim().to_lowercase().as_str()).unwrap_or(Self::UNCLEAR)
    }

    fn is_unclear(&self) -> bool {
        self.as_str() == Self::UNCLEAR.as_str()
    }
}

/// How willing the seller is to negotiate on price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Negotiation {
    High,
    Medium,
    Low,
    #[default]
    Unclear,
}

impl Label for Negotiation {
    const UNCLEAR: Self = Negotiation::Unclear;

    fn as_str(&self) -> &'static str {
        match self {
            Negotiation::High => "high",
            Negotiation::Medium => "medium",
            Negotiation::Low => "low",
            Negotiation::Unclear => "unclear",
        }
    }

    fn parse_known(label: &str) -> Option<Self> {
        match label {
            "high" => Some(Negotiation::High),
            "medium" => Some(Negotiation::Medium),
            "low" => Some(Negotiation::Low),
            "unclear" => Some(Negotiation::Unclear),
            _ => None,
        }
    }
}

/// When the seller expects to hand the car over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub enum Handover {
    #[serde(rename = "immediate")]
    Immediate,
    #[serde(rename = "1-2 weeks")]
    OneToTwoWeeks,
    #[serde(rename = "2-4 weeks")]
    TwoToFourWeeks,
    #[serde(rename = "flexible")]
    Flexible,
    #[default]
    #[serde(rename = "unclear")]
    Unclear,
}

impl Label for Handover {
    const UNCLEAR: Self = Handover::Unclear;

    fn as_str(&self) -> &'static str {
        match self {
            Handover::Immediate => "immediate",
            Handover::OneToTwoWeeks => "1-2 weeks",
            Handover::TwoToFourWeeks => "2-4 weeks",
            Handover::Flexible => "flexible",
            Handover::Unclear => "unclear",
        }
    }

    fn parse_known(label: &str) -> Option<Self> {
        match label {
            "immediate" => Some(Handover::Immediate),
            "1-2 weeks" => Some(Handover::OneToTwoWeeks),
            "2-4 weeks" => Some(Handover::TwoToFourWeeks),
            "flexible" => Some(Handover::Flexible),
            "unclear" => Some(Handover::Unclear),
            _ => None,
        }
    }
}

/// Condition of the car as described by the seller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Excellent,
    Good,
    Fair,
    Poor,
    #[default]
    Unclear,
}

impl Label for Condition {
    const UNCLEAR: Self = Condition::Unclear;

    fn as_str(&self) -> &'static str {
        match self {
            Condition::Excellent => "excellent",
            Condition::Good => "good",
            Condition::Fair => "fair",
            Condition::Poor => "poor",
            Condition::Unclear => "unclear",
        }
    }

    fn parse_known(label: &str) -> Option<Self> {
        match label {
            "excellent" => Some(Condition::Excellent),
            "good" => Some(Condition::Good),
            "fair" => Some(Condition::Fair),
            "poor" => Some(Condition::Poor),
            "unclear" => Some(Condition::Unclear),
            _ => None,
        }
    }
}

/// Overall sentiment of the seller during the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    #[default]
    Unclear,
}

impl Label for Sentiment {
    const UNCLEAR: Self = Sentiment::Unclear;

    fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
            Sentiment::Unclear => "unclear",
        }
    }

    fn parse_known(label: &str) -> Option<Self> {
        match label {
            "positive" => Some(Sentiment::Positive),
            "neutral" => Some(Sentiment::Neutral),
            "negative" => Some(Sentiment::Negative),
            "unclear" => Some(Sentiment::Unclear),
            _ => None,
        }
    }
}

/// Structured fields extracted from a call transcript.
///
/// Deserialization never fails on field content: missing keys, `null`,
/// wrong JSON types and unknown labels all decode to the unknown marker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractedFields {
    #[serde(default, deserialize_with = "lenient_price")]
    pub asking_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub willingness_to_negotiate: Negotiation,
    #[serde(default, deserialize_with = "lenient_label")]
    pub expected_handover_date: Handover,
    #[serde(default, deserialize_with = "lenient_label")]
    pub car_condition: Condition,
    #[serde(default, deserialize_with = "lenient_owners")]
    pub number_of_owners: Option<u32>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub user_sentiment: Sentiment,
    /// Per-field confidence in 0..1, when the provider reports it.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_confidence")]
    pub confidence: Option<HashMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_notes")]
    pub notes: Option<String>,
}

fn lenient_label<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Label,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .map(T::from_label)
        .unwrap_or(T::UNCLEAR))
}

fn lenient_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value).filter(|p| *p >= 0.0))
}

fn lenient_owners<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(number_from_value)
        .filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= u32::MAX as f64)
        .map(|n| n as u32))
}

fn lenient_confidence<'de, D>(deserializer: D) -> Result<Option<HashMap<String, f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Object(map) => Some(
            map.into_iter()
                .filter_map(|(k, v)| v.as_f64().map(|c| (k, c)))
                .collect(),
        ),
        _ => None,
    }))
}

fn lenient_notes<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    }))
}

/// Reads a JSON number, or a string such as "€12.500" / "12,500 EUR".
///
/// A string with both separators uses the last one as the decimal mark;
/// a lone separator followed by exactly three digits is a thousands mark.
fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',' || *c == '-')
        .collect();
    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');
    let normalized = match (last_dot, last_comma) {
        (Some(d), Some(c)) => {
            let (thousands, decimal) = if d > c { (',', '.') } else { ('.', ',') };
            cleaned.replace(thousands, "").replace(decimal, ".")
        }
        (Some(i), None) | (None, Some(i)) => {
            let sep = cleaned.as_bytes()[i] as char;
            let digits_after = cleaned.len() - i - 1;
            if cleaned.matches(sep).count() > 1 || digits_after == 3 {
                cleaned.replace(sep, "")
            } else {
                cleaned.replace(sep, ".")
            }
        }
        (None, None) => cleaned,
    };

    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

// ============ Call Models ============

/// Outcome flags from the call-taking system. They gate scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOutcome {
    /// `None` when the call system did not report a result.
    pub call_successful: Option<bool>,
    pub needs_recall: bool,
}

// ============ Database Models ============

/// A lead row as written by an import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewLead {
    pub external_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub mileage: Option<i32>,
    pub price_estimation: Option<f64>,
    pub status: Option<String>,
    pub call_successful: Option<bool>,
    pub transcript: Option<String>,
}

/// Result of an import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    /// Rows with an external id that were sent to the store.
    pub imported: usize,
    /// Rows the store reported as inserted or updated.
    pub upserted: usize,
}

/// A lead waiting for extraction.
#[derive(Debug, Clone, FromRow)]
pub struct PendingLead {
    pub id: Uuid,
    pub transcript: Option<String>,
    pub call_successful: Option<bool>,
    pub needs_recall: bool,
}

/// Row shape used for listing and filtering leads.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LeadListItem {
    pub id: Uuid,
    pub external_id: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price_estimation: Option<f64>,
    pub call_successful: Option<bool>,
    pub needs_recall: bool,
    pub asking_price: Option<f64>,
    pub willingness_to_negotiate: Option<String>,
    pub expected_handover_date: Option<String>,
    pub car_condition: Option<String>,
    pub user_sentiment: Option<String>,
    pub score: i32,
    pub created_at: DateTime<Utc>,
}

/// Full lead record.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Lead {
    pub id: Uuid,
    pub external_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub mileage: Option<i32>,
    pub price_estimation: Option<f64>,
    pub status: Option<String>,
    pub call_successful: Option<bool>,
    pub call_outcome: Option<String>,
    pub needs_recall: bool,
    pub transcript: Option<String>,
    pub asking_price: Option<f64>,
    pub willingness_to_negotiate: Option<String>,
    pub expected_handover_date: Option<String>,
    pub car_condition: Option<String>,
    pub number_of_owners: Option<i32>,
    pub user_sentiment: Option<String>,
    pub extraction_json: Option<Value>,
    pub confidence: Option<Value>,
    pub score: i32,
    pub extracted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Filters for listing leads. Empty filter lists everything by score.
#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    /// Applied only when greater than zero.
    pub min_score: i32,
    pub handover: Option<Handover>,
    pub recall_only: bool,
    pub search: Option<String>,
}

impl LeadFilter {
    /// Trimmed search term, `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    /// `ILIKE` pattern for the search term with wildcards escaped.
    pub fn search_pattern(&self) -> Option<String> {
        self.search_term().map(|term| {
            let escaped = term
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{}%", escaped)
        })
    }

    /// A search term that also reads as a number matches year, asking price and score.
    pub fn numeric_term(&self) -> Option<f64> {
        self.search_term()
            .and_then(|term| term.parse::<f64>().ok())
            .filter(|n| n.is_finite())
    }

    pub fn min_score_bound(&self) -> Option<i32> {
        (self.min_score > 0).then_some(self.min_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!(Handover::from_label(" 1-2 Weeks "), Handover::OneToTwoWeeks);
        assert_eq!(Condition::from_label("EXCELLENT"), Condition::Excellent);
        assert_eq!(Sentiment::from_label("sideways"), Sentiment::Unclear);
        assert_eq!(Negotiation::from_label(""), Negotiation::Unclear);
    }

    #[test]
    fn extracted_fields_decode_leniently() {
        let fields: ExtractedFields = serde_json::from_value(json!({
            "asking_price": "€12.500",
            "willingness_to_negotiate": "very high",
            "expected_handover_date": "2-4 weeks",
            "car_condition": 3,
            "number_of_owners": -1,
            "confidence": {"asking_price": 0.9, "car_condition": "n/a"},
            "notes": "  "
        }))
        .unwrap();

        assert_eq!(fields.asking_price, Some(12500.0));
        assert_eq!(fields.willingness_to_negotiate, Negotiation::Unclear);
        assert_eq!(fields.expected_handover_date, Handover::TwoToFourWeeks);
        assert_eq!(fields.car_condition, Condition::Unclear);
        assert_eq!(fields.number_of_owners, None);
        assert_eq!(fields.user_sentiment, Sentiment::Unclear);
        assert_eq!(fields.confidence.unwrap().len(), 1);
        assert_eq!(fields.notes, None);
    }

    #[test]
    fn empty_object_decodes_to_all_unknown() {
        let fields: ExtractedFields = serde_json::from_str("{}").unwrap();
        assert_eq!(fields, ExtractedFields::default());
    }

    #[test]
    fn serialization_writes_canonical_labels() {
        let fields = ExtractedFields {
            expected_handover_date: Handover::OneToTwoWeeks,
            car_condition: Condition::Good,
            ..Default::default()
        };
        let value = serde_json::to_value(&fields).unwrap();

        assert_eq!(value["expected_handover_date"], "1-2 weeks");
        assert_eq!(value["car_condition"], "good");
        assert_eq!(value["user_sentiment"], "unclear");
        assert!(value.get("notes").is_none());
    }

    #[test]
    fn amounts_with_separators() {
        assert_eq!(parse_amount("12,500"), Some(12500.0));
        assert_eq!(parse_amount("12.500,50 EUR"), Some(12500.5));
        assert_eq!(parse_amount("1,234,567"), Some(1234567.0));
        assert_eq!(parse_amount("9999.99"), Some(9999.99));
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn owners_accept_integral_numbers_only() {
        let fields: ExtractedFields =
            serde_json::from_value(json!({"number_of_owners": "2"})).unwrap();
        assert_eq!(fields.number_of_owners, Some(2));

        let fields: ExtractedFields =
            serde_json::from_value(json!({"number_of_owners": 1.5})).unwrap();
        assert_eq!(fields.number_of_owners, None);

        let fields: ExtractedFields =
            serde_json::from_value(json!({"number_of_owners": 0})).unwrap();
        assert_eq!(fields.number_of_owners, Some(0));
    }

    #[test]
    fn search_pattern_escapes_wildcards() {
        let filter = LeadFilter {
            search: Some(" 50%_off ".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.search_pattern().as_deref(), Some("%50\\%\\_off%"));
        assert_eq!(filter.numeric_term(), None);
    }

    #[test]
    fn numeric_search_terms_are_detected() {
        let filter = LeadFilter {
            search: Some("2019".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.numeric_term(), Some(2019.0));

        let blank = LeadFilter {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(blank.search_term(), None);
        assert_eq!(blank.numeric_term(), None);
    }

    #[test]
    fn min_score_zero_is_not_a_bound() {
        assert_eq!(LeadFilter::default().min_score_bound(), None);
        let filter = LeadFilter {
            min_score: 50,
            ..Default::default()
        };
        assert_eq!(filter.min_score_bound(), Some(50));
    }
}
