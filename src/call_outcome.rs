/// Call outcome classification.
///
/// Derives the call status and recall flag stored with each lead from the
/// call system's success flag and the transcript text.
use crate::models::CallOutcome;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static VOICEMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"voicemail|mobilbox|mailbox").expect("valid voicemail regex"));

static NO_ANSWER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"not available|cannot be reached").expect("valid no-answer regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Success,
    Empty,
    Voicemail,
    NoAnswer,
    Unknown,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Success => "success",
            CallStatus::Empty => "empty",
            CallStatus::Voicemail => "voicemail",
            CallStatus::NoAnswer => "no_answer",
            CallStatus::Unknown => "unknown",
        }
    }
}

/// Classifies a call. A reported success wins over anything in the transcript.
pub fn detect_call_outcome(transcript: Option<&str>, call_successful: Option<bool>) -> CallStatus {
    if call_successful == Some(true) {
        return CallStatus::Success;
    }

    let text = transcript.unwrap_or("").trim().to_lowercase();
    if text.is_empty() {
        return CallStatus::Empty;
    }
    if VOICEMAIL_PATTERN.is_match(&text) {
        return CallStatus::Voicemail;
    }
    if NO_ANSWER_PATTERN.is_match(&text) {
        return CallStatus::NoAnswer;
    }

    CallStatus::Unknown
}

impl CallOutcome {
    /// Builds the outcome flags for an imported call.
    ///
    /// A recall is needed whenever the call failed or was not classified as a success.
    pub fn from_call(transcript: Option<&str>, call_successful: Option<bool>) -> (Self, CallStatus) {
        let status = detect_call_outcome(transcript, call_successful);
        let needs_recall = call_successful == Some(false) || status != CallStatus::Success;

        (
            CallOutcome {
                call_successful,
                needs_recall,
            },
            status,
        )
    }
}
