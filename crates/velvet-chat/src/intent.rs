//! Intent resolution.
//!
//! Classifies a message against the closed taxonomy through the language
//! capability collaborator, with defensive parsing of its loosely
//! structured reply and a local keyword fallback. This module is the only
//! place that ever inspects raw classification output.

use std::sync::Arc;

use serde::Deserialize;

use velvet_core::types::ChatTurn;
use velvet_llm::LanguageModel;

use crate::types::{ExtractedSlots, Intent, IntentKind};

/// History turns included in the classification prompt.
const CLASSIFY_HISTORY_TURNS: usize = 6;

/// Confidence assigned to keyword-matched fallback intents.
const FALLBACK_KEYWORD_CONFIDENCE: f32 = 0.7;

/// Confidence assigned when the fallback has nothing to go on.
const FALLBACK_GENERAL_CONFIDENCE: f32 = 0.5;

/// Resolves raw text plus history into a typed [`Intent`].
///
/// Never fails: when the collaborator misbehaves, a keyword heuristic
/// produces a lower-confidence intent instead.
pub struct IntentResolver {
    llm: Arc<dyn LanguageModel>,
}

impl IntentResolver {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Classify a message. Confidence from the primary path is clamped to
    /// [0, 1]; the fallback path never reports above 0.7.
    pub async fn resolve(&self, message: &str, history: &[ChatTurn]) -> Intent {
        let user_prompt = build_user_prompt(message, history);

        match self
            .llm
            .classify_intent(CLASSIFY_SYSTEM_PROMPT, &user_prompt)
            .await
        {
            Ok(reply) => match parse_classification(&reply) {
                Some(intent) => {
                    tracing::debug!(
                        kind = intent.kind.as_str(),
                        confidence = intent.confidence,
                        "Intent classified"
                    );
                    intent
                }
                None => {
                    tracing::warn!("Classification reply was unparsable, using keyword fallback");
                    fallback_intent(message)
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Classification call failed, using keyword fallback");
                fallback_intent(message)
            }
        }
    }
}

// =============================================================================
// Prompting
// =============================================================================

const CLASSIFY_SYSTEM_PROMPT: &str = "\
You classify messages sent to a nightlife assistant. Reply with a single \
JSON object and nothing else:\n\
{\"type\": <intent>, \"confidence\": <0..1>, \"query\": <search terms or null>, \
\"extractedInfo\": {\"eventName\": ..., \"clubName\": ..., \"location\": ..., \
\"nearMe\": <bool>, \"date\": ..., \"filters\": ...}}\n\
<intent> must be exactly one of: find_events, filter_events, find_clubs, \
filter_clubs, event_question, club_question, my_bookings, booking_status, \
booking_details, club_registration, policy_query, booking_help, directions, \
general.";

fn build_user_prompt(message: &str, history: &[ChatTurn]) -> String {
    let mut prompt = String::new();

    let window_start = history.len().saturating_sub(CLASSIFY_HISTORY_TURNS);
    if window_start < history.len() {
        prompt.push_str("Conversation so far:\n");
        for turn in &history[window_start..] {
            let role = match turn.role {
                velvet_core::types::Role::User => "user",
                velvet_core::types::Role::Assistant => "assistant",
            };
            prompt.push_str(&format!("{}: {}\n", role, turn.content));
        }
        prompt.push('\n');
    }

    prompt.push_str("Message: ");
    prompt.push_str(message);
    prompt
}

// =============================================================================
// Defensive parsing
// =============================================================================

#[derive(Debug, Deserialize)]
struct ClassificationPayload {
    #[serde(rename = "type")]
    kind: String,
    confidence: Option<f32>,
    #[serde(default)]
    query: Option<String>,
    #[serde(rename = "extractedInfo", alias = "extractedSlots", default)]
    slots: Option<ExtractedSlots>,
}

/// Parse the collaborator's reply into an [`Intent`].
///
/// Models prepend and append prose often enough that a direct parse of the
/// trimmed reply is tried first, then the first balanced object found
/// anywhere in the text. Unknown intent names reject the parse.
fn parse_classification(reply: &str) -> Option<Intent> {
    let trimmed = reply.trim();

    let payload: ClassificationPayload = serde_json::from_str(trimmed)
        .ok()
        .or_else(|| {
            extract_json_object(trimmed).and_then(|obj| serde_json::from_str(obj).ok())
        })?;

    let kind: IntentKind =
        serde_json::from_value(serde_json::Value::String(payload.kind)).ok()?;

    let mut intent = Intent::new(kind, payload.confidence.unwrap_or(0.0));
    intent.query = payload.query;
    intent.slots = payload.slots.unwrap_or_default();
    Some(intent)
}

/// Find the first balanced `{...}` object in `text`, respecting string
/// literals and escapes.
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

// =============================================================================
// Keyword fallback
// =============================================================================

/// Local heuristic used when the collaborator call fails or its reply is
/// unparsable. Confidence is capped below the primary path's ceiling so
/// callers can treat it as a quality signal.
fn fallback_intent(message: &str) -> Intent {
    let lower = message.to_lowercase();

    if lower.contains("event") || lower.contains("party") {
        Intent::new(IntentKind::FindEvents, FALLBACK_KEYWORD_CONFIDENCE)
    } else if lower.contains("club") || lower.contains("venue") {
        Intent::new(IntentKind::FindClubs, FALLBACK_KEYWORD_CONFIDENCE)
    } else {
        Intent::new(IntentKind::General, FALLBACK_GENERAL_CONFIDENCE)
    }
}
