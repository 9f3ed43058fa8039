//! Follow-up detection and reference recovery.
//!
//! A follow-up is a message whose correct interpretation depends on prior
//! turns. Detection is a pure phrase-set predicate; recovery re-derives
//! the referenced event from the recommendation sentence the composer
//! emits ("Check out <event> at <venue>") and looks it up in the store.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use velvet_core::types::{ChatTurn, Role};
use velvet_store::{EventDetails, Store};

/// The fixed phrase set that marks a message as context-dependent.
/// Single words are matched on word boundaries so that e.g. "waiting"
/// does not trip the "it" phrase.
static FOLLOW_UP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:this event|that event|give me more details|tell me more|what time|how much|where is|directions|more about|explain|it|this|that)\b",
    )
    .unwrap()
});

/// Marker sentence the composer opens recommendations with. Reference
/// recovery scrapes this exact shape out of prior assistant turns.
pub const RECOMMENDATION_MARKER: &str = "Check out ";

static REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Check out ([^.,!?\n]+?) at ([^.,!?\n]+)").unwrap());

/// Whether a message depends on prior turns. Pure; no side effects.
pub fn is_follow_up(message: &str) -> bool {
    FOLLOW_UP_RE.is_match(message)
}

/// Recovers the entity a follow-up refers to.
pub struct FollowUpResolver {
    store: Arc<dyn Store>,
}

impl FollowUpResolver {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Walk history newest to oldest for the most recent assistant turn
    /// carrying the recommendation marker, extract the event and venue
    /// names, and look the event up. `None` on any miss; the caller then
    /// falls back to a "couldn't find that" response shape.
    pub async fn resolve_reference(&self, history: &[ChatTurn]) -> Option<EventDetails> {
        let (event_name, venue_name) = history
            .iter()
            .rev()
            .find(|turn| turn.role == Role::Assistant && turn.content.contains(RECOMMENDATION_MARKER))
            .and_then(|turn| extract_reference(&turn.content))?;

        // Venue-scoped lookup first; the bare name is enough if the venue
        // text did not survive extraction cleanly.
        let scoped = self
            .store
            .find_event(&event_name, Some(&venue_name))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Reference lookup failed");
                None
            });
        if scoped.is_some() {
            return scoped;
        }

        self.store
            .find_event(&event_name, None)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Reference lookup failed");
                None
            })
    }
}

/// Extract `(event, venue)` from a recommendation sentence.
fn extract_reference(text: &str) -> Option<(String, String)> {
    let caps = REFERENCE_RE.captures(text)?;
    let event = caps.get(1)?.as_str().trim().to_string();
    let venue = caps.get(2)?.as_str().trim().to_string();
    if event.is_empty() || venue.is_empty() {
        return None;
    }
    Some((event, venue))
}
