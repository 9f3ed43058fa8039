//! Response composition.
//!
//! Turns fetched data plus the intent into the final natural-language
//! answer through the language collaborator. Generation failure is never
//! fatal: a fixed apologetic string stands in.

use std::sync::Arc;

use serde_json::json;

use velvet_core::types::ChatTurn;
use velvet_llm::LanguageModel;

use crate::followup::RECOMMENDATION_MARKER;
use crate::types::{FetchedData, Intent};

/// History turns included in the generation prompt.
const COMPOSE_HISTORY_TURNS: usize = 4;

/// Returned whenever text generation fails.
pub const FALLBACK_RESPONSE: &str =
    "Sorry, I'm having trouble putting an answer together right now. Please try again in a moment.";

/// Returned when a follow-up reference cannot be recovered.
pub const NOT_FOUND_RESPONSE: &str =
    "I couldn't find the event you're referring to. Could you tell me its name?";

/// Composes the final answer text.
pub struct Composer {
    llm: Arc<dyn LanguageModel>,
}

impl Composer {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Compose an answer from the intent and fetched data. Always returns
    /// a string; collaborator failures degrade to [`FALLBACK_RESPONSE`].
    pub async fn compose(
        &self,
        intent: &Intent,
        data: &FetchedData,
        history: &[ChatTurn],
        message: &str,
    ) -> String {
        let system_prompt = build_system_prompt(data);
        let user_prompt = build_user_prompt(data, history, message);

        match self.llm.generate_text(&system_prompt, &user_prompt).await {
            Ok(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    FALLBACK_RESPONSE.to_string()
                } else {
                    text
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    intent = intent.kind.as_str(),
                    "Generation failed, using canned response"
                );
                FALLBACK_RESPONSE.to_string()
            }
        }
    }
}

fn build_system_prompt(data: &FetchedData) -> String {
    let mut prompt = String::from(
        "You are the concierge for a nightlife platform. Answer using ONLY \
         the data provided in the message. Never invent events, venues, \
         prices, or times. Keep it short and friendly.\n",
    );

    if data.is_empty() {
        prompt.push_str(
            "There is nothing matching the request. Apologize briefly and \
             suggest checking back soon.",
        );
    } else {
        prompt.push_str(&format!(
            "Recommend one to three items. Open each recommendation with \
             \"{}<event> at <venue>\" so the client can link it.",
            RECOMMENDATION_MARKER
        ));
    }

    prompt
}

fn build_user_prompt(data: &FetchedData, history: &[ChatTurn], message: &str) -> String {
    let mut prompt = String::new();

    let window_start = history.len().saturating_sub(COMPOSE_HISTORY_TURNS);
    if window_start < history.len() {
        prompt.push_str("Recent conversation:\n");
        for turn in &history[window_start..] {
            let role = match turn.role {
                velvet_core::types::Role::User => "user",
                velvet_core::types::Role::Assistant => "assistant",
            };
            prompt.push_str(&format!("{}: {}\n", role, turn.content));
        }
        prompt.push('\n');
    }

    prompt.push_str("Data:\n");
    prompt.push_str(&serialize_data(data));
    prompt.push_str("\n\nMessage: ");
    prompt.push_str(message);
    prompt
}

/// Compact projection of the fetched data for the generation prompt.
fn serialize_data(data: &FetchedData) -> String {
    let value = match data {
        FetchedData::Events(events) => json!(events
            .iter()
            .map(|e| {
                json!({
                    "event": e.event.name,
                    "venue": e.venue_name,
                    "city": e.venue_city,
                    "date": e.event.date.to_string(),
                    "time": e.event.time,
                    "djs": e.event.dj_artists,
                    "fromPrice": e.event.min_ticket_price(),
                    "distance": e.distance.as_ref().map(|d| d.text.clone()),
                })
            })
            .collect::<Vec<_>>()),
        FetchedData::Clubs(clubs) => json!(clubs
            .iter()
            .map(|c| {
                json!({
                    "club": c.club.name,
                    "city": c.club.city,
                    "venueType": c.club.type_of_venue,
                    "rating": c.club.rating,
                    "address": c.club.address,
                    "distance": c.distance.as_ref().map(|d| d.text.clone()),
                })
            })
            .collect::<Vec<_>>()),
        FetchedData::Bookings(orders) => json!(orders
            .iter()
            .map(|o| {
                json!({
                    "event": o.event.as_ref().map(|e| e.name.clone()),
                    "club": o.club.as_ref().map(|c| c.name.clone()),
                    "ticket": o.ticket.as_ref().map(|t| t.name.clone()),
                    "quantity": o.quantity,
                    "status": o.status,
                    "paid": o.is_paid,
                })
            })
            .collect::<Vec<_>>()),
    };

    value.to_string()
}
