//! Query planning.
//!
//! Three independent plan producers, tried in a fixed order by the engine:
//! an AI-assisted plan proposed by the language collaborator, a
//! deterministic rule-based plan dispatched on the intent variant, and a
//! generic listing that always succeeds at plan time. Loose collaborator
//! output is parsed into the closed [`QueryPlan`] form or rejected.

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use velvet_llm::LanguageModel;

use crate::intent::extract_json_object;
use crate::types::{Intent, IntentKind, PlanFilter, PopulateSpec, QueryPlan, TargetEntity};

/// Hard cap on results for every plan tier.
pub const RESULT_CAP: usize = 10;

/// Why a plan tier failed to produce a plan.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("plan generation failed: {0}")]
    LlmFailed(String),
    #[error("plan reply was unparsable: {0}")]
    Unparsable(String),
    #[error("unsupported model: {0}")]
    UnsupportedModel(String),
    #[error("unsupported query field: {0}")]
    UnsupportedField(String),
    #[error("intent requires an authenticated user")]
    MissingUser,
}

/// Builds query plans from intents.
pub struct Planner {
    llm: Arc<dyn LanguageModel>,
}

impl Planner {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Tier 1: ask the language collaborator to propose a plan against a
    /// serialized schema description, then validate it into the closed
    /// plan form. Any deviation rejects the tier.
    pub async fn ai_plan(
        &self,
        message: &str,
        intent: &Intent,
        city: &str,
    ) -> Result<QueryPlan, PlanError> {
        let user_prompt = format!(
            "Intent: {}\nCity: {}\nMessage: {}",
            intent.kind.as_str(),
            city,
            message
        );

        let reply = self
            .llm
            .generate_text(PLAN_SYSTEM_PROMPT, &user_prompt)
            .await
            .map_err(|e| PlanError::LlmFailed(e.to_string()))?;

        parse_ai_plan(&reply, city)
    }

    /// Tier 2: deterministic mapping from the intent variant to a plan.
    /// Exhaustive over the taxonomy so new variants cannot be missed.
    pub fn rule_plan(
        &self,
        intent: &Intent,
        city: &str,
        user_id: Option<Uuid>,
    ) -> Result<QueryPlan, PlanError> {
        let plan = match intent.kind {
            IntentKind::FindEvents | IntentKind::FilterEvents | IntentKind::EventQuestion => {
                events_plan(city)
            }
            IntentKind::FindClubs
            | IntentKind::FilterClubs
            | IntentKind::ClubQuestion
            | IntentKind::Directions => clubs_plan(city),
            IntentKind::MyBookings | IntentKind::BookingStatus | IntentKind::BookingDetails => {
                bookings_plan(user_id.ok_or(PlanError::MissingUser)?)
            }
            IntentKind::ClubRegistration
            | IntentKind::PolicyQuery
            | IntentKind::BookingHelp
            | IntentKind::General => clubs_plan(city),
        };
        Ok(plan)
    }

    /// Tier 3: approved clubs in the city, capped, no population. Cannot
    /// fail at plan time, so the pipeline always has something to compose
    /// a response from.
    pub fn generic_listing(&self, city: &str) -> QueryPlan {
        QueryPlan {
            target: TargetEntity::Club,
            filter: PlanFilter::ApprovedClubs {
                city: city.to_string(),
                require_upcoming_events: false,
            },
            populate: PopulateSpec::default(),
            limit: RESULT_CAP,
        }
    }
}

// =============================================================================
// Rule-plan constructors
// =============================================================================

fn events_plan(city: &str) -> QueryPlan {
    QueryPlan {
        target: TargetEntity::Event,
        filter: PlanFilter::ApprovedClubs {
            city: city.to_string(),
            require_upcoming_events: true,
        },
        populate: PopulateSpec {
            events: true,
            order_relations: false,
        },
        limit: RESULT_CAP,
    }
}

fn clubs_plan(city: &str) -> QueryPlan {
    QueryPlan {
        target: TargetEntity::Club,
        filter: PlanFilter::ApprovedClubs {
            city: city.to_string(),
            require_upcoming_events: false,
        },
        populate: PopulateSpec::default(),
        limit: RESULT_CAP,
    }
}

fn bookings_plan(user_id: Uuid) -> QueryPlan {
    QueryPlan {
        target: TargetEntity::User,
        filter: PlanFilter::PaidOrders { user_id },
        populate: PopulateSpec {
            events: false,
            order_relations: true,
        },
        limit: RESULT_CAP,
    }
}

// =============================================================================
// AI-plan parsing
// =============================================================================

const PLAN_SYSTEM_PROMPT: &str = "\
You translate a nightlife query into a store read. Collections:\n\
clubs {name, city, isApproved, mapLink, events[], rating, typeOfVenue, address}\n\
events {name, date, time, djArtists, tickets[], status}\n\
orders {event, club, ticket, quantity, status, isPaid}\n\
Reply with a single JSON object and nothing else:\n\
{\"model\": \"Club\" | \"Event\", \"query\": {\"city\"?: string, \
\"isApproved\"?: true, \"hasUpcomingEvents\"?: bool}, \
\"populate\": [\"events\"]?, \"limit\"?: number}";

#[derive(Debug, Deserialize)]
struct AiPlanPayload {
    model: String,
    #[serde(default)]
    query: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    populate: Vec<String>,
    #[serde(default)]
    limit: Option<usize>,
}

/// Validate a proposed plan into the closed form. Only a fixed safe set of
/// query fields is accepted; anything else rejects the tier.
fn parse_ai_plan(reply: &str, default_city: &str) -> Result<QueryPlan, PlanError> {
    let trimmed = reply.trim();
    let payload: AiPlanPayload = serde_json::from_str(trimmed)
        .or_else(|_| {
            extract_json_object(trimmed)
                .ok_or_else(|| PlanError::Unparsable("no JSON object found".to_string()))
                .and_then(|obj| {
                    serde_json::from_str(obj).map_err(|e| PlanError::Unparsable(e.to_string()))
                })
        })?;

    let target = match payload.model.as_str() {
        "Club" => TargetEntity::Club,
        "Event" => TargetEntity::Event,
        other => return Err(PlanError::UnsupportedModel(other.to_string())),
    };

    let mut city = default_city.to_string();
    let mut has_upcoming = matches!(target, TargetEntity::Event);
    for (key, value) in &payload.query {
        match key.as_str() {
            "city" => {
                if let Some(s) = value.as_str() {
                    city = s.to_string();
                }
            }
            // The read path only serves approved data; the flag is
            // accepted but may not be flipped off.
            "isApproved" => {
                if value.as_bool() == Some(false) {
                    return Err(PlanError::UnsupportedField("isApproved=false".to_string()));
                }
            }
            "hasUpcomingEvents" => {
                has_upcoming = value.as_bool().unwrap_or(has_upcoming);
            }
            other => return Err(PlanError::UnsupportedField(other.to_string())),
        }
    }

    let mut populate = PopulateSpec::default();
    for field in &payload.populate {
        match field.as_str() {
            "events" => populate.events = true,
            other => return Err(PlanError::UnsupportedField(other.to_string())),
        }
    }

    // An Event read comes from clubs with their events attached.
    if target == TargetEntity::Event {
        populate.events = true;
        has_upcoming = true;
    }

    Ok(QueryPlan {
        target,
        filter: PlanFilter::ApprovedClubs {
            city,
            require_upcoming_events: has_upcoming,
        },
        populate,
        limit: payload.limit.unwrap_or(RESULT_CAP).min(RESULT_CAP),
    })
}
