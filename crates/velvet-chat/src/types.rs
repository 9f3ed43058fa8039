//! Core types for the assistant engine.
//!
//! Everything here is created at the start of one request and discarded at
//! the end; the engine holds no state across requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use velvet_core::types::{ChatTurn, Club, Coordinates, Event, Order};
use velvet_geo::DistanceResult;

// =============================================================================
// Intent taxonomy
// =============================================================================

/// The closed intent taxonomy. Every message classifies to exactly one of
/// these; downstream routing is an exhaustive match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    FindEvents,
    FilterEvents,
    FindClubs,
    FilterClubs,
    EventQuestion,
    ClubQuestion,
    MyBookings,
    BookingStatus,
    BookingDetails,
    ClubRegistration,
    PolicyQuery,
    BookingHelp,
    Directions,
    General,
}

impl IntentKind {
    /// All variants, in taxonomy order. Used to build the classification
    /// prompt and to verify exhaustiveness in tests.
    pub const ALL: [IntentKind; 14] = [
        IntentKind::FindEvents,
        IntentKind::FilterEvents,
        IntentKind::FindClubs,
        IntentKind::FilterClubs,
        IntentKind::EventQuestion,
        IntentKind::ClubQuestion,
        IntentKind::MyBookings,
        IntentKind::BookingStatus,
        IntentKind::BookingDetails,
        IntentKind::ClubRegistration,
        IntentKind::PolicyQuery,
        IntentKind::BookingHelp,
        IntentKind::Directions,
        IntentKind::General,
    ];

    /// Wire name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::FindEvents => "find_events",
            IntentKind::FilterEvents => "filter_events",
            IntentKind::FindClubs => "find_clubs",
            IntentKind::FilterClubs => "filter_clubs",
            IntentKind::EventQuestion => "event_question",
            IntentKind::ClubQuestion => "club_question",
            IntentKind::MyBookings => "my_bookings",
            IntentKind::BookingStatus => "booking_status",
            IntentKind::BookingDetails => "booking_details",
            IntentKind::ClubRegistration => "club_registration",
            IntentKind::PolicyQuery => "policy_query",
            IntentKind::BookingHelp => "booking_help",
            IntentKind::Directions => "directions",
            IntentKind::General => "general",
        }
    }

    /// Which data category the intent's answer draws on. Drives the card
    /// assembler and the compose framing.
    pub fn data_category(&self) -> DataCategory {
        match self {
            IntentKind::FindEvents | IntentKind::FilterEvents | IntentKind::EventQuestion => {
                DataCategory::Events
            }
            IntentKind::FindClubs
            | IntentKind::FilterClubs
            | IntentKind::ClubQuestion
            | IntentKind::Directions => DataCategory::Clubs,
            IntentKind::MyBookings | IntentKind::BookingStatus | IntentKind::BookingDetails => {
                DataCategory::Bookings
            }
            IntentKind::ClubRegistration
            | IntentKind::PolicyQuery
            | IntentKind::BookingHelp
            | IntentKind::General => DataCategory::General,
        }
    }
}

/// Data category an intent's answer draws on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataCategory {
    Events,
    Clubs,
    Bookings,
    General,
}

/// Slots extracted from a message during classification.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedSlots {
    pub event_name: Option<String>,
    pub club_name: Option<String>,
    pub location: Option<String>,
    pub near_me: bool,
    pub date: Option<String>,
    pub filters: Option<serde_json::Value>,
}

/// A classified message. Built once per request by the intent resolver and
/// never mutated afterward.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Intent {
    #[serde(rename = "type")]
    pub kind: IntentKind,
    /// Classifier confidence, clamped to [0, 1]. A quality signal only;
    /// nothing branches on a threshold.
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default)]
    pub slots: ExtractedSlots,
}

impl Intent {
    pub fn new(kind: IntentKind, confidence: f32) -> Self {
        Self {
            kind,
            confidence: confidence.clamp(0.0, 1.0),
            query: None,
            slots: ExtractedSlots::default(),
        }
    }
}

// =============================================================================
// Query plans
// =============================================================================

/// Entity a query plan targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetEntity {
    Club,
    Event,
    User,
}

/// The closed set of predicates the executor knows how to run. Loose
/// collaborator output is parsed into this form or rejected.
#[derive(Clone, Debug, PartialEq)]
pub enum PlanFilter {
    ApprovedClubs {
        city: String,
        require_upcoming_events: bool,
    },
    PaidOrders {
        user_id: Uuid,
    },
    EventByName {
        name: String,
        venue: Option<String>,
    },
}

/// Nested-fetch specification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PopulateSpec {
    /// Attach upcoming events to fetched clubs.
    pub events: bool,
    /// Attach event/ticket/club to fetched orders.
    pub order_relations: bool,
}

/// A concrete query against the store. Built by the planner, consumed
/// exactly once by the executor.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryPlan {
    pub target: TargetEntity,
    pub filter: PlanFilter,
    pub populate: PopulateSpec,
    pub limit: usize,
}

/// Which tier of the fallback chain produced the final result set.
/// Observability only; no downstream logic branches on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackTier {
    AiPlan,
    RulePlan,
    GenericListing,
}

impl FallbackTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackTier::AiPlan => "ai-plan",
            FallbackTier::RulePlan => "rule-plan",
            FallbackTier::GenericListing => "generic-listing",
        }
    }
}

// =============================================================================
// Fetched data
// =============================================================================

/// A club hit, with the distance attached when the request asked for
/// nearby results and the lookup succeeded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClubHit {
    pub club: Club,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<DistanceResult>,
}

/// An event flattened out of its club, carrying denormalized venue fields.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventHit {
    pub event: Event,
    pub venue_name: String,
    pub venue_city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<DistanceResult>,
}

/// What the executor fetched, tagged by entity type.
#[derive(Clone, Debug)]
pub enum FetchedData {
    Events(Vec<EventHit>),
    Clubs(Vec<ClubHit>),
    Bookings(Vec<Order>),
}

impl FetchedData {
    pub fn is_empty(&self) -> bool {
        match self {
            FetchedData::Events(v) => v.is_empty(),
            FetchedData::Clubs(v) => v.is_empty(),
            FetchedData::Bookings(v) => v.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FetchedData::Events(v) => v.len(),
            FetchedData::Clubs(v) => v.len(),
            FetchedData::Bookings(v) => v.len(),
        }
    }

    /// Entity-type label for logging.
    pub fn entity_type(&self) -> &'static str {
        match self {
            FetchedData::Events(_) => "Event",
            FetchedData::Clubs(_) => "Club",
            FetchedData::Bookings(_) => "Order",
        }
    }
}

// =============================================================================
// Cards
// =============================================================================

/// Card block category on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    Events,
    Clubs,
    Mixed,
}

/// One entry in a card block.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardItem {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A bounded structured preview of retrieved entities, attached to the
/// composed response for client-side rendering.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CardBlock {
    #[serde(rename = "type")]
    pub kind: CardKind,
    pub title: String,
    pub items: Vec<CardItem>,
}

// =============================================================================
// Requests, outcomes, stream events
// =============================================================================

/// One assistant request. History is caller-supplied in conversational
/// order; the engine never persists it.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub user_location: Option<Coordinates>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub screen: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            history: Vec::new(),
            city: None,
            user_location: None,
            user_id: None,
            screen: None,
        }
    }
}

/// The pipeline's result, identical between streaming and synchronous
/// modes: the streaming mode tokenizes `response` and mirrors the rest
/// into the terminal event.
#[derive(Clone, Debug, Serialize)]
pub struct ChatOutcome {
    pub response: String,
    #[serde(rename = "intentType")]
    pub intent_type: IntentKind,
    pub confidence: f32,
    pub cards: Vec<CardBlock>,
    /// Which fallback tier served the data; `None` when the follow-up
    /// path answered without the planner.
    #[serde(skip)]
    pub tier: Option<FallbackTier>,
}

/// One framed event on the streaming wire.
///
/// Exactly one of `Complete`/`Error` is emitted per session, always last;
/// `Token` texts concatenated in emission order equal `Complete.response`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Connection {
        message: String,
    },
    Thinking {
        message: String,
    },
    Token {
        text: String,
        #[serde(rename = "isComplete")]
        is_complete: bool,
    },
    Heartbeat {
        ts: i64,
    },
    Complete {
        response: String,
        #[serde(rename = "intentType")]
        intent_type: IntentKind,
        confidence: f32,
        cards: Vec<CardBlock>,
    },
    Error {
        message: String,
    },
}

impl StreamEvent {
    pub fn heartbeat_now() -> Self {
        StreamEvent::Heartbeat {
            ts: now_epoch(),
        }
    }

    pub fn complete(outcome: &ChatOutcome) -> Self {
        StreamEvent::Complete {
            response: outcome.response.clone(),
            intent_type: outcome.intent_type,
            confidence: outcome.confidence,
            cards: outcome.cards.clone(),
        }
    }

    /// Whether this event terminates the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete { .. } | StreamEvent::Error { .. })
    }
}

fn now_epoch() -> i64 {
    let now: DateTime<Utc> = Utc::now();
    now.timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- IntentKind ----

    #[test]
    fn test_intent_kind_has_14_variants() {
        assert_eq!(IntentKind::ALL.len(), 14);
    }

    #[test]
    fn test_intent_kind_wire_names() {
        assert_eq!(IntentKind::FindEvents.as_str(), "find_events");
        assert_eq!(IntentKind::MyBookings.as_str(), "my_bookings");
        assert_eq!(IntentKind::General.as_str(), "general");
    }

    #[test]
    fn test_intent_kind_serde_matches_as_str() {
        for kind in IntentKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            let parsed: IntentKind = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn test_intent_kind_unknown_rejected() {
        let result: Result<IntentKind, _> = serde_json::from_str("\"order_pizza\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_data_category_mapping() {
        assert_eq!(IntentKind::FindEvents.data_category(), DataCategory::Events);
        assert_eq!(IntentKind::FilterEvents.data_category(), DataCategory::Events);
        assert_eq!(IntentKind::EventQuestion.data_category(), DataCategory::Events);
        assert_eq!(IntentKind::FindClubs.data_category(), DataCategory::Clubs);
        assert_eq!(IntentKind::Directions.data_category(), DataCategory::Clubs);
        assert_eq!(IntentKind::MyBookings.data_category(), DataCategory::Bookings);
        assert_eq!(IntentKind::BookingStatus.data_category(), DataCategory::Bookings);
        assert_eq!(IntentKind::PolicyQuery.data_category(), DataCategory::General);
        assert_eq!(IntentKind::General.data_category(), DataCategory::General);
    }

    // ---- Intent ----

    #[test]
    fn test_intent_new_clamps_confidence() {
        assert_eq!(Intent::new(IntentKind::General, 1.7).confidence, 1.0);
        assert_eq!(Intent::new(IntentKind::General, -0.2).confidence, 0.0);
        assert_eq!(Intent::new(IntentKind::General, 0.5).confidence, 0.5);
    }

    #[test]
    fn test_intent_serde_type_field() {
        let intent = Intent::new(IntentKind::FindClubs, 0.9);
        let json = serde_json::to_string(&intent).unwrap();
        assert!(json.contains("\"type\":\"find_clubs\""));
    }

    #[test]
    fn test_slots_deserialize_camel_case() {
        let json = r#"{"eventName":"Neon Night","nearMe":true,"location":"Marina"}"#;
        let slots: ExtractedSlots = serde_json::from_str(json).unwrap();
        assert_eq!(slots.event_name.as_deref(), Some("Neon Night"));
        assert!(slots.near_me);
        assert_eq!(slots.location.as_deref(), Some("Marina"));
        assert!(slots.club_name.is_none());
    }

    #[test]
    fn test_slots_default_when_empty() {
        let slots: ExtractedSlots = serde_json::from_str("{}").unwrap();
        assert!(!slots.near_me);
        assert!(slots.event_name.is_none());
    }

    // ---- FallbackTier ----

    #[test]
    fn test_fallback_tier_labels() {
        assert_eq!(FallbackTier::AiPlan.as_str(), "ai-plan");
        assert_eq!(FallbackTier::RulePlan.as_str(), "rule-plan");
        assert_eq!(FallbackTier::GenericListing.as_str(), "generic-listing");
    }

    // ---- FetchedData ----

    #[test]
    fn test_fetched_data_empty_and_len() {
        let data = FetchedData::Events(vec![]);
        assert!(data.is_empty());
        assert_eq!(data.len(), 0);
        assert_eq!(data.entity_type(), "Event");

        let data = FetchedData::Clubs(vec![]);
        assert_eq!(data.entity_type(), "Club");

        let data = FetchedData::Bookings(vec![]);
        assert_eq!(data.entity_type(), "Order");
    }

    // ---- StreamEvent wire shape ----

    #[test]
    fn test_stream_event_connection_wire() {
        let e = StreamEvent::Connection {
            message: "connected".to_string(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"type\":\"connection\""));
    }

    #[test]
    fn test_stream_event_token_wire() {
        let e = StreamEvent::Token {
            text: "hello ".to_string(),
            is_complete: false,
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"type\":\"token\""));
        assert!(json.contains("\"isComplete\":false"));
    }

    #[test]
    fn test_stream_event_heartbeat_wire() {
        let json = serde_json::to_string(&StreamEvent::heartbeat_now()).unwrap();
        assert!(json.contains("\"type\":\"heartbeat\""));
        assert!(json.contains("\"ts\":"));
    }

    #[test]
    fn test_stream_event_complete_wire() {
        let outcome = ChatOutcome {
            response: "Check out Neon Night at Velour.".to_string(),
            intent_type: IntentKind::FindEvents,
            confidence: 0.92,
            cards: vec![],
            tier: Some(FallbackTier::RulePlan),
        };
        let json = serde_json::to_string(&StreamEvent::complete(&outcome)).unwrap();
        assert!(json.contains("\"type\":\"complete\""));
        assert!(json.contains("\"intentType\":\"find_events\""));
        assert!(json.contains("Neon Night"));
    }

    #[test]
    fn test_stream_event_error_wire() {
        let e = StreamEvent::Error {
            message: "message is required".to_string(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"type\":\"error\""));
    }

    #[test]
    fn test_terminal_classification() {
        assert!(StreamEvent::Error {
            message: String::new()
        }
        .is_terminal());
        assert!(!StreamEvent::heartbeat_now().is_terminal());
        assert!(!StreamEvent::Token {
            text: String::new(),
            is_complete: true
        }
        .is_terminal());
    }

    #[test]
    fn test_stream_event_round_trip() {
        let e = StreamEvent::Token {
            text: "velvet ".to_string(),
            is_complete: true,
        };
        let json = serde_json::to_string(&e).unwrap();
        let parsed: StreamEvent = serde_json::from_str(&json).unwrap();
        match parsed {
            StreamEvent::Token { text, is_complete } => {
                assert_eq!(text, "velvet ");
                assert!(is_complete);
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    // ---- ChatRequest ----

    #[test]
    fn test_chat_request_minimal_json() {
        let req: ChatRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(req.message, "hi");
        assert!(req.history.is_empty());
        assert!(req.city.is_none());
        assert!(req.user_location.is_none());
    }

    #[test]
    fn test_chat_outcome_serializes_intent_type() {
        let outcome = ChatOutcome {
            response: "r".to_string(),
            intent_type: IntentKind::General,
            confidence: 0.5,
            cards: vec![],
            tier: None,
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"intentType\":\"general\""));
        // tier is internal observability, not wire data
        assert!(!json.contains("tier"));
    }
}
