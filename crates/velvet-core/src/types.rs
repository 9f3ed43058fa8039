use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Who authored a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Lifecycle status of an event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Created but not yet approved for listing.
    Draft,
    /// Approved and open for booking.
    #[default]
    Active,
    /// Cancelled by the venue or an admin.
    Cancelled,
    /// Already happened.
    Completed,
}

/// Lifecycle status of a ticket order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

// =============================================================================
// Conversation
// =============================================================================

/// One turn of a conversation, supplied by the caller in insertion order.
///
/// The engine never persists turns; history lives with the client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: None,
        }
    }
}

/// A latitude/longitude pair supplied by the client.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

// =============================================================================
// Store read-model entities
// =============================================================================

/// A venue in the club directory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Club {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub is_approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_link: Option<String>,
    /// Populated events; empty when the fetch did not populate them.
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_of_venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub club_description: Option<String>,
    #[serde(default)]
    pub operating_days: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Club {
    /// Whether the club has at least one active, future-dated event.
    pub fn has_upcoming_events(&self, today: NaiveDate) -> bool {
        self.events.iter().any(|e| e.is_upcoming(today))
    }
}

/// An event hosted at a club.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default)]
    pub dj_artists: Vec<String>,
    #[serde(default)]
    pub tickets: Vec<Ticket>,
    #[serde(default)]
    pub menu_items: Vec<MenuItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_experience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub is_featured: bool,
}

impl Event {
    /// Whether the event is active and dated today or later.
    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.status == EventStatus::Active && self.date >= today
    }

    /// Lowest ticket price, if any tickets exist.
    pub fn min_ticket_price(&self) -> Option<f64> {
        self.tickets
            .iter()
            .map(|t| t.price)
            .min_by(|a, b| a.total_cmp(b))
    }
}

/// A purchasable ticket tier for an event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
}

/// A menu item offered at an event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// A ticket order, populated with its event/club/ticket when fetched
/// through the bookings read path.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<Event>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub club: Option<Club>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<Ticket>,
    pub quantity: u32,
    #[serde(default)]
    pub status: OrderStatus,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
}

/// A platform user, carrying order references only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub orders: Vec<Uuid>,
}
