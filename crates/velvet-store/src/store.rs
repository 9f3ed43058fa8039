//! Read-only store contract used by the assistant core.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use velvet_core::types::{Club, Event, Order};
use velvet_core::Result;

/// Query shape for the club directory read path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClubQuery {
    /// City filter, matched case-insensitively.
    pub city: String,
    /// Only return clubs with at least one active, future-dated event.
    pub require_upcoming_events: bool,
    /// Attach the club's upcoming events to the result.
    pub populate_events: bool,
    /// Hard cap on returned clubs.
    pub limit: usize,
}

impl ClubQuery {
    /// Approved clubs in a city, no event constraint, no population.
    pub fn listing(city: impl Into<String>, limit: usize) -> Self {
        Self {
            city: city.into(),
            require_upcoming_events: false,
            populate_events: false,
            limit,
        }
    }

    /// Approved clubs in a city that are hosting upcoming events,
    /// with the events populated.
    pub fn with_events(city: impl Into<String>, limit: usize) -> Self {
        Self {
            city: city.into(),
            require_upcoming_events: true,
            populate_events: true,
            limit,
        }
    }
}

/// An event together with the denormalized venue fields the composer
/// and card assembler need.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventDetails {
    pub event: Event,
    pub venue_name: String,
    pub venue_city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_link: Option<String>,
}

/// Read access to the platform's document store.
///
/// Only approved, client-visible data flows through this trait; the write
/// paths (editing, approval, auth bookkeeping) belong to the CRUD side of
/// the platform and are not represented here.
#[async_trait]
pub trait Store: Send + Sync {
    /// Approved clubs matching the query, capped at `query.limit`.
    async fn approved_clubs(&self, query: ClubQuery) -> Result<Vec<Club>>;

    /// Case-insensitive event lookup by name, optionally constrained to a
    /// venue name. Returns the first match with its venue attached.
    async fn find_event(&self, name: &str, venue: Option<&str>) -> Result<Option<EventDetails>>;

    /// Paid orders for a user, populated with event, ticket, and club.
    async fn paid_orders(&self, user_id: Uuid) -> Result<Vec<Order>>;
}
