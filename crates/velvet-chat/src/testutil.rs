//! Shared test doubles for the engine: scripted collaborators and a
//! seeded in-memory store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use velvet_core::types::{Club, Coordinates, Event, EventStatus, Order, OrderStatus, Ticket};
use velvet_core::Result;
use velvet_geo::{DistanceMethod, DistanceProvider, DistanceResult, GeoError};
use velvet_llm::{LanguageModel, LlmError};
use velvet_store::{ClubQuery, EventDetails, MemoryStore, Store};

// =============================================================================
// Scripted language model
// =============================================================================

/// A language model that replies with fixed text, or fails when the reply
/// is absent. Records calls so tests can assert on prompts and call counts.
#[derive(Default)]
pub(crate) struct StubLlm {
    pub classify_reply: Option<String>,
    pub generate_reply: Option<String>,
    pub classify_calls: AtomicUsize,
    pub generate_calls: Mutex<Vec<(String, String)>>,
}

impl StubLlm {
    pub fn classifying(reply: &str) -> Self {
        Self {
            classify_reply: Some(reply.to_string()),
            generate_reply: Some("Here is what I found.".to_string()),
            ..Self::default()
        }
    }

    pub fn offline() -> Self {
        Self::default()
    }

    pub fn classify_call_count(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }

    pub fn last_generate_user_message(&self) -> Option<String> {
        self.generate_calls
            .lock()
            .unwrap()
            .last()
            .map(|(_, user)| user.clone())
    }
}

#[async_trait]
impl LanguageModel for StubLlm {
    async fn classify_intent(
        &self,
        _system_prompt: &str,
        _user_message: &str,
    ) -> std::result::Result<String, LlmError> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        self.classify_reply
            .clone()
            .ok_or_else(|| LlmError::Http("stub offline".to_string()))
    }

    async fn generate_text(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> std::result::Result<String, LlmError> {
        self.generate_calls
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_message.to_string()));
        self.generate_reply
            .clone()
            .ok_or_else(|| LlmError::Http("stub offline".to_string()))
    }
}

// =============================================================================
// Scripted distance provider
// =============================================================================

/// Resolves a distance when any registered key is a substring of the
/// destination reference; fails otherwise.
#[derive(Default)]
pub(crate) struct StubGeo {
    pub distances: HashMap<String, u32>,
}

impl StubGeo {
    pub fn with(mut self, key: &str, meters: u32) -> Self {
        self.distances.insert(key.to_string(), meters);
        self
    }
}

#[async_trait]
impl DistanceProvider for StubGeo {
    async fn distance(
        &self,
        _origin: Coordinates,
        destination_ref: &str,
    ) -> std::result::Result<DistanceResult, GeoError> {
        for (key, meters) in &self.distances {
            if destination_ref.contains(key.as_str()) {
                return Ok(DistanceResult {
                    meters: *meters,
                    text: format!("{:.1} km", f64::from(*meters) / 1000.0),
                    duration_text: Some("10 mins".to_string()),
                    method: DistanceMethod::Api,
                });
            }
        }
        Err(GeoError::Unresolvable(destination_ref.to_string()))
    }
}

// =============================================================================
// Failing store
// =============================================================================

/// A store whose every read fails; used to exhaust the fallback chain.
pub(crate) struct FailingStore;

#[async_trait]
impl Store for FailingStore {
    async fn approved_clubs(&self, _query: ClubQuery) -> Result<Vec<Club>> {
        Err(velvet_core::VelvetError::Store("store offline".to_string()))
    }

    async fn find_event(&self, _name: &str, _venue: Option<&str>) -> Result<Option<EventDetails>> {
        Err(velvet_core::VelvetError::Store("store offline".to_string()))
    }

    async fn paid_orders(&self, _user_id: Uuid) -> Result<Vec<Order>> {
        Err(velvet_core::VelvetError::Store("store offline".to_string()))
    }
}

// =============================================================================
// Seeded data
// =============================================================================

pub(crate) fn future_date() -> NaiveDate {
    Utc::now().date_naive() + chrono::Duration::days(30)
}

pub(crate) fn make_event(name: &str) -> Event {
    Event {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: format!("{} at its finest", name),
        date: future_date(),
        time: Some("22:00".to_string()),
        dj_artists: vec!["DJ Nova".to_string()],
        tickets: vec![Ticket {
            id: Uuid::new_v4(),
            name: "Standard".to_string(),
            price: 150.0,
        }],
        menu_items: vec![],
        guest_experience: None,
        cover_image: None,
        status: EventStatus::Active,
        is_featured: false,
    }
}

pub(crate) fn make_club(name: &str, city: &str, map_link: &str, events: Vec<Event>) -> Club {
    Club {
        id: Uuid::new_v4(),
        name: name.to_string(),
        city: city.to_string(),
        is_approved: true,
        map_link: Some(map_link.to_string()),
        events,
        rating: Some(4.4),
        photos: vec![],
        type_of_venue: Some("nightclub".to_string()),
        club_description: None,
        operating_days: vec![],
        address: None,
        phone: None,
    }
}

pub(crate) fn make_paid_order(event: Event, club: Club) -> Order {
    Order {
        id: Uuid::new_v4(),
        ticket: event.tickets.first().cloned(),
        event: Some(event),
        club: Some(club),
        quantity: 2,
        status: OrderStatus::Confirmed,
        is_paid: true,
        created_at: Utc::now(),
    }
}

/// Three Dubai clubs (two with upcoming events) plus one Abu Dhabi club.
pub(crate) fn seeded_store() -> MemoryStore {
    MemoryStore::new()
        .with_club(make_club(
            "Velour",
            "Dubai",
            "https://maps.example.com/velour/@25.20,55.27",
            vec![make_event("Neon Night")],
        ))
        .with_club(make_club(
            "Basement",
            "Dubai",
            "https://maps.example.com/basement/@25.21,55.28",
            vec![make_event("Deep Sessions")],
        ))
        .with_club(make_club(
            "Hidden Door",
            "Dubai",
            "https://maps.example.com/hiddendoor/@25.22,55.29",
            vec![],
        ))
        .with_club(make_club(
            "Marina Loft",
            "Abu Dhabi",
            "https://maps.example.com/marinaloft/@24.45,54.38",
            vec![make_event("Rooftop Live")],
        ))
}

pub(crate) fn dubai_location() -> Coordinates {
    Coordinates {
        lat: 25.2048,
        lng: 55.2708,
    }
}
