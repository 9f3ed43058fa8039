//! In-memory store implementation.
//!
//! Backs the assistant in local runs and tests. Filtering mirrors the
//! document-store read paths: approval flag, city, upcoming-event
//! constraint, and population of nested events/orders.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use velvet_core::types::{Club, Order};
use velvet_core::Result;

use crate::store::{ClubQuery, EventDetails, Store};

/// A fixed dataset served through the [`Store`] trait.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    clubs: Vec<Club>,
    orders: HashMap<Uuid, Vec<Order>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a club (with any populated events) to the dataset.
    pub fn with_club(mut self, club: Club) -> Self {
        self.clubs.push(club);
        self
    }

    /// Register a user's orders.
    pub fn with_orders(mut self, user_id: Uuid, orders: Vec<Order>) -> Self {
        self.orders.insert(user_id, orders);
        self
    }

    pub fn club_count(&self) -> usize {
        self.clubs.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn approved_clubs(&self, query: ClubQuery) -> Result<Vec<Club>> {
        let today = Utc::now().date_naive();
        let city = query.city.to_lowercase();

        let clubs = self
            .clubs
            .iter()
            .filter(|c| c.is_approved)
            .filter(|c| c.city.to_lowercase() == city)
            .filter(|c| !query.require_upcoming_events || c.has_upcoming_events(today))
            .take(query.limit)
            .map(|c| {
                let mut club = c.clone();
                if query.populate_events {
                    club.events.retain(|e| e.is_upcoming(today));
                } else {
                    club.events = Vec::new();
                }
                club
            })
            .collect();

        Ok(clubs)
    }

    async fn find_event(&self, name: &str, venue: Option<&str>) -> Result<Option<EventDetails>> {
        let name = name.trim().to_lowercase();
        let venue = venue.map(|v| v.trim().to_lowercase());

        for club in &self.clubs {
            if let Some(ref venue) = venue {
                if club.name.to_lowercase() != *venue {
                    continue;
                }
            }
            if let Some(event) = club
                .events
                .iter()
                .find(|e| e.name.to_lowercase() == name)
            {
                return Ok(Some(EventDetails {
                    event: event.clone(),
                    venue_name: club.name.clone(),
                    venue_city: club.city.clone(),
                    map_link: club.map_link.clone(),
                }));
            }
        }

        Ok(None)
    }

    async fn paid_orders(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let orders = self
            .orders
            .get(&user_id)
            .map(|orders| orders.iter().filter(|o| o.is_paid).cloned().collect())
            .unwrap_or_default();
        Ok(orders)
    }
}
