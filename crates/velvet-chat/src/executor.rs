//! Plan execution.
//!
//! Runs a [`QueryPlan`] against the store, attaches distances when the
//! request asked for nearby results, and flattens events out of their
//! clubs when the plan targets events.

use std::sync::Arc;

use futures::future::join_all;

use velvet_core::types::{Club, Coordinates};
use velvet_core::Result;
use velvet_geo::DistanceProvider;
use velvet_store::{ClubQuery, Store};

use crate::types::{ClubHit, EventHit, FetchedData, PlanFilter, QueryPlan, TargetEntity};

/// Sort key for entries whose distance could not be resolved: maximum
/// distance, so they sort last without being dropped.
pub const SENTINEL_METERS: u32 = u32::MAX;

/// Executes query plans against the store and geo collaborators.
pub struct Executor {
    store: Arc<dyn Store>,
    geo: Arc<dyn DistanceProvider>,
}

impl Executor {
    pub fn new(store: Arc<dyn Store>, geo: Arc<dyn DistanceProvider>) -> Self {
        Self { store, geo }
    }

    /// Run a plan. `origin` is present only when the intent asked for
    /// nearby results and the caller supplied a location; it triggers the
    /// per-club distance fan-out.
    pub async fn execute(
        &self,
        plan: &QueryPlan,
        origin: Option<Coordinates>,
    ) -> Result<FetchedData> {
        match &plan.filter {
            PlanFilter::ApprovedClubs {
                city,
                require_upcoming_events,
            } => {
                let clubs = self
                    .store
                    .approved_clubs(ClubQuery {
                        city: city.clone(),
                        require_upcoming_events: *require_upcoming_events,
                        populate_events: plan.populate.events,
                        limit: plan.limit,
                    })
                    .await?;

                let hits = match origin {
                    Some(origin) => self.attach_distances(clubs, origin).await,
                    None => clubs
                        .into_iter()
                        .map(|club| ClubHit {
                            club,
                            distance: None,
                        })
                        .collect(),
                };

                let data = match plan.target {
                    TargetEntity::Event => {
                        let mut events = flatten_events(hits);
                        events.truncate(plan.limit);
                        FetchedData::Events(events)
                    }
                    _ => FetchedData::Clubs(hits),
                };

                tracing::debug!(
                    entity = data.entity_type(),
                    count = data.len(),
                    "Plan executed"
                );
                Ok(data)
            }
            PlanFilter::PaidOrders { user_id } => {
                let mut orders = self.store.paid_orders(*user_id).await?;
                orders.truncate(plan.limit);
                Ok(FetchedData::Bookings(orders))
            }
            PlanFilter::EventByName { name, venue } => {
                let hit = self
                    .store
                    .find_event(name, venue.as_deref())
                    .await?
                    .map(|details| EventHit {
                        event: details.event,
                        venue_name: details.venue_name,
                        venue_city: details.venue_city,
                        distance: None,
                    });
                Ok(FetchedData::Events(hit.into_iter().collect()))
            }
        }
    }

    /// One distance lookup per club, issued concurrently and joined before
    /// sorting. A failed lookup degrades that entry to the sentinel sort
    /// key instead of failing the batch.
    async fn attach_distances(&self, clubs: Vec<Club>, origin: Coordinates) -> Vec<ClubHit> {
        let lookups = clubs.into_iter().map(|club| {
            let geo = Arc::clone(&self.geo);
            async move {
                let destination = destination_ref(&club);
                let distance = match geo.distance(origin, &destination).await {
                    Ok(d) => Some(d),
                    Err(e) => {
                        tracing::debug!(club = %club.name, error = %e, "Distance lookup failed");
                        None
                    }
                };
                ClubHit { club, distance }
            }
        });

        let mut hits: Vec<ClubHit> = join_all(lookups).await;
        hits.sort_by_key(sort_meters);
        hits
    }
}

/// The reference handed to the distance collaborator: map link, then
/// street address, then "name, city" as a last resort.
fn destination_ref(club: &Club) -> String {
    club.map_link
        .clone()
        .or_else(|| club.address.clone())
        .unwrap_or_else(|| format!("{}, {}", club.name, club.city))
}

fn sort_meters(hit: &ClubHit) -> u32 {
    hit.distance
        .as_ref()
        .map(|d| d.meters)
        .unwrap_or(SENTINEL_METERS)
}

/// Flatten events out of populated clubs into a flat list carrying the
/// denormalized venue name/city and any computed distance. Pure transform,
/// no I/O; input order (already distance-sorted when relevant) is kept.
pub fn flatten_events(hits: Vec<ClubHit>) -> Vec<EventHit> {
    hits.into_iter()
        .flat_map(|hit| {
            let venue_name = hit.club.name.clone();
            let venue_city = hit.club.city.clone();
            let distance = hit.distance.clone();
            hit.club.events.into_iter().map(move |event| EventHit {
                event,
                venue_name: venue_name.clone(),
                venue_city: venue_city.clone(),
                distance: distance.clone(),
            })
        })
        .collect()
}
