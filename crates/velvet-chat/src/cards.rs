//! Card assembly.
//!
//! Packages already-fetched data into at most one bounded preview block
//! per response. Pure transform; never re-queries the store.

use velvet_core::types::Order;

use crate::types::{
    CardBlock, CardItem, CardKind, ClubHit, DataCategory, EventHit, FetchedData, IntentKind,
};

/// Upper bound on entries per card block.
pub const MAX_CARD_ITEMS: usize = 4;

/// Build preview cards for the response.
///
/// At most one block, keyed by the intent's data category; an empty vec
/// when the category has no corresponding fetched list.
pub fn assemble_cards(kind: IntentKind, data: &FetchedData) -> Vec<CardBlock> {
    let block = match (kind.data_category(), data) {
        (DataCategory::Events, FetchedData::Events(events)) => event_block(events),
        (DataCategory::Clubs, FetchedData::Clubs(clubs)) => club_block(clubs),
        (DataCategory::Bookings, FetchedData::Bookings(orders)) => booking_block(orders),
        _ => None,
    };
    block.into_iter().collect()
}

fn event_block(events: &[EventHit]) -> Option<CardBlock> {
    if events.is_empty() {
        return None;
    }
    let items = events
        .iter()
        .take(MAX_CARD_ITEMS)
        .map(|hit| CardItem {
            id: hit.event.id,
            title: hit.event.name.clone(),
            subtitle: Some(format!("{}, {}", hit.venue_name, hit.venue_city)),
            detail: Some(event_detail(hit)),
            image: hit.event.cover_image.clone(),
        })
        .collect();
    Some(CardBlock {
        kind: CardKind::Events,
        title: "Upcoming events".to_string(),
        items,
    })
}

fn club_block(clubs: &[ClubHit]) -> Option<CardBlock> {
    if clubs.is_empty() {
        return None;
    }
    let items = clubs
        .iter()
        .take(MAX_CARD_ITEMS)
        .map(|hit| CardItem {
            id: hit.club.id,
            title: hit.club.name.clone(),
            subtitle: Some(hit.club.city.clone()),
            detail: club_detail(hit),
            image: hit.club.photos.first().cloned(),
        })
        .collect();
    Some(CardBlock {
        kind: CardKind::Clubs,
        title: "Clubs for you".to_string(),
        items,
    })
}

fn booking_block(orders: &[Order]) -> Option<CardBlock> {
    if orders.is_empty() {
        return None;
    }
    let items = orders
        .iter()
        .take(MAX_CARD_ITEMS)
        .map(|order| CardItem {
            id: order.id,
            title: order
                .event
                .as_ref()
                .map(|e| e.name.clone())
                .unwrap_or_else(|| "Booking".to_string()),
            subtitle: order.club.as_ref().map(|c| c.name.clone()),
            detail: Some(format!("x{}", order.quantity)),
            image: order.event.as_ref().and_then(|e| e.cover_image.clone()),
        })
        .collect();
    Some(CardBlock {
        kind: CardKind::Mixed,
        title: "Your bookings".to_string(),
        items,
    })
}

fn event_detail(hit: &EventHit) -> String {
    let mut parts = vec![hit.event.date.to_string()];
    if let Some(ref time) = hit.event.time {
        parts.push(time.clone());
    }
    if let Some(price) = hit.event.min_ticket_price() {
        parts.push(format!("from {:.0}", price));
    }
    if let Some(ref distance) = hit.distance {
        parts.push(distance.text.clone());
    }
    parts.join(" | ")
}

fn club_detail(hit: &ClubHit) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(ref venue_type) = hit.club.type_of_venue {
        parts.push(venue_type.clone());
    }
    if let Some(rating) = hit.club.rating {
        parts.push(format!("{:.1}", rating));
    }
    if let Some(ref distance) = hit.distance {
        parts.push(distance.text.clone());
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" | "))
    }
}
