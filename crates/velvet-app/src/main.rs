//! Velvet application binary - composition root.
//!
//! Ties the assistant crates into a single executable:
//! 1. Parse CLI args and load configuration from TOML
//! 2. Initialize tracing
//! 3. Wire the store and the external collaborators (language model, geo)
//! 4. Build the chat engine and start the axum API server
//!
//! The directory/ticketing document store is owned by the platform's CRUD
//! side; this binary serves a seeded in-memory read replica so the
//! assistant can run standalone.

use std::sync::Arc;

use clap::Parser;
use uuid::Uuid;

use velvet_api::{start_server, AppState};
use velvet_chat::ChatEngine;
use velvet_core::config::VelvetConfig;
use velvet_core::types::{Club, Event, EventStatus, Ticket};
use velvet_geo::HttpDistanceProvider;
use velvet_llm::HttpLanguageModel;
use velvet_store::MemoryStore;

mod cli;

/// Demo read replica: a handful of approved venues with upcoming events.
fn seed_store(city: &str) -> MemoryStore {
    let in_days = |days: i64| chrono::Utc::now().date_naive() + chrono::Duration::days(days);

    let event = |name: &str, days: i64, price: f64| Event {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: String::new(),
        date: in_days(days),
        time: Some("22:00".to_string()),
        dj_artists: vec!["DJ Nova".to_string()],
        tickets: vec![Ticket {
            id: Uuid::new_v4(),
            name: "Standard".to_string(),
            price,
        }],
        menu_items: vec![],
        guest_experience: None,
        cover_image: None,
        status: EventStatus::Active,
        is_featured: false,
    };

    let club = |name: &str, map_link: &str, events: Vec<Event>| Club {
        id: Uuid::new_v4(),
        name: name.to_string(),
        city: city.to_string(),
        is_approved: true,
        map_link: Some(map_link.to_string()),
        events,
        rating: Some(4.5),
        photos: vec![],
        type_of_venue: Some("nightclub".to_string()),
        club_description: None,
        operating_days: vec!["Thu".to_string(), "Fri".to_string(), "Sat".to_string()],
        address: None,
        phone: None,
    };

    MemoryStore::new()
        .with_club(club(
            "Velour",
            "https://maps.example.com/@25.2048,55.2708",
            vec![event("Neon Night", 3, 150.0)],
        ))
        .with_club(club(
            "Basement",
            "https://maps.example.com/@25.2110,55.2800",
            vec![event("Deep Sessions", 5, 120.0)],
        ))
        .with_club(club(
            "Marina Loft",
            "https://maps.example.com/@25.0800,55.1400",
            vec![event("Rooftop Live", 7, 200.0)],
        ))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::CliArgs::parse();

    // Config.
    let config_path = args.resolve_config_path();
    let mut config = VelvetConfig::load_or_default(&config_path);
    config.general.port = args.resolve_port(config.general.port);
    if let Some(level) = args.log_level.clone() {
        config.general.log_level = level;
    }

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.general.log_level.clone())),
        )
        .init();

    tracing::info!("Starting Velvet v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_path.display(), "Configuration loaded");

    // Store and collaborators.
    let store = Arc::new(seed_store(&config.general.default_city));
    tracing::info!(clubs = store.club_count(), "In-memory store seeded");

    let llm = Arc::new(HttpLanguageModel::new(&config.llm)?);
    let geo = Arc::new(HttpDistanceProvider::new(&config.geo)?);

    // Engine and server.
    let engine = ChatEngine::new(
        store,
        llm,
        geo,
        config.chat.clone(),
        config.general.default_city.clone(),
    );
    let state = AppState::new(engine, config);

    start_server(state).await?;

    Ok(())
}
