//! Application state shared across route handlers.

use std::sync::Arc;
use std::time::Instant;

use velvet_chat::ChatEngine;
use velvet_core::config::VelvetConfig;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks; the engine
/// itself holds no per-request state.
#[derive(Clone)]
pub struct AppState {
    /// The conversational engine.
    pub engine: Arc<ChatEngine>,
    /// Application configuration.
    pub config: Arc<VelvetConfig>,
    /// Server start time for uptime reporting.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(engine: ChatEngine, config: VelvetConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }
}
