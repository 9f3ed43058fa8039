//! Velvet API crate - axum HTTP server for the assistant.
//!
//! Exposes the chat entry point in both delivery modes (SSE streaming and
//! one-shot JSON) plus a health check, behind CORS, tracing, and
//! compression middleware.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
