//! Route handler functions.
//!
//! The chat endpoint serves both delivery modes from one pipeline: with
//! `stream` set it returns an SSE event sequence, otherwise a single
//! Complete-shaped JSON object with identical content.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use velvet_chat::types::ChatRequest;
use velvet_chat::StreamEvent;
use velvet_core::types::{ChatTurn, Coordinates};

use crate::error::ApiError;
use crate::state::AppState;

/// Buffered events between the pipeline task and the SSE writer.
const STREAM_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// Request / response types
// =============================================================================

/// Request body for POST /assistant/chat.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatBody {
    /// The user's message. Missing or empty is the one input error the
    /// engine raises directly.
    pub message: Option<String>,
    /// Prior turns in conversational order.
    pub history: Vec<ChatTurn>,
    pub city: Option<String>,
    pub user_location: Option<Coordinates>,
    pub user_id: Option<Uuid>,
    pub screen: Option<String>,
    /// When set, deliver the response as an SSE event sequence.
    pub stream: bool,
}

impl Default for ChatBody {
    fn default() -> Self {
        Self {
            message: None,
            history: Vec::new(),
            city: None,
            user_location: None,
            user_id: None,
            screen: None,
            stream: false,
        }
    }
}

impl ChatBody {
    fn into_request(self) -> ChatRequest {
        ChatRequest {
            message: self.message.unwrap_or_default(),
            history: self.history,
            city: self.city,
            user_location: self.user_location,
            user_id: self.user_id,
            screen: self.screen,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /assistant/chat - run the assistant pipeline.
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Result<Response, ApiError> {
    let stream_mode = body.stream;
    let request = body.into_request();

    if stream_mode {
        Ok(chat_stream(state, request).await.into_response())
    } else {
        let outcome = state.engine.respond(&request).await?;
        Ok(Json(outcome).into_response())
    }
}

/// Streaming mode: the pipeline runs in its own task and writes framed
/// events into a bounded channel; the SSE body drains it. Dropping the
/// connection closes the channel, which turns every later write into a
/// silent no-op on the engine side.
async fn chat_stream(
    state: AppState,
    request: ChatRequest,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>> + Send> {
    let (tx, rx) = tokio::sync::mpsc::channel::<StreamEvent>(STREAM_CHANNEL_CAPACITY);

    let engine = Arc::clone(&state.engine);
    tokio::spawn(async move {
        engine.stream(request, tx).await;
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(Event::default().data(data))
    });

    Sse::new(stream)
}

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
