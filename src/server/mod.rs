//! HTTP surface: health check and the SSE chat endpoint.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::agents::ConversationAgent;

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<ConversationAgent>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/chat/completion", get(completion))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct CompletionParams {
    #[serde(default)]
    query: String,
    #[serde(default, rename = "conversationId")]
    conversation_id: Option<String>,
}

async fn completion(
    State(state): State<AppState>,
    Query(params): Query<CompletionParams>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let conversation_id = params
        .conversation_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    info!(query = %params.query, %conversation_id, "chat completion");

    let events = state
        .agent
        .run(params.query, conversation_id)
        .map(|event| Ok(Event::default().event(event.event_type()).data(event.payload_json())));

    Sse::new(events).keep_alive(KeepAlive::default())
}
