//! Request handlers.

use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::Response,
    Json,
};
use serde::Deserialize;

use crate::http::response::{rank_by_confidence, ApiError, BackendSummary, QueryRequest, QueryResponse};
use crate::http::server::AppState;
use crate::http::websocket::stream_query;
use crate::orchestrator::StatusLog;

#[derive(Debug, Deserialize)]
pub struct StreamParams {
    pub prompt: String,
}

pub async fn health() -> &'static str {
    "ok"
}

/// `POST /query`: fan out, wait for every backend, return ranked items.
pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let prompt = validate_prompt(request.prompt)?;

    let log = StatusLog::new();
    let items = state.orchestrator.query_all(&prompt, Some(&log)).await;

    Ok(Json(QueryResponse {
        responses: rank_by_confidence(items),
        statuses: log.events(),
    }))
}

/// `GET /query/stream?prompt=...`: same fan-out, progress streamed live.
pub async fn stream(
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let prompt = validate_prompt(params.prompt)?;
    let orchestrator = state.orchestrator.clone();
    Ok(ws.on_upgrade(move |socket| stream_query(socket, orchestrator, prompt)))
}

/// `GET /backends`: rate-limit state of every backend.
pub async fn backends(State(state): State<AppState>) -> Json<Vec<BackendSummary>> {
    let orchestrator = &state.orchestrator;
    let summaries = orchestrator
        .backend_names()
        .filter_map(|name| {
            orchestrator.limiter(name).map(|limiter| BackendSummary {
                name: name.to_string(),
                refill_rate_per_sec: limiter.refill_rate(),
                capacity: limiter.capacity(),
                available_tokens: limiter.available_tokens(),
                queued: limiter.queued(),
            })
        })
        .collect();

    Json(summaries)
}

fn validate_prompt(prompt: String) -> Result<String, ApiError> {
    if prompt.trim().is_empty() {
        return Err(ApiError::InvalidRequest("prompt must not be empty".to_string()));
    }
    Ok(prompt)
}
