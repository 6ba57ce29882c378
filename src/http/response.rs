//! Response shaping for the HTTP surface.
//!
//! The orchestrator returns items in backend order; ranking for display
//! happens here.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::orchestrator::{ResponseItem, StatusEvent};

/// Sort items by confidence, highest first. Ties keep their original order.
pub fn rank_by_confidence(mut items: Vec<ResponseItem>) -> Vec<ResponseItem> {
    items.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    items
}

/// Body of `POST /query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub prompt: String,
}

/// Result of `POST /query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Ranked items from every backend that succeeded.
    pub responses: Vec<ResponseItem>,
    /// Every status event, in emission order.
    pub statuses: Vec<StatusEvent>,
}

/// One backend in `GET /backends`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendSummary {
    pub name: String,
    pub refill_rate_per_sec: f64,
    pub capacity: f64,
    pub available_tokens: f64,
    pub queued: usize,
}

/// Errors surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(serde_json::json!({
            "error": { "message": self.to_string() }
        }));

        (status, body).into_response()
    }
}
