//! Fan-out data model and error definitions.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::backend::CallError;
use crate::limiter::LimiterError;

/// One answer produced by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseItem {
    /// Unique identifier.
    pub id: Uuid,
    /// Answer text.
    pub content: String,
    /// Backend's confidence in the answer, 0..=1.
    pub confidence: f64,
    /// Backends that contributed, the producing backend last.
    pub contributing_backends: Vec<String>,
    /// Backend that produced the item; set when the orchestrator tags it.
    pub origin_backend: Option<String>,
}

impl ResponseItem {
    /// Create an untagged item. Confidence is clamped to 0..=1.
    pub fn new(content: impl Into<String>, confidence: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            confidence: confidence.clamp(0.0, 1.0),
            contributing_backends: Vec::new(),
            origin_backend: None,
        }
    }

    /// Record `backend` as the producer of this item.
    pub fn tagged_by(mut self, backend: &str) -> Self {
        self.contributing_backends.push(backend.to_string());
        self.origin_backend = Some(backend.to_string());
        self
    }
}

/// Successful single-backend query.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub data: Vec<ResponseItem>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub source: String,
}

impl ApiResponse {
    pub fn new(source: &str, data: Vec<ResponseItem>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self {
            data,
            timestamp,
            source: source.to_string(),
        }
    }
}

/// Per-backend, per-call state.
///
/// ```text
/// idle → pending → success | error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendState {
    Idle,
    Pending,
    Success,
    Error,
}

impl BackendState {
    pub fn is_terminal(self) -> bool {
        matches!(self, BackendState::Success | BackendState::Error)
    }
}

/// Status transition pushed to a progress observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub backend: String,
    pub state: BackendState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusEvent {
    pub fn idle(backend: &str) -> Self {
        Self::bare(backend, BackendState::Idle)
    }

    pub fn pending(backend: &str) -> Self {
        Self::bare(backend, BackendState::Pending)
    }

    pub fn success(backend: &str, latency_ms: u64) -> Self {
        Self {
            latency_ms: Some(latency_ms),
            ..Self::bare(backend, BackendState::Success)
        }
    }

    pub fn error(backend: &str, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::bare(backend, BackendState::Error)
        }
    }

    fn bare(backend: &str, state: BackendState) -> Self {
        Self {
            backend: backend.to_string(),
            state,
            latency_ms: None,
            error: None,
        }
    }
}

/// Errors from querying a single backend.
#[derive(Debug, Error)]
pub enum QueryError {
    /// No backend (and so no limiter) with this name.
    #[error("no rate limiter configured for backend '{0}'")]
    NoLimiterConfigured(String),

    /// Could not get a token: timed out or the limiter shut down.
    #[error("admission to '{backend}' failed: {source}")]
    Admission {
        backend: String,
        #[source]
        source: LimiterError,
    },

    /// Every attempt failed.
    #[error("'{backend}' failed after {attempts} attempt(s): {source}")]
    Backend {
        backend: String,
        attempts: u32,
        #[source]
        source: CallError,
    },
}

/// Errors from assembling an orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("backend '{0}' registered twice")]
    DuplicateBackend(String),

    #[error("invalid rate profile for backend '{backend}': {source}")]
    InvalidProfile {
        backend: String,
        #[source]
        source: LimiterError,
    },
}
