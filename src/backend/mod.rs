//! Model backends.
//!
//! A [`Backend`] answers one prompt with a list of untagged
//! [`ResponseItem`]s. Rate limiting, retries and tagging happen around it in
//! the orchestrator, so an implementation only has to make the call. A real
//! provider client would implement this trait in place of
//! [`SimulatedBackend`].

use async_trait::async_trait;
use thiserror::Error;

use crate::orchestrator::types::ResponseItem;

pub mod simulated;

pub use simulated::SimulatedBackend;

/// A single failed backend call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CallError {
    pub message: String,
}

impl CallError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Something that can answer a prompt.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<Vec<ResponseItem>, CallError>;
}
