//! Simulated model backend.
//!
//! Fabricates answers after a random delay and fails at a configured rate.

use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{Backend, CallError};
use crate::config::SimulationConfig;
use crate::orchestrator::types::ResponseItem;

const TEMPLATES: &[&str] = &[
    "{backend} suggests breaking \"{prompt}\" into smaller steps and solving each in turn.",
    "{backend} reads \"{prompt}\" as a request for a concise summary and answers with one.",
    "{backend} offers a worked example for \"{prompt}\" with the key trade-offs called out.",
    "{backend} recommends checking the assumptions behind \"{prompt}\" before going further.",
];

/// A backend that makes its answers up.
pub struct SimulatedBackend {
    name: String,
    config: SimulationConfig,
}

impl SimulatedBackend {
    pub fn new(name: impl Into<String>, config: SimulationConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    fn latency(&self) -> Duration {
        let low = self.config.latency_min_ms.min(self.config.latency_max_ms);
        let high = self.config.latency_min_ms.max(self.config.latency_max_ms);
        Duration::from_millis(fastrand::u64(low..=high))
    }

    fn confidence(&self) -> f64 {
        let low = self.config.min_confidence;
        let high = self.config.max_confidence.max(low);
        low + fastrand::f64() * (high - low)
    }

    fn fabricate(&self, prompt: &str) -> Vec<ResponseItem> {
        (0..self.config.responses_per_query)
            .map(|_| {
                let template = TEMPLATES[fastrand::usize(..TEMPLATES.len())];
                let content = template
                    .replace("{backend}", &self.name)
                    .replace("{prompt}", prompt.trim());
                ResponseItem::new(content, self.confidence())
            })
            .collect()
    }
}

#[async_trait]
impl Backend for SimulatedBackend {
    async fn complete(&self, prompt: &str) -> Result<Vec<ResponseItem>, CallError> {
        tokio::time::sleep(self.latency()).await;

        if fastrand::f64() < self.config.failure_rate {
            tracing::debug!(backend = %self.name, "Simulated backend failure");
            return Err(CallError::new(format!(
                "{} is temporarily unavailable",
                self.name
            )));
        }

        Ok(self.fabricate(prompt))
    }
}
