//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use model_fanout::backend::{Backend, CallError};
use model_fanout::limiter::RateProfile;
use model_fanout::orchestrator::{Orchestrator, QuerySettings, ResponseItem};

/// A backend with scripted behaviour.
pub struct ScriptedBackend {
    name: String,
    /// Calls that fail before the first success; `u32::MAX` never succeeds.
    failures_before_success: u32,
    items: usize,
    latency: Duration,
    calls: AtomicU32,
}

impl ScriptedBackend {
    pub fn succeeding(name: &str, items: usize) -> Arc<Self> {
        Arc::new(Self::new(name, 0, items, Duration::ZERO))
    }

    pub fn failing(name: &str) -> Arc<Self> {
        Arc::new(Self::new(name, u32::MAX, 0, Duration::ZERO))
    }

    pub fn flaky(name: &str, failures: u32, items: usize) -> Arc<Self> {
        Arc::new(Self::new(name, failures, items, Duration::ZERO))
    }

    pub fn slow(name: &str, latency: Duration) -> Arc<Self> {
        Arc::new(Self::new(name, 0, 1, latency))
    }

    fn new(name: &str, failures_before_success: u32, items: usize, latency: Duration) -> Self {
        Self {
            name: name.to_string(),
            failures_before_success,
            items,
            latency,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn complete(&self, prompt: &str) -> Result<Vec<ResponseItem>, CallError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if call < self.failures_before_success {
            return Err(CallError::new(format!("{} refused call {}", self.name, call + 1)));
        }

        Ok((0..self.items)
            .map(|i| {
                ResponseItem::new(
                    format!("{} answer {} to {}", self.name, i + 1, prompt),
                    0.5 + 0.1 * i as f64,
                )
            })
            .collect())
    }
}

/// A profile loose enough that admission never waits in tests.
pub fn roomy_profile() -> RateProfile {
    RateProfile::new(100.0, 100.0)
}

/// Orchestrator over `backends`, each with a roomy rate profile.
pub fn orchestrator(backends: &[(&str, Arc<ScriptedBackend>)]) -> Orchestrator {
    orchestrator_with(QuerySettings::default(), backends)
}

pub fn orchestrator_with(
    settings: QuerySettings,
    backends: &[(&str, Arc<ScriptedBackend>)],
) -> Orchestrator {
    let mut builder = Orchestrator::builder(settings);
    for (name, backend) in backends {
        let client: Arc<dyn Backend> = backend.clone();
        builder = builder
            .backend(*name, roomy_profile(), client)
            .expect("valid backend");
    }
    builder.build()
}
