//! Fan-out and merge across every configured backend.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::time::Instant;

use crate::backend::{Backend, SimulatedBackend};
use crate::config::{FanoutConfig, QueryConfig};
use crate::limiter::{RateLimiter, RateProfile};
use crate::observability::metrics;
use crate::orchestrator::progress::ProgressObserver;
use crate::orchestrator::types::{
    ApiResponse, OrchestratorError, QueryError, ResponseItem, StatusEvent,
};
use crate::resilience::{retry_with_backoff, RetryPolicy};

/// Admission and retry settings applied to every backend query.
#[derive(Debug, Clone, Copy)]
pub struct QuerySettings {
    /// Longest a query waits for a rate-limit token.
    pub admission_timeout: Duration,
    /// Retry policy for the backend call itself.
    pub retry: RetryPolicy,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            admission_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl From<&QueryConfig> for QuerySettings {
    fn from(config: &QueryConfig) -> Self {
        Self {
            admission_timeout: config.admission_timeout(),
            retry: config.retry_policy(),
        }
    }
}

/// A backend together with the limiter that owns its bucket.
struct BackendSlot {
    name: String,
    client: Arc<dyn Backend>,
    limiter: RateLimiter,
}

/// Builder for [`Orchestrator`]. Backends are queried in registration order.
pub struct OrchestratorBuilder {
    settings: QuerySettings,
    slots: Vec<BackendSlot>,
}

impl OrchestratorBuilder {
    /// Register a backend with its own rate limiter.
    pub fn backend(
        mut self,
        name: impl Into<String>,
        profile: RateProfile,
        client: Arc<dyn Backend>,
    ) -> Result<Self, OrchestratorError> {
        let name = name.into();
        if self.slots.iter().any(|slot| slot.name == name) {
            return Err(OrchestratorError::DuplicateBackend(name));
        }

        let limiter = RateLimiter::from_profile(&profile).map_err(|source| {
            OrchestratorError::InvalidProfile {
                backend: name.clone(),
                source,
            }
        })?;

        self.slots.push(BackendSlot {
            name,
            client,
            limiter,
        });
        Ok(self)
    }

    pub fn build(self) -> Orchestrator {
        Orchestrator {
            slots: self.slots,
            settings: self.settings,
        }
    }
}

/// Queries every backend concurrently and merges what comes back.
pub struct Orchestrator {
    slots: Vec<BackendSlot>,
    settings: QuerySettings,
}

impl Orchestrator {
    pub fn builder(settings: QuerySettings) -> OrchestratorBuilder {
        OrchestratorBuilder {
            settings,
            slots: Vec::new(),
        }
    }

    /// Build an orchestrator over simulated backends described by `config`.
    pub fn from_config(config: &FanoutConfig) -> Result<Self, OrchestratorError> {
        let mut builder = Self::builder(QuerySettings::from(&config.query));
        for backend in &config.backends {
            let client = Arc::new(SimulatedBackend::new(
                backend.name.clone(),
                backend.simulation.clone(),
            ));
            builder = builder.backend(backend.name.clone(), backend.rate_profile(), client)?;
        }

        let orchestrator = builder.build();
        tracing::info!(
            backends = ?orchestrator.backend_names().collect::<Vec<_>>(),
            admission_timeout = ?orchestrator.settings.admission_timeout,
            max_attempts = orchestrator.settings.retry.max_attempts,
            "Orchestrator ready"
        );
        Ok(orchestrator)
    }

    /// Backend names in declaration order.
    pub fn backend_names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|slot| slot.name.as_str())
    }

    /// The limiter guarding `backend`, if it is configured.
    pub fn limiter(&self, backend: &str) -> Option<&RateLimiter> {
        self.slot(backend).map(|slot| &slot.limiter)
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    /// An `idle` event per backend, for seeding a status display.
    pub fn statuses(&self) -> Vec<StatusEvent> {
        self.backend_names().map(StatusEvent::idle).collect()
    }

    /// Query one backend with the configured number of attempts.
    pub async fn query_backend(
        &self,
        backend: &str,
        prompt: &str,
    ) -> Result<ApiResponse, QueryError> {
        self.query_backend_with_attempts(backend, prompt, self.settings.retry.max_attempts)
            .await
    }

    /// Query one backend: wait for a token, then call it with retries.
    ///
    /// Admission is not retried. Returned items are tagged with `backend`.
    pub async fn query_backend_with_attempts(
        &self,
        backend: &str,
        prompt: &str,
        max_attempts: u32,
    ) -> Result<ApiResponse, QueryError> {
        let slot = self
            .slot(backend)
            .ok_or_else(|| QueryError::NoLimiterConfigured(backend.to_string()))?;

        metrics::record_limiter_queue(&slot.name, slot.limiter.queued());
        if let Err(source) = slot
            .limiter
            .acquire(Some(self.settings.admission_timeout))
            .await
        {
            tracing::warn!(backend = %slot.name, error = %source, "Admission failed");
            metrics::record_admission_failure(&slot.name, &source);
            return Err(QueryError::Admission {
                backend: slot.name.clone(),
                source,
            });
        }

        let policy = self.settings.retry.with_max_attempts(max_attempts);
        let items = retry_with_backoff(
            &policy,
            |attempt| {
                tracing::debug!(backend = %slot.name, attempt, "Calling backend");
                slot.client.complete(prompt)
            },
            |attempt, error, delay| {
                tracing::info!(
                    backend = %slot.name,
                    attempt,
                    error = %error,
                    delay = ?delay,
                    "Retrying backend call"
                );
                metrics::record_retry(&slot.name);
            },
        )
        .await
        .map_err(|exhausted| QueryError::Backend {
            backend: slot.name.clone(),
            attempts: exhausted.attempts,
            source: exhausted.last_error,
        })?;

        let data = items
            .into_iter()
            .map(|item| item.tagged_by(&slot.name))
            .collect();
        Ok(ApiResponse::new(&slot.name, data))
    }

    /// Query every backend concurrently and wait for all of them to settle.
    ///
    /// Each backend reports `pending`, then `success` or `error`, to
    /// `observer`. Failed backends contribute nothing; if every backend fails
    /// the result is empty. Items keep backend declaration order.
    pub async fn query_all(
        &self,
        prompt: &str,
        observer: Option<&dyn ProgressObserver>,
    ) -> Vec<ResponseItem> {
        let emit = |event: StatusEvent| {
            if let Some(observer) = observer {
                observer.on_status(event);
            }
        };

        let emit = &emit;
        let started = Instant::now();
        let queries = self.slots.iter().map(move |slot| async move {
            let name = slot.name.as_str();
            emit(StatusEvent::pending(name));

            let start = Instant::now();
            let outcome = self.query_backend(name, prompt).await;
            let latency = start.elapsed();

            match outcome {
                Ok(response) => {
                    metrics::record_backend_query(name, "success", latency);
                    emit(StatusEvent::success(name, latency.as_millis() as u64));
                    Ok(response.data)
                }
                Err(error) => {
                    tracing::warn!(backend = %name, error = %error, "Backend query failed");
                    metrics::record_backend_query(name, "error", latency);
                    emit(StatusEvent::error(name, error.to_string()));
                    Err(error)
                }
            }
        });

        let outcomes = join_all(queries).await;

        let mut items = Vec::new();
        let mut succeeded = 0;
        for data in outcomes.into_iter().flatten() {
            succeeded += 1;
            items.extend(data);
        }

        metrics::record_fanout(self.slots.len(), succeeded);
        if succeeded == 0 && !self.slots.is_empty() {
            tracing::warn!(backends = self.slots.len(), "Every backend failed");
        }
        tracing::info!(
            backends = self.slots.len(),
            succeeded,
            items = items.len(),
            elapsed = ?started.elapsed(),
            "Fan-out settled"
        );

        items
    }

    /// Shut every limiter down, failing anyone still waiting for a token.
    pub fn shutdown(&self) {
        for slot in &self.slots {
            slot.limiter.shutdown();
        }
        tracing::info!("Orchestrator shut down");
    }

    fn slot(&self, backend: &str) -> Option<&BackendSlot> {
        self.slots.iter().find(|slot| slot.name == backend)
    }
}
