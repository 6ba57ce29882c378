//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::limiter::RateProfile;
use crate::resilience::RetryPolicy;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FanoutConfig {
    /// HTTP surface settings.
    pub server: ServerConfig,

    /// Admission and retry settings shared by every backend query.
    pub query: QueryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Backends queried by every fan-out, in declaration order.
    pub backends: Vec<BackendConfig>,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            query: QueryConfig::default(),
            observability: ObservabilityConfig::default(),
            backends: default_backends(),
        }
    }
}

fn default_backends() -> Vec<BackendConfig> {
    vec![
        BackendConfig::new("openai", 3.0, 5.0),
        BackendConfig::new("anthropic", 2.0, 4.0),
        BackendConfig::new("gemini", 5.0, 10.0),
    ]
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 90,
        }
    }
}

/// Per-query admission and retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    /// How long a query may wait for a rate-limit token, in seconds.
    pub admission_timeout_secs: u64,

    /// Attempts per backend call, including the first.
    pub max_attempts: u32,

    /// Delay after the first failed attempt in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum exponential delay in milliseconds.
    pub max_delay_ms: u64,

    /// Upper bound of the random jitter added to each delay, in milliseconds.
    pub jitter_ms: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            admission_timeout_secs: 30,
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
            jitter_ms: 200,
        }
    }
}

impl QueryConfig {
    pub fn admission_timeout(&self) -> Duration {
        Duration::from_secs(self.admission_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay_ms: self.base_delay_ms,
            max_delay_ms: self.max_delay_ms,
            jitter_ms: self.jitter_ms,
        }
    }
}

/// Backend definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Unique backend identifier.
    pub name: String,

    /// Tokens added to the bucket per second.
    pub refill_rate_per_sec: f64,

    /// Bucket capacity (burst size).
    pub bucket_capacity: f64,

    /// Start with a full bucket (default: true).
    #[serde(default = "default_start_full")]
    pub start_full: bool,

    /// Behaviour of the simulated backend.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

fn default_start_full() -> bool {
    true
}

impl BackendConfig {
    pub fn new(name: &str, refill_rate_per_sec: f64, bucket_capacity: f64) -> Self {
        Self {
            name: name.to_string(),
            refill_rate_per_sec,
            bucket_capacity,
            start_full: true,
            simulation: SimulationConfig::default(),
        }
    }

    pub fn rate_profile(&self) -> RateProfile {
        RateProfile {
            refill_rate_per_sec: self.refill_rate_per_sec,
            capacity: self.bucket_capacity,
            start_full: self.start_full,
        }
    }
}

/// Simulated backend behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Minimum simulated call latency in milliseconds.
    pub latency_min_ms: u64,

    /// Maximum simulated call latency in milliseconds.
    pub latency_max_ms: u64,

    /// Probability (0..=1) that a call fails.
    pub failure_rate: f64,

    /// Items fabricated per successful call.
    pub responses_per_query: usize,

    /// Lowest fabricated confidence.
    pub min_confidence: f64,

    /// Highest fabricated confidence.
    pub max_confidence: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            latency_min_ms: 300,
            latency_max_ms: 1500,
            failure_rate: 0.1,
            responses_per_query: 2,
            min_confidence: 0.55,
            max_confidence: 0.98,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
