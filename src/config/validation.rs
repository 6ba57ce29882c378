//! Configuration validation.
//!
//! Serde handles syntax; this checks value ranges and backend uniqueness.
//! Every problem found is returned, not just the first.

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{BackendConfig, FanoutConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("no backends configured")]
    NoBackends,

    #[error("backend name must not be empty")]
    EmptyBackendName,

    #[error("backend '{0}' is defined more than once")]
    DuplicateBackend(String),

    #[error("backend '{backend}': {field} must be positive, got {value}")]
    NotPositive {
        backend: String,
        field: &'static str,
        value: f64,
    },

    #[error("backend '{backend}': bucket_capacity {value} cannot hold a whole token")]
    CapacityBelowOneToken { backend: String, value: f64 },

    #[error("backend '{backend}': failure_rate must be within 0..=1, got {value}")]
    FailureRate { backend: String, value: f64 },

    #[error("backend '{backend}': confidence range {min}..={max} is not within 0..=1")]
    ConfidenceRange { backend: String, min: f64, max: f64 },

    #[error("backend '{backend}': latency_min_ms {min} exceeds latency_max_ms {max}")]
    LatencyRange { backend: String, min: u64, max: u64 },

    #[error("query.{0} must be greater than zero")]
    ZeroQuerySetting(&'static str),

    #[error("{field} is not a valid socket address: {value}")]
    Address { field: &'static str, value: String },
}

/// Check a parsed configuration.
pub fn validate_config(config: &FanoutConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    let mut seen = HashSet::new();
    for backend in &config.backends {
        if !seen.insert(backend.name.as_str()) {
            errors.push(ValidationError::DuplicateBackend(backend.name.clone()));
        }
        validate_backend(backend, &mut errors);
    }

    if config.query.admission_timeout_secs == 0 {
        errors.push(ValidationError::ZeroQuerySetting("admission_timeout_secs"));
    }
    if config.query.max_attempts == 0 {
        errors.push(ValidationError::ZeroQuerySetting("max_attempts"));
    }

    check_address("server.bind_address", &config.server.bind_address, &mut errors);
    if config.observability.metrics_enabled {
        check_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_backend(backend: &BackendConfig, errors: &mut Vec<ValidationError>) {
    if backend.name.trim().is_empty() {
        errors.push(ValidationError::EmptyBackendName);
    }

    for (field, value) in [
        ("refill_rate_per_sec", backend.refill_rate_per_sec),
        ("bucket_capacity", backend.bucket_capacity),
    ] {
        if !value.is_finite() || value <= 0.0 {
            errors.push(ValidationError::NotPositive {
                backend: backend.name.clone(),
                field,
                value,
            });
        }
    }
    if backend.bucket_capacity > 0.0 && backend.bucket_capacity < 1.0 {
        errors.push(ValidationError::CapacityBelowOneToken {
            backend: backend.name.clone(),
            value: backend.bucket_capacity,
        });
    }

    let sim = &backend.simulation;
    if !(0.0..=1.0).contains(&sim.failure_rate) {
        errors.push(ValidationError::FailureRate {
            backend: backend.name.clone(),
            value: sim.failure_rate,
        });
    }
    let unit = 0.0..=1.0;
    if !unit.contains(&sim.min_confidence)
        || !unit.contains(&sim.max_confidence)
        || sim.min_confidence > sim.max_confidence
    {
        errors.push(ValidationError::ConfidenceRange {
            backend: backend.name.clone(),
            min: sim.min_confidence,
            max: sim.max_confidence,
        });
    }
    if sim.latency_min_ms > sim.latency_max_ms {
        errors.push(ValidationError::LatencyRange {
            backend: backend.name.clone(),
            min: sim.latency_min_ms,
            max: sim.latency_max_ms,
        });
    }
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Address {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&FanoutConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = FanoutConfig::default();
        config.backends.push(BackendConfig::new("openai", 1.0, 1.0));
        config.backends[1].simulation.failure_rate = 1.5;
        config.query.max_attempts = 0;
        config.server.bind_address = "not an address".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateBackend("openai".into())));
        assert!(errors.contains(&ValidationError::ZeroQuerySetting("max_attempts")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::FailureRate { backend, .. } if backend == "anthropic")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::Address { field: "server.bind_address", .. })));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_fractional_capacity_is_rejected() {
        let mut config = FanoutConfig::default();
        config.backends[2].bucket_capacity = 0.5;

        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::CapacityBelowOneToken {
                backend: "gemini".into(),
                value: 0.5,
            }])
        );

        config.backends[2].bucket_capacity = 1.0;
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_non_positive_capacity_reports_once() {
        let mut config = FanoutConfig::default();
        config.backends[0].bucket_capacity = 0.0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::NotPositive {
                backend: "openai".into(),
                field: "bucket_capacity",
                value: 0.0,
            }]
        );
    }

    #[test]
    fn test_no_backends() {
        let config = FanoutConfig {
            backends: Vec::new(),
            ..FanoutConfig::default()
        };
        assert_eq!(validate_config(&config), Err(vec![ValidationError::NoBackends]));
    }
}
