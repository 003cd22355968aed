//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds > 0, ports valid)
//! - Detect duplicate service names and instance ids
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ResilienceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ResilienceConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be at least 1")]
    ZeroValue { field: String },

    #[error("service name must not be empty")]
    EmptyServiceName,

    #[error("service '{0}' is defined more than once")]
    DuplicateService(String),

    #[error("service '{service}' has an instance with an empty host")]
    EmptyHost { service: String },

    #[error("service '{service}' instance '{id}' has port 0")]
    InvalidPort { service: String, id: String },

    #[error("service '{service}' lists instance '{id}' more than once")]
    DuplicateInstance { service: String, id: String },

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: String, value: String },

    #[error("unknown log format '{0}' (expected 'pretty' or 'json')")]
    UnknownLogFormat(String),
}

/// Validate a parsed configuration, collecting every error found.
pub fn validate_config(config: &ResilienceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let cb = &config.circuit_breaker;
    check_positive(&mut errors, "circuit_breaker.failure_threshold", Some(cb.failure_threshold));
    check_positive(&mut errors, "circuit_breaker.test_requests", Some(cb.test_requests));

    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }
    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::UnknownLogFormat(
            config.observability.log_format.clone(),
        ));
    }

    let mut names = HashSet::new();
    for service in &config.services {
        if service.name.trim().is_empty() {
            errors.push(ValidationError::EmptyServiceName);
            continue;
        }
        if !names.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }

        check_positive(
            &mut errors,
            &format!("services.{}.failure_threshold", service.name),
            service.failure_threshold,
        );
        check_positive(
            &mut errors,
            &format!("services.{}.test_requests", service.name),
            service.test_requests,
        );

        let mut ids = HashSet::new();
        for instance in &service.instances {
            let id = instance
                .id
                .clone()
                .unwrap_or_else(|| format!("{}:{}", instance.host, instance.port));

            if instance.host.trim().is_empty() {
                errors.push(ValidationError::EmptyHost {
                    service: service.name.clone(),
                });
            }
            if instance.port == 0 {
                errors.push(ValidationError::InvalidPort {
                    service: service.name.clone(),
                    id: id.clone(),
                });
            }
            if !ids.insert(id.clone()) {
                errors.push(ValidationError::DuplicateInstance {
                    service: service.name.clone(),
                    id,
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_positive(errors: &mut Vec<ValidationError>, field: &str, value: Option<u32>) {
    if value == Some(0) {
        errors.push(ValidationError::ZeroValue {
            field: field.to_string(),
        });
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}
