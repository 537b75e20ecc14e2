//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (clap handles syntactic)
//! - Check cross-field invariants (messaging URL, pool bounds)
//! - Validate value ranges (timeouts > 0, bind address parses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before any dependency is contacted

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("STORAGE_URL must not be empty")]
    MissingStorageUrl,

    #[error("MESSAGING_URL not set while MESSAGING_ENABLED=true")]
    MissingMessagingUrl,

    #[error("STORAGE_MAX_CONNS must be at least 1")]
    ZeroMaxConnections,

    #[error("STORAGE_MIN_CONNS ({min}) exceeds STORAGE_MAX_CONNS ({max})")]
    PoolBounds { min: u32, max: u32 },

    #[error("BREAKER_FAILURE_THRESHOLD must be at least 1")]
    ZeroBreakerThreshold,

    #[error("BREAKER_HALF_OPEN_MAX_CALLS must be at least 1")]
    ZeroHalfOpenCalls,

    #[error("SHUTDOWN_TIMEOUT must be greater than zero")]
    ZeroShutdownTimeout,

    #[error("invalid BIND_ADDRESS '{0}'")]
    InvalidBindAddress(String),
}

/// Check every semantic rule and collect the failures.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.storage.url.trim().is_empty() {
        errors.push(ValidationError::MissingStorageUrl);
    }

    let messaging_url_missing = config
        .messaging
        .url
        .as_deref()
        .map_or(true, |url| url.trim().is_empty());
    if config.messaging.enabled && messaging_url_missing {
        errors.push(ValidationError::MissingMessagingUrl);
    }

    if config.storage.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    } else if config.storage.min_connections > config.storage.max_connections {
        errors.push(ValidationError::PoolBounds {
            min: config.storage.min_connections,
            max: config.storage.max_connections,
        });
    }

    if config.breaker.failure_threshold == 0 {
        errors.push(ValidationError::ZeroBreakerThreshold);
    }
    if config.breaker.half_open_max_calls == 0 {
        errors.push(ValidationError::ZeroHalfOpenCalls);
    }

    if config.shutdown_timeout.is_zero() {
        errors.push(ValidationError::ZeroShutdownTimeout);
    }

    if config.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(config.bind_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
