//! Storage pool setup.
//!
//! # Responsibilities
//! - Parse the storage URL into connect options
//! - Apply pool sizing and TLS policy
//! - Ping through the circuit breaker before handing the pool out
//!
//! # Design Decisions
//! - A malformed URL is reported apart from an unreachable server
//! - A pool that fails its first ping is closed, never returned
//! - TLS uses rustls, which negotiates TLS 1.2 or newer only, and verifies
//!   the server certificate chain and host name

use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use sqlx::Connection;
use thiserror::Error;
use url::Url;

use crate::config::StorageConfig;
use crate::resilience::{BreakerError, CircuitBreaker};

/// Errors from storage pool setup.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The URL could not be parsed into connect options.
    #[error("parse storage url: {0}")]
    InvalidUrl(#[source] sqlx::Error),

    /// The health check ping failed or was short-circuited.
    #[error("storage health check failed: {0}")]
    Unreachable(#[source] BreakerError<sqlx::Error>),
}

/// Build the pool and confirm it answers a ping.
pub async fn connect_pool(
    config: &StorageConfig,
    breaker: &CircuitBreaker,
) -> Result<PgPool, StorageError> {
    let options = connect_options(config)?;

    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.connect_timeout)
        .connect_lazy_with(options);

    if let Err(e) = breaker.call(|| ping(&pool)).await {
        pool.close().await;
        return Err(StorageError::Unreachable(e));
    }

    tracing::info!(
        url = %redact(&config.url),
        min_connections = config.min_connections,
        max_connections = config.max_connections,
        tls = config.tls,
        "Connected to postgres"
    );
    Ok(pool)
}

/// Connect options from config, without touching the network.
pub fn connect_options(config: &StorageConfig) -> Result<PgConnectOptions, StorageError> {
    let options = PgConnectOptions::from_str(&config.url).map_err(StorageError::InvalidUrl)?;
    Ok(if config.tls {
        options.ssl_mode(PgSslMode::VerifyFull)
    } else {
        options
    })
}

async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    conn.ping().await
}

/// The URL with any password masked, for logs.
pub fn redact(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => "<unparseable>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::BreakerSettings;
    use std::time::Duration;

    fn storage(url: &str) -> StorageConfig {
        StorageConfig {
            url: url.to_string(),
            max_connections: 2,
            min_connections: 0,
            tls: false,
            connect_timeout: Duration::from_millis(300),
        }
    }

    #[test]
    fn test_redact_masks_password() {
        assert_eq!(
            redact("postgres://app:secret@db:5432/users"),
            "postgres://app:***@db:5432/users"
        );
        assert_eq!(redact("postgres://db/users"), "postgres://db/users");
        assert_eq!(redact("::::"), "<unparseable>");
    }

    #[test]
    fn test_tls_verifies_server_certificate() {
        let mut config = storage("postgres://app@localhost/users");
        config.tls = true;
        let options = connect_options(&config).unwrap();
        assert!(matches!(options.get_ssl_mode(), PgSslMode::VerifyFull));
    }

    #[tokio::test]
    async fn test_malformed_url_is_invalid_url() {
        let breaker = CircuitBreaker::new("test_ping", BreakerSettings::default());
        let err = connect_pool(&storage("definitely not a url"), &breaker).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidUrl(_)));
        assert_eq!(breaker.counts().requests, 0);
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_ping() {
        let breaker = CircuitBreaker::new("test_ping", BreakerSettings::default());
        let err = connect_pool(&storage("postgres://app@127.0.0.1:1/users"), &breaker)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Unreachable(BreakerError::Inner(_))));
        assert_eq!(breaker.counts().total_failures, 1);
    }
}
