//! Optional pub/sub publishing over NATS.
//!
//! # Responsibilities
//! - Connect at startup when enabled, with reconnect policy from config
//! - Publish by subject, safe under concurrent use from handlers
//! - Flush outstanding messages at shutdown
//!
//! # Design Decisions
//! - Disabled messaging is a value (`Messaging::Absent`), not a missing handle
//! - Publishing while absent is a no-op that reports `Skipped`
//! - Reconnects are the client's job; this module never retries

use std::time::Duration;

use thiserror::Error;

use crate::config::MessagingConfig;
use crate::observability::metrics;

/// Errors from the messaging connection.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// Enabled without a server URL.
    #[error("MESSAGING_URL not set while messaging is enabled")]
    MissingUrl,

    #[error("failed to connect to NATS: {0}")]
    Connect(#[from] async_nats::ConnectError),

    #[error("failed to publish to '{subject}': {source}")]
    Publish {
        subject: String,
        #[source]
        source: async_nats::PublishError,
    },

    #[error("failed to flush NATS connection: {0}")]
    Flush(#[from] async_nats::client::FlushError),
}

/// What a publish call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Handed to the client.
    Sent,
    /// Messaging is disabled; nothing was sent.
    Skipped,
}

/// A connected NATS client.
#[derive(Clone)]
pub struct NatsPublisher {
    client: async_nats::Client,
}

impl NatsPublisher {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), MessagingError> {
        self.client
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|source| MessagingError::Publish {
                subject: subject.to_string(),
                source,
            })
    }
}

/// The messaging dependency: either absent (disabled) or connected.
#[derive(Clone)]
pub enum Messaging {
    Absent,
    Connected(NatsPublisher),
}

impl Messaging {
    /// Connect according to config. Disabled config yields `Absent`.
    pub async fn connect(config: &MessagingConfig) -> Result<Self, MessagingError> {
        if !config.enabled {
            tracing::info!("Messaging disabled");
            return Ok(Messaging::Absent);
        }

        let url = config
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(MessagingError::MissingUrl)?;

        let reconnect_wait = config.reconnect_wait;
        let client = async_nats::ConnectOptions::new()
            .name(&config.name)
            .max_reconnects(config.max_reconnects)
            .reconnect_delay_callback(move |_attempts| reconnect_wait)
            .subscription_capacity(config.max_pending)
            .connection_timeout(Duration::from_secs(5))
            .connect(url)
            .await?;

        tracing::info!(url = %url, name = %config.name, "Connected to NATS");
        Ok(Messaging::Connected(NatsPublisher { client }))
    }

    /// True when a connection is held.
    pub fn is_connected(&self) -> bool {
        matches!(self, Messaging::Connected(_))
    }

    /// Publish `payload` on `subject`.
    pub async fn publish(
        &self,
        subject: &str,
        payload: Vec<u8>,
    ) -> Result<PublishOutcome, MessagingError> {
        match self {
            Messaging::Absent => {
                tracing::debug!(subject, "Messaging disabled, publish skipped");
                metrics::record_publish(subject, "skipped");
                Ok(PublishOutcome::Skipped)
            }
            Messaging::Connected(publisher) => match publisher.publish(subject, payload).await {
                Ok(()) => {
                    metrics::record_publish(subject, "sent");
                    Ok(PublishOutcome::Sent)
                }
                Err(e) => {
                    metrics::record_publish(subject, "failed");
                    Err(e)
                }
            },
        }
    }

    /// Flush buffered messages and release the connection.
    pub async fn close(self) -> Result<(), MessagingError> {
        match self {
            Messaging::Absent => Ok(()),
            Messaging::Connected(publisher) => {
                publisher.client.flush().await?;
                tracing::info!("NATS connection flushed and closed");
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for Messaging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Messaging::Absent => f.write_str("Absent"),
            Messaging::Connected(_) => f.write_str("Connected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(url: Option<&str>) -> MessagingConfig {
        MessagingConfig {
            enabled: true,
            url: url.map(str::to_string),
            ..MessagingConfig::disabled()
        }
    }

    #[tokio::test]
    async fn test_disabled_is_absent() {
        let messaging = Messaging::connect(&MessagingConfig::disabled()).await.unwrap();
        assert!(!messaging.is_connected());
    }

    #[tokio::test]
    async fn test_absent_publish_and_close_are_noops() {
        let messaging = Messaging::Absent;
        let outcome = messaging.publish("users.created", b"{}".to_vec()).await.unwrap();
        assert_eq!(outcome, PublishOutcome::Skipped);
        messaging.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_enabled_without_url_fails() {
        let err = Messaging::connect(&enabled(None)).await.unwrap_err();
        assert!(matches!(err, MessagingError::MissingUrl));

        let err = Messaging::connect(&enabled(Some("  "))).await.unwrap_err();
        assert!(matches!(err, MessagingError::MissingUrl));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connect_error() {
        // Nothing listens on port 1.
        let err = Messaging::connect(&enabled(Some("nats://127.0.0.1:1"))).await.unwrap_err();
        assert!(matches!(err, MessagingError::Connect(_)));
    }
}
