//! Startup orchestration.
//!
//! # Responsibilities
//! - Bring up the storage pool and the messaging connection concurrently
//! - Report every dependency that failed, not just one
//! - Release whatever did come up when the other side failed
//!
//! # Design Decisions
//! - Fail fast: any dependency failure is fatal, before a port is bound
//! - Both initializations always run to completion (join, no cancellation),
//!   so the operator sees every broken dependency in one attempt
//! - Messaging disabled is success with `Messaging::Absent`

use sqlx::PgPool;
use thiserror::Error;

use crate::config::ServiceConfig;
use crate::messaging::{Messaging, MessagingError};
use crate::observability::metrics;
use crate::resilience::CircuitBreaker;
use crate::storage::{self, StorageError};

/// Name of the breaker guarding the startup ping.
pub const STORAGE_PING_BREAKER: &str = "postgres_ping";

/// A dependency that failed to initialize.
#[derive(Debug, Error)]
pub enum DependencyFailure {
    #[error("postgres init: {0}")]
    Storage(#[from] StorageError),

    #[error("nats init: {0}")]
    Messaging(#[from] MessagingError),
}

/// Errors raised before the service can serve.
#[derive(Debug, Error)]
pub enum StartupError {
    /// One or more dependencies failed; all are listed.
    #[error("failed to initialise infrastructure: {}", join_failures(.0))]
    Dependencies(Vec<DependencyFailure>),
}

fn join_failures(failures: &[DependencyFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Process-lifetime dependency handles.
#[derive(Debug)]
pub struct Dependencies {
    pub pool: PgPool,
    pub messaging: Messaging,
}

impl Dependencies {
    /// Release the pool, then the messaging connection. Consumes the
    /// handles so this happens once.
    pub async fn close(self) {
        self.pool.close().await;
        metrics::record_dependency_up("storage", false);
        tracing::info!("Storage pool closed");

        if self.messaging.is_connected() {
            if let Err(e) = self.messaging.close().await {
                tracing::warn!(error = %e, "Failed to close messaging connection cleanly");
            }
            metrics::record_dependency_up("messaging", false);
        }
    }
}

/// Initialize storage and messaging concurrently.
pub async fn init_dependencies(config: &ServiceConfig) -> Result<Dependencies, StartupError> {
    let breaker = CircuitBreaker::new(STORAGE_PING_BREAKER, config.breaker_settings());

    let (storage, messaging) = tokio::join!(
        storage::connect_pool(&config.storage, &breaker),
        Messaging::connect(&config.messaging),
    );

    assemble(storage, messaging).await
}

/// Combine both initialization results into handles or a full failure list.
pub async fn assemble(
    storage: Result<PgPool, StorageError>,
    messaging: Result<Messaging, MessagingError>,
) -> Result<Dependencies, StartupError> {
    match (storage, messaging) {
        (Ok(pool), Ok(messaging)) => {
            metrics::record_dependency_up("storage", true);
            if messaging.is_connected() {
                metrics::record_dependency_up("messaging", true);
            }
            Ok(Dependencies { pool, messaging })
        }
        (storage, messaging) => {
            let mut failures = Vec::new();

            match storage {
                Ok(pool) => pool.close().await,
                Err(e) => failures.push(DependencyFailure::from(e)),
            }
            match messaging {
                Ok(messaging) => {
                    if let Err(e) = messaging.close().await {
                        tracing::warn!(error = %e, "Failed to close messaging after startup failure");
                    }
                }
                Err(e) => failures.push(DependencyFailure::from(e)),
            }

            for failure in &failures {
                tracing::error!(error = %failure, "Dependency failed to initialise");
            }
            Err(StartupError::Dependencies(failures))
        }
    }
}
