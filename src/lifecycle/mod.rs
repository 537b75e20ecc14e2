//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → storage ∥ messaging → Dependencies
//!
//! Serve (this module):
//!     Build service → bind listener → server task ∥ wait for signal
//!
//! Shutdown (shutdown.rs):
//!     Signal received → stop accepting → drain within grace → release
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - No port is bound until every dependency is ready
//! - Dependencies are released only after the listener has fully stopped
//!   and every connection is closed (drained or force-closed)
//! - Shutdown has one deadline; work still running after it is abandoned

pub mod shutdown;
pub mod signals;
pub mod startup;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ServiceConfig;
use crate::domain::UserService;
use crate::http::{AppState, HttpServer};
use crate::net::{self, ListenerError};
use crate::observability::metrics;
use crate::storage::PgUserRepository;

pub use shutdown::{drain, DrainOutcome, Shutdown};
pub use signals::Termination;
pub use startup::{init_dependencies, Dependencies, DependencyFailure, StartupError};

/// Fatal service errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Run the service until a termination signal, then shut down in order.
pub async fn run(config: ServiceConfig) -> Result<(), LifecycleError> {
    tracing::info!(
        bind_address = %config.bind_address,
        messaging_enabled = config.messaging.enabled,
        enable_grpc = config.features.grpc,
        enable_cache = config.features.cache,
        shutdown_timeout = ?config.shutdown_timeout,
        "Configuration loaded"
    );

    let handle = metrics::init_metrics();
    let deps = init_dependencies(&config).await?;

    let repo = Arc::new(PgUserRepository::new(deps.pool.clone()));
    let users = UserService::new(repo, deps.messaging.clone());
    let server = HttpServer::new(AppState::new(users, handle), config.request_timeout);

    let listener = match net::bind(&config.bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            deps.close().await;
            return Err(e.into());
        }
    };

    let served = serve_then_release(
        server,
        listener,
        signals::termination(),
        config.shutdown_timeout,
        move || deps.close(),
    )
    .await;

    served?;
    tracing::info!("Server exited");
    Ok(())
}

/// Serve on `listener` until `signal` resolves, then drain within `grace`.
///
/// Returns an error if the server stops on its own before the signal.
pub async fn serve_until<S>(
    server: HttpServer,
    listener: TcpListener,
    signal: S,
    grace: Duration,
) -> Result<DrainOutcome, ListenerError>
where
    S: Future,
{
    let shutdown = Shutdown::new();
    let connections = server.handle();
    let mut task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        joined = &mut task => {
            let err = match joined {
                Ok(Ok(())) => ListenerError::Stopped,
                Ok(Err(e)) => ListenerError::Serve(e),
                Err(e) => ListenerError::Task(e),
            };
            tracing::error!(error = %err, "HTTP server exited before shutdown was requested");
            return Err(err);
        }
        _ = signal => {}
    }

    tracing::info!(grace = ?grace, "Shutting down server");
    shutdown.trigger();
    Ok(drain(task, &connections, grace).await)
}

/// [`serve_until`], then `release`. Release starts only once the listener
/// is closed and no connection is left open, whichever way serving ended.
pub async fn serve_then_release<S, R, F>(
    server: HttpServer,
    listener: TcpListener,
    signal: S,
    grace: Duration,
    release: R,
) -> Result<DrainOutcome, ListenerError>
where
    S: Future,
    R: FnOnce() -> F,
    F: Future<Output = ()>,
{
    let served = serve_until(server, listener, signal, grace).await;
    release().await;
    served
}
