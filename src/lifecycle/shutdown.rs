//! Shutdown coordination.
//!
//! # Responsibilities
//! - Broadcast the shutdown request to long-running tasks
//! - Bound the wait for the HTTP server to drain
//!
//! # Design Decisions
//! - One deadline covers the whole drain, not each request
//! - When the deadline passes, every open connection is force-closed, which
//!   drops its in-flight handler; the deadline is never extended
//! - `drain` returns only once no connection is left open, so nothing still
//!   holds a dependency when the caller releases it

use std::time::Duration;

use axum_server::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Upper bound on waiting for force-closed connections to unwind.
const FORCE_CLOSE_WAIT: Duration = Duration::from_secs(1);

/// Poll interval while waiting for the open connection count to reach zero.
const CLOSE_POLL: Duration = Duration::from_millis(5);

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Get the number of active subscribers (tasks still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// How the server drain ended.
#[derive(Debug)]
pub enum DrainOutcome {
    /// Every in-flight request finished inside the grace period.
    Completed,
    /// The grace period elapsed; remaining work was abandoned.
    Abandoned,
    /// The server reported an error while draining.
    Failed(std::io::Error),
    /// The server task panicked.
    Panicked,
}

/// Wait up to `grace` for the server task to finish. Past the deadline,
/// force-close every connection tracked by `connections`.
pub async fn drain(
    mut server: JoinHandle<std::io::Result<()>>,
    connections: &Handle,
    grace: Duration,
) -> DrainOutcome {
    match tokio::time::timeout(grace, &mut server).await {
        Ok(Ok(Ok(()))) => {
            tracing::info!("All connections drained");
            DrainOutcome::Completed
        }
        Ok(Ok(Err(e))) => {
            tracing::error!(error = %e, "HTTP server failed while draining");
            DrainOutcome::Failed(e)
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "HTTP server task failed while draining");
            DrainOutcome::Panicked
        }
        Err(_) => {
            connections.shutdown();
            let closed = tokio::time::timeout(FORCE_CLOSE_WAIT, async {
                let _ = (&mut server).await;
                while connections.connection_count() > 0 {
                    tokio::time::sleep(CLOSE_POLL).await;
                }
            })
            .await;

            if closed.is_err() {
                server.abort();
                tracing::error!(
                    open_connections = connections.connection_count(),
                    "Connections still open after forced close"
                );
            }
            tracing::warn!(grace = ?grace, "Server forced to shutdown, in-flight requests abandoned");
            DrainOutcome::Abandoned
        }
    }
}
