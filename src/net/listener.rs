//! TCP listener binding and listener failure reporting.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Classify listener failures (bind, serve, unexpected stop)

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinError;

/// Error type for listener operations. Every variant is fatal.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The address is malformed.
    #[error("invalid listen address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// Failed to bind (e.g., port already in use).
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The server failed while serving.
    #[error("http server error: {0}")]
    Serve(#[source] std::io::Error),

    /// The server stopped before shutdown was requested.
    #[error("http server stopped unexpectedly")]
    Stopped,

    /// The server task panicked or was cancelled.
    #[error("http server task failed: {0}")]
    Task(#[from] JoinError),
}

/// Bind a TCP listener to `address`.
pub async fn bind(address: &str) -> Result<TcpListener, ListenerError> {
    let addr: SocketAddr = address.parse().map_err(|source| ListenerError::InvalidAddress {
        address: address.to_string(),
        source,
    })?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { address: addr, source })?;

    let local_addr = listener
        .local_addr()
        .map_err(|source| ListenerError::Bind { address: addr, source })?;

    tracing::info!(address = %local_addr, "Listener bound");
    Ok(listener)
}
