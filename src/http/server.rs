//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, metrics)
//! - Serve on a bound listener until the shutdown broadcast fires
//!
//! # Design Decisions
//! - Once shutdown fires, no new connections are accepted; in-flight
//!   requests keep running and the caller bounds how long it waits
//! - Connections are tracked by an `axum_server::Handle`, so the caller can
//!   force-close them (dropping their handlers) when the wait runs out

use std::time::Duration;

use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Router};
use axum_server::Handle;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::domain::UserService;
use crate::http::{handlers, middleware, request};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub metrics: PrometheusHandle,
}

impl AppState {
    pub fn new(users: UserService, metrics: PrometheusHandle) -> Self {
        Self { users, metrics }
    }
}

/// HTTP server for the service.
pub struct HttpServer {
    router: Router,
    handle: Handle,
}

impl HttpServer {
    /// Create a new HTTP server over the given state.
    pub fn new(state: AppState, request_timeout: Duration) -> Self {
        Self {
            router: Self::build_router(state, request_timeout),
            handle: Handle::new(),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, request_timeout: Duration) -> Router {
        Router::new()
            .route("/healthz", get(handlers::health))
            .route("/metrics", get(handlers::metrics))
            .route("/users", post(handlers::create_user))
            .route("/users/{id}", get(handlers::get_user))
            .route_layer(axum_middleware::from_fn(middleware::track_metrics))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(request::set_request_id())
                    .layer(TraceLayer::new_for_http().make_span_with(request::make_span))
                    .layer(TimeoutLayer::new(request_timeout))
                    .layer(request::propagate_request_id()),
            )
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Handle over this server's connections. `shutdown()` on it closes
    /// every open connection immediately.
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires, then wait for open connections to finish (or to be
    /// force-closed through [`HttpServer::handle`]).
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let handle = self.handle.clone();
        let serve = axum_server::from_tcp(listener.into_std()?)
            .handle(self.handle)
            .serve(self.router.into_make_service());
        tokio::pin!(serve);

        tokio::select! {
            result = &mut serve => {
                result?;
                tracing::info!("HTTP server stopped");
                return Ok(());
            }
            _ = shutdown.recv() => {
                tracing::info!("HTTP server no longer accepting connections");
                handle.graceful_shutdown(None);
            }
        }

        serve.await?;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
