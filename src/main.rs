//! User Service
//!
//! A small HTTP service: liveness, Prometheus metrics and user lookup over
//! PostgreSQL, with optional NATS publishing.
//!
//! # Architecture Overview
//!
//! ```text
//!   config ──▶ lifecycle::startup ──┬──▶ storage (pool + breaker-guarded ping)
//!                                   └──▶ messaging (optional NATS)
//!                                          │
//!                                          ▼
//!   client ──▶ net listener ──▶ http server ──▶ handlers ──▶ domain ──▶ storage
//!                                          │
//!   SIGINT/SIGTERM ──▶ lifecycle::shutdown (stop accepting, drain, release)
//! ```
//!
//! # Exit Codes
//! - 0: clean shutdown after a signal
//! - 1: dependency or listener failure
//! - 2: invalid configuration

use std::process::ExitCode;

use user_service::config::{self, ConfigError};
use user_service::lifecycle;
use user_service::observability::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match config::load_config(std::env::args_os()) {
        Ok(config) => config,
        Err(ConfigError::Parse(e)) => e.exit(),
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("failed to initialise logging: {e}");
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting service");

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Service configuration is invalid; aborting");
        return ExitCode::from(2);
    }

    match lifecycle::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Service terminated");
            ExitCode::FAILURE
        }
    }
}
