//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! environment / command line
//!     → loader.rs (clap parse, env-backed)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → handed by reference to startup, cloned into subsystems as needed
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - Every option has an env var; required ones fail at parse time
//! - Validation separates syntactic (clap) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BreakerConfig, FeatureToggles, LogFormat, MessagingConfig, ObservabilityConfig,
    ServiceConfig, StorageConfig,
};
pub use validation::ValidationError;
