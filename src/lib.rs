//! User Service Library

pub mod config;
pub mod domain;
pub mod http;
pub mod lifecycle;
pub mod messaging;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod storage;

pub use config::ServiceConfig;
pub use domain::{User, UserService};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
