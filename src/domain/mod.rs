//! User domain.
//!
//! # Data Flow
//! ```text
//! HTTP handler
//!     → service.rs (UserService: stable contract for transport)
//!     → user.rs (UserRepository port)
//!     → storage adapter (PostgreSQL) or any test double
//! ```
//!
//! # Design Decisions
//! - Transport depends on UserService only, never on storage
//! - Repository errors distinguish "absent" from "storage failed"
//! - No caching: every read goes to the repository

pub mod service;
pub mod user;

pub use service::{UserService, USER_CREATED_SUBJECT};
pub use user::{User, UserError, UserRepository};
