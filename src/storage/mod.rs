//! Relational storage (PostgreSQL via sqlx).
//!
//! # Data Flow
//! ```text
//! StorageConfig
//!     → pool.rs (parse URL, size pool, TLS, guarded ping)
//!     → PgPool (shared, internally synchronized)
//!     → user_repository.rs (UserRepository over the pool)
//! ```
//!
//! The `users` table is created outside this service; see `schema.sql`.

pub mod pool;
pub mod user_repository;

pub use pool::{connect_pool, StorageError};
pub use user_repository::PgUserRepository;
