//! User entity and persistence port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque unique identifier (primary key).
    pub id: String,
    /// Display name.
    pub name: String,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Errors surfaced by user persistence.
#[derive(Debug, Error)]
pub enum UserError {
    /// No user with this id.
    #[error("user not found: {0}")]
    NotFound(String),

    /// A user with this id already exists.
    #[error("user already exists: {0}")]
    AlreadyExists(String),

    /// Connectivity, decoding or any other storage failure.
    #[error("persistence failure: {0}")]
    Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl UserError {
    /// Wrap any storage error.
    pub fn persistence<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        UserError::Persistence(Box::new(error))
    }
}

/// Persistence port for users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fetch a single user by id.
    async fn get_by_id(&self, id: &str) -> Result<User, UserError>;

    /// Insert a new user.
    async fn create(&self, user: &User) -> Result<(), UserError>;
}
