//! PostgreSQL-backed `UserRepository`.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{User, UserError, UserRepository};

/// Users stored in the `users` table.
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get_by_id(&self, id: &str) -> Result<User, UserError> {
        // `name` is nullable; a NULL reads as the empty string.
        let row: Option<(String, Option<String>)> =
            sqlx::query_as("SELECT id, name FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(UserError::persistence)?;

        match row {
            Some((id, name)) => Ok(User::new(id, name.unwrap_or_default())),
            None => Err(UserError::NotFound(id.to_string())),
        }
    }

    async fn create(&self, user: &User) -> Result<(), UserError> {
        let result = sqlx::query("INSERT INTO users (id, name) VALUES ($1, $2)")
            .bind(&user.id)
            .bind(&user.name)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => {
                tracing::info!(user_id = %user.id, "Created user");
                Ok(())
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(UserError::AlreadyExists(user.id.clone()))
            }
            Err(e) => Err(UserError::persistence(e)),
        }
    }
}
