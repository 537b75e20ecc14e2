//! User service.
//!
//! Pass-through over the repository; the seam where validation and business
//! rules would go. A successful create is announced on the messaging
//! connection when one is configured.

use std::sync::Arc;

use crate::domain::user::{User, UserError, UserRepository};
use crate::messaging::Messaging;

/// Subject a newly created user is published on.
pub const USER_CREATED_SUBJECT: &str = "users.created";

/// Business layer the transport talks to.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    messaging: Messaging,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, messaging: Messaging) -> Self {
        Self { repo, messaging }
    }

    /// Fetch a user by id.
    pub async fn get_user(&self, id: &str) -> Result<User, UserError> {
        self.repo.get_by_id(id).await
    }

    /// Create a user, then publish it. Publish failures are logged and do
    /// not undo or fail the create.
    pub async fn create_user(&self, user: User) -> Result<User, UserError> {
        self.repo.create(&user).await?;

        match serde_json::to_vec(&user) {
            Ok(payload) => {
                if let Err(e) = self.messaging.publish(USER_CREATED_SUBJECT, payload).await {
                    tracing::warn!(user_id = %user.id, error = %e, "Failed to announce created user");
                }
            }
            Err(e) => tracing::warn!(user_id = %user.id, error = %e, "Failed to encode created user"),
        }

        Ok(user)
    }
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService")
            .field("messaging", &self.messaging)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryRepo {
        users: Mutex<HashMap<String, User>>,
    }

    #[async_trait]
    impl UserRepository for MemoryRepo {
        async fn get_by_id(&self, id: &str) -> Result<User, UserError> {
            self.users
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or_else(|| UserError::NotFound(id.to_string()))
        }

        async fn create(&self, user: &User) -> Result<(), UserError> {
            let mut users = self.users.lock().unwrap();
            if users.contains_key(&user.id) {
                return Err(UserError::AlreadyExists(user.id.clone()));
            }
            users.insert(user.id.clone(), user.clone());
            Ok(())
        }
    }

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryRepo::default()), Messaging::Absent)
    }

    #[tokio::test]
    async fn test_created_user_is_retrievable() {
        let svc = service();
        let created = svc.create_user(User::new("u1", "Alice")).await.unwrap();
        assert_eq!(created, User::new("u1", "Alice"));

        let fetched = svc.get_user("u1").await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() {
        let err = service().get_user("u2").await.unwrap_err();
        assert!(matches!(err, UserError::NotFound(ref id) if id == "u2"));
        assert_eq!(err.to_string(), "user not found: u2");
    }

    #[tokio::test]
    async fn test_duplicate_create_is_rejected() {
        let svc = service();
        svc.create_user(User::new("u1", "Alice")).await.unwrap();
        let err = svc.create_user(User::new("u1", "Bob")).await.unwrap_err();
        assert!(matches!(err, UserError::AlreadyExists(_)));
        assert_eq!(svc.get_user("u1").await.unwrap().name, "Alice");
    }
}
