//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpListener;
use user_service::domain::{User, UserError, UserRepository, UserService};
use user_service::http::{AppState, HttpServer};
use user_service::messaging::Messaging;
use user_service::observability::metrics;

/// Repository backed by a map.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let repo = Self::default();
        {
            let mut map = repo.users.lock().unwrap();
            for user in users {
                map.insert(user.id.clone(), user);
            }
        }
        repo
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
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

/// Repository whose reads take `delay` and count how many finished.
pub struct SlowUserRepository {
    delay: Duration,
    started: AtomicUsize,
    completed: AtomicUsize,
    active: AtomicUsize,
}

/// Counts a read as active until it finishes or is dropped.
struct ActiveRead<'a>(&'a AtomicUsize);

impl<'a> ActiveRead<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for ActiveRead<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SlowUserRepository {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
        }
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Reads currently running (started, neither finished nor dropped).
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserRepository for SlowUserRepository {
    async fn get_by_id(&self, id: &str) -> Result<User, UserError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let _active = ActiveRead::enter(&self.active);
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(User::new(id, "Slow"))
    }

    async fn create(&self, _user: &User) -> Result<(), UserError> {
        Ok(())
    }
}

/// Repository whose every call fails as a storage error.
pub struct FailingUserRepository;

#[async_trait]
impl UserRepository for FailingUserRepository {
    async fn get_by_id(&self, _id: &str) -> Result<User, UserError> {
        Err(UserError::persistence(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }

    async fn create(&self, _user: &User) -> Result<(), UserError> {
        Err(UserError::persistence(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }
}

/// Build a server over `repo` with messaging disabled.
pub fn server_with(repo: Arc<dyn UserRepository>) -> HttpServer {
    let users = UserService::new(repo, Messaging::Absent);
    let state = AppState::new(users, metrics::init_metrics());
    HttpServer::new(state, Duration::from_secs(30))
}

/// Server seeded with `u1 = Alice`.
pub fn seeded_server() -> HttpServer {
    server_with(Arc::new(InMemoryUserRepository::with_users([User::new(
        "u1", "Alice",
    )])))
}

/// Bind an ephemeral port on loopback.
pub async fn ephemeral_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Client that never reuses connections between requests.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
