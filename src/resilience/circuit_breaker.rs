//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: a bounded number of trial calls check for recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures > failure_threshold
//! Closed → Closed: counts cleared every interval (new generation)
//! Open → Half-Open: first call after open_duration has elapsed
//! Half-Open → Closed: half_open_max_calls trial calls succeed
//! Half-Open → Open: any trial call fails
//! ```
//!
//! # Design Decisions
//! - All mutable state sits under one mutex, never held across an await
//! - Each state change starts a new generation; outcomes reported by calls
//!   admitted in an older generation are ignored
//! - Counters reset on every transition
//! - A call whose future is dropped before finishing counts as a failure,
//!   so cancelled trial calls never hold a half-open slot

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::observability::metrics;

/// Circuit breaker state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Calls are allowed through.
    Closed,
    /// Calls are rejected without running.
    Open,
    /// Trial calls decide between Closed and Open.
    HalfOpen,
}

impl BreakerState {
    /// Numeric encoding used for the state gauge.
    pub fn as_gauge(self) -> f64 {
        match self {
            BreakerState::Closed => 0.0,
            BreakerState::HalfOpen => 1.0,
            BreakerState::Open => 2.0,
        }
    }
}

/// Tuning for a [`CircuitBreaker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    /// Consecutive failures tolerated; one more opens the breaker.
    pub failure_threshold: u32,
    /// How long the breaker stays open before admitting trial calls.
    pub open_duration: Duration,
    /// Closed-state counts are cleared this often. Zero never clears them.
    pub interval: Duration,
    /// Trial calls admitted in Half-Open, and successes needed to close.
    pub half_open_max_calls: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration: Duration::from_secs(5),
            interval: Duration::from_secs(5),
            half_open_max_calls: 5,
        }
    }
}

/// Counters for the current generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// Calls admitted.
    pub requests: u32,
    pub total_successes: u32,
    pub total_failures: u32,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
}

impl Counts {
    fn on_request(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    fn on_success(&mut self) {
        self.total_successes = self.total_successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    fn on_failure(&mut self) {
        self.total_failures = self.total_failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }
}

/// Error returned by [`CircuitBreaker::call`].
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The breaker is open; the operation was not run.
    #[error("circuit breaker is open")]
    Open,

    /// Half-open and every trial slot is taken; the operation was not run.
    #[error("circuit breaker is half-open and has no trial calls left")]
    TooManyTrialCalls,

    /// The operation ran and failed.
    #[error(transparent)]
    Inner(E),
}

impl<E> BreakerError<E> {
    /// True when the call was short-circuited by the breaker.
    pub fn is_rejected(&self) -> bool {
        !matches!(self, BreakerError::Inner(_))
    }

    /// The operation's own error, if it ran.
    pub fn into_inner(self) -> Option<E> {
        match self {
            BreakerError::Inner(e) => Some(e),
            _ => None,
        }
    }
}

enum Rejection {
    Open,
    TooManyTrialCalls,
}

struct Inner {
    state: BreakerState,
    generation: u64,
    counts: Counts,
    /// End of the current generation: the open timeout while Open, the
    /// count-clearing interval while Closed, none while Half-Open.
    expiry: Option<Instant>,
}

/// An admitted call. Settles as a failure if dropped unsettled.
struct Admission<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    settled: bool,
}

impl Admission<'_> {
    fn settle(mut self, success: bool) {
        self.settled = true;
        self.breaker.record(self.generation, success);
    }
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!(breaker = %self.breaker.name, "Guarded call cancelled, counting as failure");
            self.breaker.record(self.generation, false);
        }
    }
}

/// A named circuit breaker, shareable across tasks by reference or `Arc`.
pub struct CircuitBreaker {
    name: String,
    settings: BreakerSettings,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(name: impl Into<String>, settings: BreakerSettings) -> Self {
        let name = name.into();
        metrics::record_breaker_state(&name, BreakerState::Closed);
        Self {
            name,
            settings,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                generation: 0,
                counts: Counts::default(),
                expiry: closed_expiry(&settings, Instant::now()),
            }),
        }
    }

    /// Breaker name used in logs and metrics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state, applying an elapsed Open → Half-Open transition.
    pub fn state(&self) -> BreakerState {
        let mut inner = self.lock();
        self.refresh(&mut inner, Instant::now());
        inner.state
    }

    /// Counters for the current generation.
    pub fn counts(&self) -> Counts {
        let mut inner = self.lock();
        self.refresh(&mut inner, Instant::now());
        inner.counts
    }

    /// Run `operation` under the breaker.
    ///
    /// While open (or half-open with no trial slots left) the operation is
    /// not invoked and a rejection is returned immediately.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let admission = match self.admit() {
            Ok(generation) => Admission {
                breaker: self,
                generation,
                settled: false,
            },
            Err(Rejection::Open) => return Err(BreakerError::Open),
            Err(Rejection::TooManyTrialCalls) => return Err(BreakerError::TooManyTrialCalls),
        };

        let result = operation().await;
        admission.settle(result.is_ok());
        result.map_err(BreakerError::Inner)
    }

    fn admit(&self) -> Result<u64, Rejection> {
        let mut inner = self.lock();
        self.refresh(&mut inner, Instant::now());

        match inner.state {
            BreakerState::Open => Err(Rejection::Open),
            BreakerState::HalfOpen if inner.counts.requests >= self.settings.half_open_max_calls => {
                Err(Rejection::TooManyTrialCalls)
            }
            BreakerState::Closed | BreakerState::HalfOpen => {
                inner.counts.on_request();
                Ok(inner.generation)
            }
        }
    }

    fn record(&self, generation: u64, success: bool) {
        let mut inner = self.lock();
        let now = Instant::now();
        self.refresh(&mut inner, now);
        if inner.generation != generation {
            return;
        }

        if success {
            inner.counts.on_success();
            if inner.state == BreakerState::HalfOpen
                && inner.counts.consecutive_successes >= self.settings.half_open_max_calls
            {
                self.transition(&mut inner, BreakerState::Closed, now);
            }
        } else {
            inner.counts.on_failure();
            match inner.state {
                BreakerState::Closed
                    if inner.counts.consecutive_failures > self.settings.failure_threshold =>
                {
                    self.transition(&mut inner, BreakerState::Open, now);
                }
                BreakerState::HalfOpen => self.transition(&mut inner, BreakerState::Open, now),
                _ => {}
            }
        }
    }

    fn refresh(&self, inner: &mut Inner, now: Instant) {
        let expired = inner.expiry.is_some_and(|expiry| now >= expiry);
        match inner.state {
            BreakerState::Open if expired => self.transition(inner, BreakerState::HalfOpen, now),
            BreakerState::Closed if expired => {
                inner.generation += 1;
                inner.counts = Counts::default();
                inner.expiry = closed_expiry(&self.settings, now);
            }
            _ => {}
        }
    }

    fn transition(&self, inner: &mut Inner, to: BreakerState, now: Instant) {
        let from = inner.state;
        inner.state = to;
        inner.generation += 1;
        inner.counts = Counts::default();
        inner.expiry = match to {
            BreakerState::Open => now.checked_add(self.settings.open_duration),
            BreakerState::Closed => closed_expiry(&self.settings, now),
            BreakerState::HalfOpen => None,
        };

        match to {
            BreakerState::Open => tracing::warn!(
                breaker = %self.name,
                from = ?from,
                threshold = self.settings.failure_threshold,
                open_for = ?self.settings.open_duration,
                "circuit breaker opened"
            ),
            BreakerState::HalfOpen => tracing::info!(
                breaker = %self.name,
                "circuit breaker half-open, admitting trial calls"
            ),
            BreakerState::Closed => tracing::info!(
                breaker = %self.name,
                "circuit breaker closed after successful trial calls"
            ),
        }
        metrics::record_breaker_state(&self.name, to);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn closed_expiry(settings: &BreakerSettings, now: Instant) -> Option<Instant> {
    if settings.interval.is_zero() {
        None
    } else {
        now.checked_add(settings.interval)
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("settings", &self.settings)
            .field("state", &self.state())
            .finish()
    }
}
