//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a remote dependency:
//!     → circuit_breaker.rs (admit or short-circuit)
//!     → operation runs
//!     → outcome recorded (consecutive failures trip the breaker)
//! ```
//!
//! # Design Decisions
//! - The breaker is operation-agnostic: any zero-argument fallible future
//! - Fail fast in Open state (the operation is never invoked)
//! - Half-Open admits a bounded number of trial calls

pub mod circuit_breaker;

pub use circuit_breaker::{BreakerError, BreakerSettings, BreakerState, CircuitBreaker, Counts};
