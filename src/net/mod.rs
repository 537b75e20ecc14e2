//! Network layer.
//!
//! # Data Flow
//! ```text
//! BIND_ADDRESS
//!     → listener.rs (parse, bind, log)
//!     → TcpListener handed to the HTTP server
//! ```

pub mod listener;

pub use listener::{bind, ListenerError};
