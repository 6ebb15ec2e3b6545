//! HTTP subsystem for the operator admin API.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tracing + timeout layers)
//!     → admin auth middleware (Bearer token)
//!     → admin handlers (health, reset, diagnose, speak)
//! ```

pub mod server;

pub use server::{AppState, HttpServer};
