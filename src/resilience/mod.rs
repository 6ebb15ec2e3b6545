//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Synthesis request:
//!     → circuit_breaker.rs (fail fast while the service is known to be down)
//!     → timeouts.rs (enforce per-attempt deadline)
//!     → On failure: retries.rs (classify, retry with backoff.rs delays)
//!     → circuit_breaker.rs (one outcome recorded per request)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retry decisions branch on a closed error-kind enum
//! - Circuit breaker prevents hammering a failing service

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{CircuitBreaker, CircuitState, HealthStatus};
