//! Health subsystem.
//!
//! # Data Flow
//! ```text
//! Synthesis exhausted (tts::service):
//!     → diagnostics.rs probes DNS, then TCP, for the synthesis host
//!     → DiagnosticReport logged and kept as the last diagnosis
//!
//! Operator request (admin API):
//!     → diagnostics.rs runs on demand
//! ```
//!
//! The circuit breaker itself lives in `resilience::circuit_breaker`.

pub mod diagnostics;

pub use diagnostics::{diagnose_endpoint, DiagnosticReport, ProbeOutcome};
