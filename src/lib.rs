//! Sulfur voice: resilient text-to-speech for voice calls.
//!
//! A circuit breaker guards the external speech-synthesis service, and every
//! request runs through a retry loop with exponential backoff and a fallback
//! voice. Operators inspect and reset the breaker through the admin API.

pub mod admin;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod tts;

pub use config::schema::VoiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use resilience::{CircuitBreaker, CircuitState, HealthStatus};
pub use tts::{SynthesizedAudio, VoiceService};
