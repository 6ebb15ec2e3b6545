//! Text-to-speech subsystem.
//!
//! # Data Flow
//! ```text
//! text
//!     → service.rs (breaker gate, retries, voice fallback)
//!     → backend.rs trait → edge.rs (SSML POST to the synthesis service)
//!     → audio.rs (temporary file for playback)
//! ```

pub mod audio;
pub mod backend;
pub mod edge;
pub mod error;
pub mod service;

pub use audio::SynthesizedAudio;
pub use backend::Synthesizer;
pub use edge::EdgeSynthesizer;
pub use error::SynthesisError;
pub use service::VoiceService;
