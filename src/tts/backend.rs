//! Synthesis backend abstraction.

use async_trait::async_trait;
use bytes::Bytes;

use super::error::Result;

/// A speech-synthesis service.
///
/// Implementations perform exactly one request per call; retries, deadlines
/// and the circuit breaker live in `VoiceService`.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Synthesize `text` with `voice`, returning encoded audio.
    ///
    /// An empty response must be reported as `SynthesisError::NoAudioReceived`.
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Bytes>;
}
