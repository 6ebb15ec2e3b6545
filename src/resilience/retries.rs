//! Retry classification.
//!
//! # Responsibilities
//! - Decide, per failed attempt, whether to retry the same voice,
//!   move on to the fallback voice, or give up entirely
//!
//! # Design Decisions
//! - Transient failures (timeouts, empty audio, network, 5xx/429) retry
//! - A rejected voice or a non-transient status abandons that voice only
//! - Local problems (empty input, disk) are not worth another attempt

use crate::tts::error::SynthesisError;

/// What the retry loop should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try the same voice again after backoff.
    Retry,
    /// Stop using this voice; continue with the next one.
    NextVoice,
    /// Stop all attempts.
    Abort,
}

/// Classify a failed attempt.
pub fn classify(error: &SynthesisError) -> RetryDecision {
    match error {
        SynthesisError::Timeout(_) | SynthesisError::NoAudioReceived | SynthesisError::Network(_) => {
            RetryDecision::Retry
        }
        SynthesisError::Server { status, .. } => {
            if is_retryable_status(*status) {
                RetryDecision::Retry
            } else {
                RetryDecision::NextVoice
            }
        }
        SynthesisError::InvalidVoice(_) => RetryDecision::NextVoice,
        SynthesisError::EmptyText | SynthesisError::Io(_) => RetryDecision::Abort,
    }
}

/// 429 and 5xx are transient.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}
