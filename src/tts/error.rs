use std::time::Duration;
use thiserror::Error;

/// Failure of a single synthesis attempt.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("synthesis timed out after {0:?}")]
    Timeout(Duration),

    #[error("no audio received")]
    NoAudioReceived,

    #[error("network error: {0}")]
    Network(String),

    #[error("synthesis service returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("voice rejected by synthesis service: {0}")]
    InvalidVoice(String),

    #[error("empty text")]
    EmptyText,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SynthesisError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SynthesisError::Timeout(_) => "timeout",
            SynthesisError::NoAudioReceived => "no_audio",
            SynthesisError::Network(_) => "network",
            SynthesisError::Server { .. } => "server",
            SynthesisError::InvalidVoice(_) => "invalid_voice",
            SynthesisError::EmptyText => "empty_text",
            SynthesisError::Io(_) => "io",
        }
    }
}

impl From<reqwest::Error> for SynthesisError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not expose the configured limit.
            SynthesisError::Timeout(Duration::ZERO)
        } else if let Some(status) = err.status() {
            SynthesisError::Server {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            SynthesisError::Network(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, SynthesisError>;
