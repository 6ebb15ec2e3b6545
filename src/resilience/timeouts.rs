//! Timeout enforcement.
//!
//! Every synthesis attempt runs under a deadline; an elapsed deadline is
//! reported as `SynthesisError::Timeout` so the retry loop can tell it apart
//! from other failures.

use std::future::Future;
use std::time::Duration;

use crate::tts::error::SynthesisError;

/// Run a synthesis future under a deadline.
pub async fn with_deadline<T, F>(limit: Duration, fut: F) -> Result<T, SynthesisError>
where
    F: Future<Output = Result<T, SynthesisError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(SynthesisError::Timeout(limit)),
    }
}
