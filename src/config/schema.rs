//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the voice service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the voice service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct VoiceConfig {
    /// Speech-synthesis backend and voice selection.
    pub tts: TtsConfig,

    /// Retry configuration for synthesis attempts.
    pub retries: RetryConfig,

    /// Circuit breaker tuning.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Connectivity diagnostics run after total exhaustion.
    pub diagnostics: DiagnosticsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Speech-synthesis configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Synthesis endpoint URL (SSML POST).
    pub endpoint: String,

    /// Voice identity tried first.
    pub primary_voice: String,

    /// Voice identity tried once the primary voice is exhausted.
    pub fallback_voice: String,

    /// Value of the `X-Microsoft-OutputFormat` header.
    pub output_format: String,

    /// Per-attempt timeout in seconds.
    pub attempt_timeout_secs: u64,

    /// Directory temporary audio files are written to.
    /// Empty means the OS temp directory.
    pub output_dir: String,

    /// Longer input is truncated before synthesis.
    pub max_text_chars: usize,
}

impl TtsConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://speech.platform.bing.com/consumer/speech/synthesize/readaloud/voice/v1?trustedclienttoken=6A5AA1D4EAFF4E9FB37E23D68491D6F4"
                .to_string(),
            primary_voice: "de-DE-KillianNeural".to_string(),
            fallback_voice: "de-DE-ConradNeural".to_string(),
            output_format: "audio-24khz-48kbitrate-mono-mp3".to_string(),
            attempt_timeout_secs: 15,
            output_dir: String::new(),
            max_text_chars: 1000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per voice.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Jitter added on top of each delay, as a fraction of it.
    /// 0.0 keeps the schedule exact.
    pub jitter_ratio: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 4000,
            jitter_ratio: 0.0,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,

    /// Cooldown in seconds before an open circuit allows a probe.
    pub recovery_timeout_secs: u64,
}

impl CircuitBreakerConfig {
    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery_timeout_secs)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_secs: 300,
        }
    }
}

/// Connectivity diagnostics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Run DNS/TCP checks when every attempt failed.
    pub enabled: bool,

    /// DNS resolution timeout in seconds.
    pub dns_timeout_secs: u64,

    /// TCP connect timeout in seconds.
    pub tcp_timeout_secs: u64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dns_timeout_secs: 5,
            tcp_timeout_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,

    /// Request timeout for admin calls in seconds.
    pub request_timeout_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
            request_timeout_secs: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_voice_tuning() {
        let config = VoiceConfig::default();
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.circuit_breaker.recovery_timeout(), Duration::from_secs(300));
        assert_eq!(config.retries.max_attempts, 3);
        assert_eq!(config.retries.base_delay_ms, 1000);
        assert_eq!(config.tts.attempt_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: VoiceConfig = toml::from_str(
            r#"
            [tts]
            primary_voice = "en-US-GuyNeural"

            [circuit_breaker]
            failure_threshold = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.tts.primary_voice, "en-US-GuyNeural");
        assert_eq!(config.tts.fallback_voice, "de-DE-ConradNeural");
        assert_eq!(config.circuit_breaker.failure_threshold, 2);
        assert_eq!(config.circuit_breaker.recovery_timeout_secs, 300);
    }
}
