//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, thresholds > 0)
//! - Check the synthesis endpoint is a usable URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: VoiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::schema::VoiceConfig;
use crate::resilience::backoff::calculate_backoff;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("tts.endpoint is not a valid http(s) URL with a host: {0}")]
    InvalidEndpoint(String),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("retries.max_delay_ms ({max}) is below retries.base_delay_ms ({base})")]
    DelayRange { base: u64, max: u64 },

    #[error("retries.jitter_ratio must be within 0.0..=1.0, got {0}")]
    JitterRange(String),

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("admin.request_timeout_secs ({timeout_secs}) is below the longest synthesis request ({required_secs}s)")]
    RequestTimeoutTooShort { timeout_secs: u64, required_secs: u64 },
}

/// Longest a single synthesis request can take: every attempt on every voice
/// hitting its deadline, the backoff between them, then diagnostics.
pub fn worst_case_request(config: &VoiceConfig) -> Duration {
    let voices: u32 = if config.tts.fallback_voice == config.tts.primary_voice { 1 } else { 2 };
    let attempts = config.retries.max_attempts;
    let attempt_timeout = config.tts.attempt_timeout();
    let jitter = 1.0 + config.retries.jitter_ratio.clamp(0.0, 1.0);

    let mut total = Duration::ZERO;
    for voice in 1..=voices {
        for attempt in 1..=attempts {
            total = total.saturating_add(attempt_timeout);
            if voice == voices && attempt == attempts {
                continue;
            }
            let delay = calculate_backoff(attempt, config.retries.base_delay_ms, config.retries.max_delay_ms, 0.0);
            total = total.saturating_add(delay.mul_f64(jitter));
        }
    }

    if config.diagnostics.enabled {
        total = total
            .saturating_add(Duration::from_secs(config.diagnostics.dns_timeout_secs))
            .saturating_add(Duration::from_secs(config.diagnostics.tcp_timeout_secs));
    }
    total
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &VoiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.tts.endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {}
        _ => errors.push(ValidationError::InvalidEndpoint(config.tts.endpoint.clone())),
    }

    if config.tts.primary_voice.trim().is_empty() {
        errors.push(ValidationError::EmptyField("tts.primary_voice"));
    }
    if config.tts.fallback_voice.trim().is_empty() {
        errors.push(ValidationError::EmptyField("tts.fallback_voice"));
    }
    if config.tts.attempt_timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("tts.attempt_timeout_secs"));
    }
    if config.tts.max_text_chars == 0 {
        errors.push(ValidationError::ZeroValue("tts.max_text_chars"));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::ZeroValue("retries.max_attempts"));
    }
    if config.retries.max_delay_ms < config.retries.base_delay_ms {
        errors.push(ValidationError::DelayRange {
            base: config.retries.base_delay_ms,
            max: config.retries.max_delay_ms,
        });
    }
    if !(0.0..=1.0).contains(&config.retries.jitter_ratio) {
        errors.push(ValidationError::JitterRange(config.retries.jitter_ratio.to_string()));
    }

    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError::ZeroValue("circuit_breaker.failure_threshold"));
    }
    if config.circuit_breaker.recovery_timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("circuit_breaker.recovery_timeout_secs"));
    }

    if config.diagnostics.enabled {
        if config.diagnostics.dns_timeout_secs == 0 {
            errors.push(ValidationError::ZeroValue("diagnostics.dns_timeout_secs"));
        }
        if config.diagnostics.tcp_timeout_secs == 0 {
            errors.push(ValidationError::ZeroValue("diagnostics.tcp_timeout_secs"));
        }
    }

    if config.admin.enabled {
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::EmptyField("admin.api_key"));
        }
        if config.admin.request_timeout_secs == 0 {
            errors.push(ValidationError::ZeroValue("admin.request_timeout_secs"));
        } else {
            let required = worst_case_request(config);
            if Duration::from_secs(config.admin.request_timeout_secs) < required {
                errors.push(ValidationError::RequestTimeoutTooShort {
                    timeout_secs: config.admin.request_timeout_secs,
                    required_secs: required.as_secs_f64().ceil() as u64,
                });
            }
        }
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress {
                field: "admin.bind_address",
                value: config.admin.bind_address.clone(),
            });
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
