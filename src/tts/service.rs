//! Retry-with-fallback wrapper around a synthesis backend.
//!
//! # Data Flow
//! ```text
//! speak(text)
//!     → breaker open? → None (no I/O)
//!     → primary voice: up to max_attempts, backoff 1s, 2s, 4s
//!     → fallback voice: same loop
//!     → success: breaker success, audio file written, Some(audio)
//!     → exhausted: breaker failure (once), diagnostics, None
//! ```

use arc_swap::ArcSwap;
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use super::audio::{output_dir, write_audio, SynthesizedAudio};
use super::backend::Synthesizer;
use super::edge::EdgeSynthesizer;
use super::error::{Result, SynthesisError};
use crate::config::{DiagnosticsConfig, RetryConfig, TtsConfig, VoiceConfig};
use crate::health::diagnostics::{diagnose_endpoint, DiagnosticReport};
use crate::observability::metrics;
use crate::resilience::backoff::backoff_for;
use crate::resilience::retries::{classify, RetryDecision};
use crate::resilience::timeouts::with_deadline;
use crate::resilience::{CircuitBreaker, HealthStatus};

/// Settings that may change on config reload.
#[derive(Debug, Clone)]
pub struct VoiceSettings {
    pub tts: TtsConfig,
    pub retries: RetryConfig,
    pub diagnostics: DiagnosticsConfig,
}

impl From<&VoiceConfig> for VoiceSettings {
    fn from(config: &VoiceConfig) -> Self {
        Self {
            tts: config.tts.clone(),
            retries: config.retries.clone(),
            diagnostics: config.diagnostics.clone(),
        }
    }
}

/// How a request through the voice chain ended.
enum ChainOutcome {
    Spoken { voice: String, audio: Bytes },
    Exhausted,
    Aborted,
}

/// Speech synthesis with retries, voice fallback and a circuit breaker.
pub struct VoiceService {
    synthesizer: Arc<dyn Synthesizer>,
    breaker: Arc<CircuitBreaker>,
    settings: ArcSwap<VoiceSettings>,
    last_diagnosis: Mutex<Option<DiagnosticReport>>,
}

impl VoiceService {
    pub fn new(synthesizer: Arc<dyn Synthesizer>, breaker: Arc<CircuitBreaker>, config: &VoiceConfig) -> Self {
        Self {
            synthesizer,
            breaker,
            settings: ArcSwap::from_pointee(VoiceSettings::from(config)),
            last_diagnosis: Mutex::new(None),
        }
    }

    /// Build the service with the Edge TTS backend and a fresh breaker.
    pub fn from_config(config: &VoiceConfig) -> Result<Self> {
        let synthesizer = Arc::new(EdgeSynthesizer::new(&config.tts)?);
        let breaker = Arc::new(CircuitBreaker::new("edge-tts", &config.circuit_breaker));
        Ok(Self::new(synthesizer, breaker, config))
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn settings(&self) -> Arc<VoiceSettings> {
        self.settings.load_full()
    }

    pub fn health_status(&self) -> HealthStatus {
        self.breaker.status()
    }

    /// Operator reset of the breaker.
    pub fn reset_circuit(&self) -> HealthStatus {
        self.breaker.reset();
        self.breaker.status()
    }

    /// Swap in reloaded settings. Breaker state is kept.
    pub fn apply_config(&self, config: &VoiceConfig) {
        let settings = VoiceSettings::from(config);
        tracing::info!(
            primary_voice = %settings.tts.primary_voice,
            fallback_voice = %settings.tts.fallback_voice,
            max_attempts = settings.retries.max_attempts,
            "Voice settings reloaded"
        );
        self.settings.store(Arc::new(settings));
    }

    /// Most recent diagnosis, recorded when every attempt failed or on demand.
    pub fn last_diagnosis(&self) -> Option<DiagnosticReport> {
        self.last_diagnosis
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run connectivity diagnostics against the configured endpoint now.
    pub async fn diagnose(&self) -> DiagnosticReport {
        let settings = self.settings.load_full();
        let report = diagnose_endpoint(&settings.tts.endpoint, &settings.diagnostics).await;
        *self.last_diagnosis.lock().unwrap_or_else(PoisonError::into_inner) = Some(report.clone());
        report
    }

    /// Synthesize `text` into a temporary audio file.
    ///
    /// `None` means the voice feature is unavailable right now; it is never
    /// a fatal condition for the caller.
    ///
    /// The chain runs on its own task. Dropping the returned future does not
    /// cancel it, so the breaker always learns the outcome.
    pub async fn speak(self: &Arc<Self>, text: &str) -> Option<SynthesizedAudio> {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!("Ignoring empty synthesis request");
            return None;
        }

        let settings = self.settings.load_full();
        let text = truncate_chars(text, settings.tts.max_text_chars).to_owned();

        if self.breaker.is_circuit_open() {
            tracing::info!(breaker = %self.breaker.name(), "Circuit open, skipping synthesis");
            metrics::record_outcome("circuit_open");
            return None;
        }

        let service = Arc::clone(self);
        let task = tokio::spawn(async move { service.complete(&text, &settings).await });
        match task.await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::error!(error = %e, "Synthesis task failed");
                None
            }
        }
    }

    /// Run the voice chain and report its outcome to the breaker.
    async fn complete(&self, text: &str, settings: &VoiceSettings) -> Option<SynthesizedAudio> {
        let started = Instant::now();
        let report = BreakerReport::new(&self.breaker);
        match self.run_chain(text, settings).await {
            ChainOutcome::Spoken { voice, audio } => {
                report.success();
                metrics::record_synthesis_duration(&voice, started);

                let dir: PathBuf = output_dir(&settings.tts.output_dir);
                match write_audio(&dir, &voice, &audio).await {
                    Ok(file) => {
                        metrics::record_outcome("spoken");
                        tracing::info!(voice = %voice, bytes = file.len(), path = ?file.path(), "Synthesis succeeded");
                        Some(file)
                    }
                    Err(e) => {
                        metrics::record_outcome("write_failed");
                        tracing::error!(dir = ?dir, error = %e, "Failed to write synthesized audio");
                        None
                    }
                }
            }
            ChainOutcome::Exhausted => {
                report.failure();
                metrics::record_outcome("exhausted");
                tracing::error!(
                    backend = %self.synthesizer.name(),
                    failures = self.breaker.status().consecutive_failures,
                    "All synthesis attempts failed"
                );

                if settings.diagnostics.enabled {
                    let report = self.diagnose().await;
                    tracing::warn!(
                        host = %report.host,
                        port = report.port,
                        explanation = %report.explanation,
                        "Synthesis connectivity diagnosis"
                    );
                }
                None
            }
            ChainOutcome::Aborted => {
                report.failure();
                metrics::record_outcome("aborted");
                None
            }
        }
    }

    async fn run_chain(&self, text: &str, settings: &VoiceSettings) -> ChainOutcome {
        let voices = voice_chain(&settings.tts);
        let max_attempts = settings.retries.max_attempts.max(1);
        let timeout = settings.tts.attempt_timeout();

        for (index, voice) in voices.iter().enumerate() {
            let last_voice = index + 1 == voices.len();
            if index > 0 {
                tracing::warn!(voice = %voice, "Primary voice exhausted, trying fallback voice");
            }

            for attempt in 1..=max_attempts {
                let result = with_deadline(timeout, self.attempt(text, voice)).await;
                let err = match result {
                    Ok(audio) => {
                        return ChainOutcome::Spoken {
                            voice: voice.to_string(),
                            audio,
                        }
                    }
                    Err(err) => err,
                };

                metrics::record_failed_attempt(voice, err.kind());
                tracing::warn!(voice = %voice, attempt, max_attempts, error = %err, "Synthesis attempt failed");

                match classify(&err) {
                    RetryDecision::Retry => {
                        if last_voice && attempt == max_attempts {
                            break;
                        }
                        let delay = backoff_for(attempt, &settings.retries);
                        tracing::debug!(voice = %voice, attempt, delay = ?delay, "Backing off before next attempt");
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::NextVoice => break,
                    RetryDecision::Abort => {
                        tracing::warn!(error = %err, "Synthesis aborted");
                        return ChainOutcome::Aborted;
                    }
                }
            }
        }

        ChainOutcome::Exhausted
    }

    async fn attempt(&self, text: &str, voice: &str) -> Result<Bytes> {
        let audio = self.synthesizer.synthesize(text, voice).await?;
        if audio.is_empty() {
            return Err(SynthesisError::NoAudioReceived);
        }
        Ok(audio)
    }
}

/// Reports a chain outcome to the breaker exactly once.
///
/// Dropped without a report (a panicking backend) it counts as a failure,
/// so a Half-Open trial request is always resolved.
struct BreakerReport<'a> {
    breaker: &'a CircuitBreaker,
    reported: bool,
}

impl<'a> BreakerReport<'a> {
    fn new(breaker: &'a CircuitBreaker) -> Self {
        Self {
            breaker,
            reported: false,
        }
    }

    fn success(mut self) {
        self.reported = true;
        self.breaker.record_success();
    }

    fn failure(mut self) {
        self.reported = true;
        self.breaker.record_failure();
    }
}

impl Drop for BreakerReport<'_> {
    fn drop(&mut self) {
        if !self.reported {
            tracing::warn!(breaker = %self.breaker.name(), "Synthesis ended without an outcome, counting as failure");
            self.breaker.record_failure();
        }
    }
}

/// Primary voice, then the fallback voice unless it is the same one.
fn voice_chain(tts: &TtsConfig) -> Vec<&str> {
    let mut voices = vec![tts.primary_voice.as_str()];
    if tts.fallback_voice != tts.primary_voice {
        voices.push(tts.fallback_voice.as_str());
    }
    voices
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::CircuitState;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Synthesizer returning scripted results and recording calls.
    struct Scripted {
        script: Mutex<VecDeque<Result<Bytes>>>,
        calls: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(script: Vec<Result<Bytes>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Synthesizer for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn synthesize(&self, _text: &str, voice: &str) -> Result<Bytes> {
            self.calls.lock().unwrap().push(voice.to_string());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(SynthesisError::NoAudioReceived))
        }
    }

    fn test_config(dir: &std::path::Path) -> VoiceConfig {
        let mut config = VoiceConfig::default();
        config.tts.primary_voice = "primary".into();
        config.tts.fallback_voice = "fallback".into();
        config.tts.output_dir = dir.to_string_lossy().into_owned();
        config.retries.base_delay_ms = 1;
        config.retries.max_delay_ms = 4;
        config.diagnostics.enabled = false;
        config
    }

    fn service(synth: Arc<dyn Synthesizer>, config: &VoiceConfig) -> Arc<VoiceService> {
        let breaker = Arc::new(CircuitBreaker::new("test", &config.circuit_breaker));
        Arc::new(VoiceService::new(synth, breaker, config))
    }

    fn audio() -> Result<Bytes> {
        Ok(Bytes::from_static(b"mp3"))
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Scripted::new(vec![audio()]);
        let svc = service(synth.clone(), &test_config(dir.path()));

        let file = svc.speak("Hallo").await.expect("audio");
        assert_eq!(file.voice(), "primary");
        assert!(file.path().starts_with(dir.path()));
        assert_eq!(synth.calls(), vec!["primary"]);
        file.remove().await.unwrap();
    }

    #[tokio::test]
    async fn test_retries_then_succeeds_on_primary() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Scripted::new(vec![
            Err(SynthesisError::NoAudioReceived),
            Err(SynthesisError::Network("reset".into())),
            audio(),
        ]);
        let svc = service(synth.clone(), &test_config(dir.path()));

        let file = svc.speak("Hallo").await.expect("audio");
        assert_eq!(file.voice(), "primary");
        assert_eq!(synth.calls(), vec!["primary", "primary", "primary"]);
        assert_eq!(svc.health_status().consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_falls_back_after_primary_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Scripted::new(vec![
            Err(SynthesisError::NoAudioReceived),
            Err(SynthesisError::NoAudioReceived),
            Err(SynthesisError::NoAudioReceived),
            audio(),
        ]);
        let svc = service(synth.clone(), &test_config(dir.path()));

        let file = svc.speak("Hallo").await.expect("audio");
        assert_eq!(file.voice(), "fallback");
        assert_eq!(synth.calls(), vec!["primary", "primary", "primary", "fallback"]);
    }

    #[tokio::test]
    async fn test_invalid_voice_skips_to_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Scripted::new(vec![Err(SynthesisError::InvalidVoice("primary".into())), audio()]);
        let svc = service(synth.clone(), &test_config(dir.path()));

        let file = svc.speak("Hallo").await.expect("audio");
        assert_eq!(file.voice(), "fallback");
        assert_eq!(synth.calls(), vec!["primary", "fallback"]);
    }

    #[tokio::test]
    async fn test_exhaustion_records_one_failure() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Scripted::new(Vec::new());
        let svc = service(synth.clone(), &test_config(dir.path()));

        assert!(svc.speak("Hallo").await.is_none());
        assert_eq!(synth.calls().len(), 6);

        let status = svc.health_status();
        assert_eq!(status.consecutive_failures, 1);
        assert_eq!(status.state, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_open_circuit_makes_no_calls() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Scripted::new(vec![audio()]);
        let svc = service(synth.clone(), &test_config(dir.path()));
        for _ in 0..5 {
            svc.breaker().record_failure();
        }

        assert!(svc.speak("Hallo").await.is_none());
        assert!(synth.calls().is_empty());

        svc.reset_circuit();
        assert!(svc.speak("Hallo").await.is_some());
        assert_eq!(synth.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_text_does_not_touch_breaker() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Scripted::new(Vec::new());
        let svc = service(synth.clone(), &test_config(dir.path()));

        assert!(svc.speak("   ").await.is_none());
        assert!(synth.calls().is_empty());
        assert_eq!(svc.health_status().consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_same_voice_skips_fallback_pass() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.tts.fallback_voice = "primary".into();
        let synth = Scripted::new(Vec::new());
        let svc = service(synth.clone(), &config);

        assert!(svc.speak("Hallo").await.is_none());
        assert_eq!(synth.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_attempt_deadline_counts_as_failure() {
        struct Hanging;

        #[async_trait]
        impl Synthesizer for Hanging {
            fn name(&self) -> &str {
                "hanging"
            }

            async fn synthesize(&self, _text: &str, _voice: &str) -> Result<Bytes> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Bytes::from_static(b"late"))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.retries.max_attempts = 1;
        config.tts.attempt_timeout_secs = 1;
        let svc = service(Arc::new(Hanging), &config);

        let started = Instant::now();
        assert!(svc.speak("Hallo").await.is_none());
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(svc.health_status().consecutive_failures, 1);
    }

    #[tokio::test]
    async fn test_apply_config_keeps_breaker_state() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let synth = Scripted::new(vec![audio()]);
        let svc = service(synth.clone(), &config);
        svc.breaker().record_failure();

        let mut reloaded = config.clone();
        reloaded.tts.primary_voice = "other".into();
        svc.apply_config(&reloaded);

        assert_eq!(svc.settings().tts.primary_voice, "other");
        assert_eq!(svc.health_status().consecutive_failures, 1);
        let file = svc.speak("Hallo").await.expect("audio");
        assert_eq!(file.voice(), "other");
    }

    /// Synthesizer that blocks each call until a permit is released.
    struct Gated {
        gate: tokio::sync::Semaphore,
        calls: AtomicUsize,
    }

    impl Gated {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                gate: tokio::sync::Semaphore::new(0),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn wait_for_call(&self) {
            tokio::time::timeout(Duration::from_secs(5), async {
                while self.calls() == 0 {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
            .await
            .expect("synthesizer called");
        }
    }

    #[async_trait]
    impl Synthesizer for Gated {
        fn name(&self) -> &str {
            "gated"
        }

        async fn synthesize(&self, _text: &str, _voice: &str) -> Result<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|_| SynthesisError::NoAudioReceived)?;
            Ok(Bytes::from_static(b"mp3"))
        }
    }

    fn half_open_config(dir: &std::path::Path) -> VoiceConfig {
        let mut config = test_config(dir);
        config.circuit_breaker.recovery_timeout_secs = 1;
        config
    }

    /// Open the breaker with failures old enough that the cooldown has passed.
    fn trip_past_cooldown(svc: &VoiceService) {
        let opened = Instant::now() - Duration::from_secs(2);
        for _ in 0..5 {
            svc.breaker().record_failure_at(opened);
        }
        assert_eq!(svc.health_status().state, CircuitState::HalfOpen);
    }

    async fn wait_for_state(svc: &VoiceService, expected: CircuitState) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while svc.health_status().state != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("breaker reached expected state");
    }

    #[tokio::test]
    async fn test_half_open_admits_single_request_and_closes_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Gated::new();
        let svc = service(synth.clone(), &half_open_config(dir.path()));
        trip_past_cooldown(&svc);

        let first = tokio::spawn({
            let svc = svc.clone();
            async move { svc.speak("Hallo").await }
        });
        synth.wait_for_call().await;

        // A concurrent request is refused while the trial request is in flight.
        assert!(svc.speak("Noch einmal").await.is_none());
        assert_eq!(synth.calls(), 1);

        synth.gate.add_permits(1);
        let file = first.await.unwrap().expect("audio");
        assert_eq!(file.voice(), "primary");

        let status = svc.health_status();
        assert_eq!(status.state, CircuitState::Closed);
        assert_eq!(status.consecutive_failures, 0);
        assert_eq!(synth.calls(), 1);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens_through_speak() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Scripted::new(Vec::new());
        let svc = service(synth.clone(), &half_open_config(dir.path()));
        trip_past_cooldown(&svc);

        assert!(svc.speak("Hallo").await.is_none());
        assert_eq!(synth.calls().len(), 6);
        assert_eq!(svc.health_status().state, CircuitState::Open);

        // Cooldown restarted: nothing reaches the backend.
        assert!(svc.speak("Hallo").await.is_none());
        assert_eq!(synth.calls().len(), 6);
    }

    #[tokio::test]
    async fn test_abandoned_request_still_resolves_half_open() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Gated::new();
        let svc = service(synth.clone(), &half_open_config(dir.path()));
        trip_past_cooldown(&svc);

        let abandoned = tokio::time::timeout(Duration::from_millis(50), svc.speak("Hallo")).await;
        assert!(abandoned.is_err());
        assert_eq!(synth.calls(), 1);

        synth.gate.add_permits(1);
        wait_for_state(&svc, CircuitState::Closed).await;
        assert!(!svc.breaker().is_circuit_open());
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("größer", 3), "grö");
        assert_eq!(truncate_chars("kurz", 10), "kurz");
    }
}
