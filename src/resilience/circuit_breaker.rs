//! Circuit breaker guarding the speech-synthesis service.
//!
//! # States
//! - Closed: normal operation, synthesis requests pass through
//! - Open: service assumed down, requests fail fast
//! - Half-Open: a single probe checks whether the service recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= threshold
//! Open → Half-Open: first status check after the recovery timeout
//! Half-Open → Closed: probe succeeds (counter reset)
//! Half-Open → Open: probe fails (threshold bypassed)
//! ```
//!
//! # Design Decisions
//! - One breaker per synthesis service, owned by the caller that issues requests
//! - Fail fast in Open state (no network I/O at all)
//! - Single probe in Half-Open (prevents hammering a recovering service)
//! - State is in-memory only; a restart starts Closed

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Numeric encoding used for the state gauge (0=closed, 1=half-open, 2=open).
    pub fn as_gauge(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Point-in-time view of the breaker, as reported to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    /// Unix seconds of the most recent recorded failure.
    pub last_failure_time: Option<u64>,
    /// Unix seconds of the most recent recorded success.
    pub last_success_time: Option<u64>,
    pub failure_threshold: u32,
    pub recovery_timeout_secs: u64,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    /// Monotonic time of the last failure; drives the cooldown.
    opened_at: Option<Instant>,
    last_failure_unix: Option<u64>,
    last_success_unix: Option<u64>,
    /// Set once the Half-Open probe has been handed out.
    probe_granted: bool,
}

impl BreakerInner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            last_failure_unix: None,
            last_success_unix: None,
            probe_granted: false,
        }
    }
}

/// Three-state circuit breaker tracking consecutive synthesis failures.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    recovery_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a new breaker in the Closed state.
    pub fn new(name: impl Into<String>, config: &CircuitBreakerConfig) -> Self {
        let breaker = Self {
            name: name.into(),
            failure_threshold: config.failure_threshold.max(1),
            recovery_timeout: config.recovery_timeout(),
            inner: Mutex::new(BreakerInner::new()),
        };
        metrics::record_circuit_state(&breaker.name, CircuitState::Closed);
        breaker
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state, after applying any due Open → Half-Open transition.
    pub fn state(&self) -> CircuitState {
        self.status().state
    }

    /// Return true if requests must not be attempted right now.
    ///
    /// In Half-Open the first call hands out the single probe and returns false;
    /// later calls return true until the probe outcome is recorded.
    pub fn is_circuit_open(&self) -> bool {
        self.is_circuit_open_at(Instant::now())
    }

    pub fn is_circuit_open_at(&self, now: Instant) -> bool {
        let mut inner = self.lock();
        self.advance(&mut inner, now);

        let state = inner.state;
        match state {
            CircuitState::Closed => false,
            CircuitState::Open => true,
            CircuitState::HalfOpen => {
                if inner.probe_granted {
                    true
                } else {
                    inner.probe_granted = true;
                    tracing::info!(breaker = %self.name, "Circuit half-open, allowing probe request");
                    false
                }
            }
        }
    }

    /// Report a successful synthesis.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = 0;
        inner.last_success_unix = Some(unix_now());

        if inner.state != CircuitState::Closed {
            self.transition(&mut inner, CircuitState::Closed);
            inner.opened_at = None;
        }
    }

    /// Report a failed synthesis.
    pub fn record_failure(&self) {
        self.record_failure_at(Instant::now());
    }

    pub fn record_failure_at(&self, now: Instant) {
        let mut inner = self.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.last_failure_unix = Some(unix_now());

        let state = inner.state;
        match state {
            CircuitState::Closed => {
                if inner.consecutive_failures >= self.failure_threshold {
                    inner.opened_at = Some(now);
                    self.transition(&mut inner, CircuitState::Open);
                } else {
                    tracing::debug!(
                        breaker = %self.name,
                        failures = inner.consecutive_failures,
                        threshold = self.failure_threshold,
                        "Synthesis failure recorded"
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.opened_at = Some(now);
                self.transition(&mut inner, CircuitState::Open);
            }
            CircuitState::Open => {
                // Restart the cooldown from the latest failure.
                inner.opened_at = Some(now);
            }
        }
    }

    /// Return to Closed and forget all failures. Idempotent.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        if inner.state != CircuitState::Closed {
            self.transition(&mut inner, CircuitState::Closed);
        }
        tracing::info!(breaker = %self.name, "Circuit breaker reset by operator");
    }

    /// Snapshot for operators. Applies a due Open → Half-Open transition
    /// but never consumes the probe.
    pub fn status(&self) -> HealthStatus {
        self.status_at(Instant::now())
    }

    pub fn status_at(&self, now: Instant) -> HealthStatus {
        let mut inner = self.lock();
        self.advance(&mut inner, now);

        HealthStatus {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            last_failure_time: inner.last_failure_unix,
            last_success_time: inner.last_success_unix,
            failure_threshold: self.failure_threshold,
            recovery_timeout_secs: self.recovery_timeout.as_secs(),
        }
    }

    fn advance(&self, inner: &mut BreakerInner, now: Instant) {
        if inner.state != CircuitState::Open {
            return;
        }
        let cooled_down = inner
            .opened_at
            .map(|at| now.saturating_duration_since(at) > self.recovery_timeout)
            .unwrap_or(true);
        if cooled_down {
            self.transition(inner, CircuitState::HalfOpen);
        }
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitState) {
        let from = inner.state;
        inner.state = to;
        inner.probe_granted = false;

        match to {
            CircuitState::Open => tracing::warn!(
                breaker = %self.name,
                from = %from,
                failures = inner.consecutive_failures,
                cooldown_secs = self.recovery_timeout.as_secs(),
                "Circuit opened, synthesis requests blocked"
            ),
            _ => tracing::info!(breaker = %self.name, from = %from, to = %to, "Circuit state changed"),
        }
        metrics::record_circuit_state(&self.name, to);
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
