use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::health::DiagnosticReport;
use crate::http::server::AppState;
use crate::resilience::{CircuitState, HealthStatus};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub primary_voice: String,
    pub fallback_voice: String,
}

#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SpeakResponse {
    pub path: String,
    pub voice: String,
    pub bytes: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let settings = state.service.settings();
    let status = match state.service.health_status().state {
        CircuitState::Closed => "operational",
        CircuitState::HalfOpen => "recovering",
        CircuitState::Open => "degraded",
    };
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status,
        primary_voice: settings.tts.primary_voice.clone(),
        fallback_voice: settings.tts.fallback_voice.clone(),
    })
}

pub async fn get_tts_health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(state.service.health_status())
}

pub async fn reset_circuit(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(state.service.reset_circuit())
}

pub async fn run_diagnostics(State(state): State<AppState>) -> Json<DiagnosticReport> {
    Json(state.service.diagnose().await)
}

pub async fn get_last_diagnosis(State(state): State<AppState>) -> Json<Option<DiagnosticReport>> {
    Json(state.service.last_diagnosis())
}

pub async fn speak(State(state): State<AppState>, Json(request): Json<SpeakRequest>) -> Response {
    if request.text.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "text must not be empty").into_response();
    }

    match state.service.speak(&request.text).await {
        Some(audio) => Json(SpeakResponse {
            path: audio.path().display().to_string(),
            voice: audio.voice().to_string(),
            bytes: audio.len(),
        })
        .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "Voice synthesis unavailable").into_response(),
    }
}
