pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/tts/health", get(get_tts_health))
        .route("/admin/tts/reset", post(reset_circuit))
        .route("/admin/tts/diagnose", post(run_diagnostics))
        .route("/admin/tts/diagnosis", get(get_last_diagnosis))
        .route("/admin/tts/speak", post(speak))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
