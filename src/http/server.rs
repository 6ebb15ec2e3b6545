//! HTTP server for the operator admin API.
//!
//! # Responsibilities
//! - Create Axum Router with the admin routes
//! - Wire up middleware (tracing, request timeout)
//! - Serve until the shutdown signal fires

use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::setup_admin_router;
use crate::config::AdminConfig;
use crate::tts::VoiceService;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<VoiceService>,
    pub admin: Arc<AdminConfig>,
}

/// Admin API server.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(service: Arc<VoiceService>, admin: AdminConfig) -> Self {
        let admin = Arc::new(admin);
        let state = AppState {
            service,
            admin: admin.clone(),
        };
        let router = Self::build_router(&admin, state);
        Self { router }
    }

    #[allow(deprecated)]
    fn build_router(admin: &AdminConfig, state: AppState) -> Router {
        setup_admin_router(state)
            .layer(TimeoutLayer::new(Duration::from_secs(admin.request_timeout_secs)))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Admin API listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Admin API received shutdown signal");
            })
            .await?;

        tracing::info!("Admin API stopped");
        Ok(())
    }
}
