//! Startup orchestration.
//!
//! Order: metrics → voice service → config watcher → admin API → wait for
//! a termination signal → shutdown. Any startup error is fatal.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::watcher::ConfigWatcher;
use crate::config::VoiceConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::tts::VoiceService;

/// Run the voice service until a termination signal arrives.
pub async fn run(config: VoiceConfig, config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let service = Arc::new(VoiceService::from_config(&config)?);
    let shutdown = Shutdown::new();
    let mut tasks = Vec::new();

    // The watcher handle must stay alive for events to keep flowing.
    let _watcher = match config_path {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(&path);
            let handle = watcher.run()?;
            let service = service.clone();
            let mut stop = shutdown.subscribe();
            tasks.push(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        update = updates.recv() => match update {
                            Some(new_config) => service.apply_config(&new_config),
                            None => break,
                        },
                        _ = stop.recv() => break,
                    }
                }
            }));
            Some(handle)
        }
        None => None,
    };

    if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let server = HttpServer::new(service.clone(), config.admin.clone());
        let stop = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = server.run(listener, stop).await {
                tracing::error!(error = %e, "Admin API failed");
            }
        }));
    } else {
        tracing::info!("Admin API disabled");
    }

    tracing::info!(
        primary_voice = %config.tts.primary_voice,
        fallback_voice = %config.tts.fallback_voice,
        failure_threshold = config.circuit_breaker.failure_threshold,
        recovery_timeout_secs = config.circuit_breaker.recovery_timeout_secs,
        "Voice service ready"
    );

    signals::wait_for_termination().await;
    shutdown.trigger();

    for task in tasks {
        let _ = task.await;
    }
    Ok(())
}
