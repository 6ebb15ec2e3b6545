//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use sulfur_voice::config::VoiceConfig;

/// Start a programmable mock synthesis service on an ephemeral port.
///
/// The handler receives the request body (the SSML document) and returns
/// a status code and response body.
pub async fn start_mock_tts<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, Vec<u8>)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let body = read_body(&mut socket).await;
                        let (status, payload) = f(body).await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let head = format!(
                            "HTTP/1.1 {}\r\nContent-Type: audio/mpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                            status_text,
                            payload.len()
                        );
                        let _ = socket.write_all(head.as_bytes()).await;
                        let _ = socket.write_all(&payload).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_body(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return String::new(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = head
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    String::from_utf8_lossy(&buf[header_end..]).into_owned()
}

/// Config pointing at a mock service, with fast retries.
#[allow(dead_code)]
pub fn fast_config(tts_addr: SocketAddr, output_dir: &std::path::Path) -> VoiceConfig {
    let mut config = VoiceConfig::default();
    config.tts.endpoint = format!("http://{}/synthesize", tts_addr);
    config.tts.primary_voice = "de-DE-KillianNeural".into();
    config.tts.fallback_voice = "de-DE-ConradNeural".into();
    config.tts.attempt_timeout_secs = 2;
    config.tts.output_dir = output_dir.to_string_lossy().into_owned();
    config.retries.base_delay_ms = 5;
    config.retries.max_delay_ms = 20;
    config.diagnostics.dns_timeout_secs = 1;
    config.diagnostics.tcp_timeout_secs = 1;
    config.observability.metrics_enabled = false;
    config
}
