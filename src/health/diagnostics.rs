//! Connectivity diagnostics for the synthesis host.
//!
//! # Responsibilities
//! - Resolve the synthesis host (DNS)
//! - Open a TCP connection to the first resolved address
//! - Explain, in one sentence, which layer is failing
//!
//! # Design Decisions
//! - Layers are checked in order; a failed layer skips the ones above it
//! - Every probe has its own deadline
//! - Diagnostics never fail; problems become part of the report

use serde::Serialize;
use std::net::SocketAddr;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::net::TcpStream;
use tokio::time;
use url::Url;

use crate::config::DiagnosticsConfig;

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Ok { detail: String, elapsed_ms: u64 },
    Failed { reason: String },
    Skipped,
}

impl ProbeOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ProbeOutcome::Ok { .. })
    }
}

/// Operator-facing connectivity report.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub endpoint: String,
    pub host: String,
    pub port: u16,
    pub dns: ProbeOutcome,
    pub tcp: ProbeOutcome,
    pub explanation: String,
    /// Unix seconds when the checks ran.
    pub checked_at: u64,
}

/// Run DNS and TCP checks against the host of `endpoint`.
pub async fn diagnose_endpoint(endpoint: &str, config: &DiagnosticsConfig) -> DiagnosticReport {
    let target = Url::parse(endpoint).ok().and_then(|url| {
        let host = url.host_str()?.to_string();
        let port = url.port_or_known_default()?;
        Some((host, port))
    });

    let Some((host, port)) = target else {
        return DiagnosticReport {
            endpoint: endpoint.to_string(),
            host: String::new(),
            port: 0,
            dns: ProbeOutcome::Skipped,
            tcp: ProbeOutcome::Skipped,
            explanation: format!("Synthesis endpoint '{endpoint}' is not a valid URL; check the configuration."),
            checked_at: unix_now(),
        };
    };

    let (dns, addr) = resolve(&host, port, Duration::from_secs(config.dns_timeout_secs)).await;
    let tcp = match addr {
        Some(addr) => connect(addr, Duration::from_secs(config.tcp_timeout_secs)).await,
        None => ProbeOutcome::Skipped,
    };
    let explanation = explain(&host, port, &dns, &tcp);

    DiagnosticReport {
        endpoint: endpoint.to_string(),
        host,
        port,
        dns,
        tcp,
        explanation,
        checked_at: unix_now(),
    }
}

async fn resolve(host: &str, port: u16, limit: Duration) -> (ProbeOutcome, Option<SocketAddr>) {
    let started = Instant::now();
    match time::timeout(limit, tokio::net::lookup_host((host, port))).await {
        Ok(Ok(addrs)) => {
            let addrs: Vec<SocketAddr> = addrs.collect();
            match addrs.first().copied() {
                Some(first) => {
                    let detail = format!("resolved to {} address(es), using {}", addrs.len(), first.ip());
                    (ProbeOutcome::Ok { detail, elapsed_ms: elapsed_ms(started) }, Some(first))
                }
                None => (
                    ProbeOutcome::Failed {
                        reason: "no addresses returned".to_string(),
                    },
                    None,
                ),
            }
        }
        Ok(Err(e)) => (ProbeOutcome::Failed { reason: e.to_string() }, None),
        Err(_) => (
            ProbeOutcome::Failed {
                reason: format!("timed out after {}s", limit.as_secs()),
            },
            None,
        ),
    }
}

async fn connect(addr: SocketAddr, limit: Duration) -> ProbeOutcome {
    let started = Instant::now();
    match time::timeout(limit, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => ProbeOutcome::Ok {
            detail: format!("connected to {addr}"),
            elapsed_ms: elapsed_ms(started),
        },
        Ok(Err(e)) => ProbeOutcome::Failed { reason: e.to_string() },
        Err(_) => ProbeOutcome::Failed {
            reason: format!("timed out after {}s", limit.as_secs()),
        },
    }
}

fn explain(host: &str, port: u16, dns: &ProbeOutcome, tcp: &ProbeOutcome) -> String {
    match (dns, tcp) {
        (ProbeOutcome::Failed { reason }, _) => {
            format!("DNS resolution of {host} failed ({reason}); the host has no working name resolution.")
        }
        (_, ProbeOutcome::Failed { reason }) => {
            format!("{host} resolves but port {port} is unreachable ({reason}); a firewall or outage blocks the connection.")
        }
        (ProbeOutcome::Ok { .. }, ProbeOutcome::Ok { .. }) => {
            format!("Network path to {host}:{port} is fine; the synthesis service itself is rejecting or failing requests.")
        }
        _ => format!("Connectivity to {host}:{port} could not be checked."),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_reachable_host_blames_service() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let report = diagnose_endpoint(&format!("http://127.0.0.1:{port}/tts"), &DiagnosticsConfig::default()).await;

        assert!(report.dns.is_ok());
        assert!(report.tcp.is_ok());
        assert_eq!(report.port, port);
        assert!(report.explanation.contains("synthesis service itself"));
    }

    #[tokio::test]
    async fn test_closed_port_is_reported() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let report = diagnose_endpoint(&format!("http://127.0.0.1:{port}/"), &DiagnosticsConfig::default()).await;

        assert!(report.dns.is_ok());
        assert!(matches!(report.tcp, ProbeOutcome::Failed { .. }));
        assert!(report.explanation.contains("unreachable"));
    }

    #[tokio::test]
    async fn test_invalid_endpoint_skips_probes() {
        let report = diagnose_endpoint("::not-a-url::", &DiagnosticsConfig::default()).await;

        assert_eq!(report.dns, ProbeOutcome::Skipped);
        assert_eq!(report.tcp, ProbeOutcome::Skipped);
        assert!(report.explanation.contains("not a valid URL"));
    }

    #[test]
    fn test_https_default_port() {
        let url = Url::parse("https://speech.platform.bing.com/x").unwrap();
        assert_eq!(url.port_or_known_default(), Some(443));
    }
}
