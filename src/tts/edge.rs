//! Edge TTS (Microsoft) synthesis over an SSML POST endpoint.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use super::backend::Synthesizer;
use super::error::{Result, SynthesisError};
use crate::config::TtsConfig;

const USER_AGENT: &str = concat!("sulfur-voice/", env!("CARGO_PKG_VERSION"));

/// HTTP client for an Edge-TTS-compatible endpoint.
pub struct EdgeSynthesizer {
    client: Client,
    endpoint: String,
    output_format: String,
}

impl EdgeSynthesizer {
    pub fn new(config: &TtsConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(USER_AGENT)
            .build()?;

        tracing::info!(endpoint = %config.endpoint, format = %config.output_format, "Edge TTS backend initialized");

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            output_format: config.output_format.clone(),
        })
    }

    fn build_ssml(text: &str, voice: &str) -> String {
        format!(
            r#"<speak version="1.0" xmlns="http://www.w3.org/2001/10/synthesis" xml:lang="{lang}"><voice name="{voice}">{}</voice></speak>"#,
            escape_xml(text),
            lang = escape_xml(voice_locale(voice)),
            voice = escape_xml(voice),
        )
    }
}

#[async_trait]
impl Synthesizer for EdgeSynthesizer {
    fn name(&self) -> &str {
        "edge-tts"
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<Bytes> {
        if text.trim().is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        tracing::debug!(chars = text.chars().count(), voice = %voice, "Requesting synthesis");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", &self.output_format)
            .body(Self::build_ssml(text, voice))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => SynthesisError::InvalidVoice(voice.to_string()),
                _ => SynthesisError::Server {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(SynthesisError::NoAudioReceived);
        }

        tracing::debug!(bytes = audio.len(), voice = %voice, "Synthesis response received");
        Ok(audio)
    }
}

/// Locale prefix of a voice name ("de-DE-KillianNeural" → "de-DE").
fn voice_locale(voice: &str) -> &str {
    let mut dashes = voice.match_indices('-').map(|(i, _)| i);
    match (dashes.next(), dashes.next()) {
        (Some(_), Some(end)) => &voice[..end],
        _ => "en-US",
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
