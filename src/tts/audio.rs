//! Temporary audio files handed to playback.

use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};

/// An audio file written for playback.
///
/// The file is not removed automatically; whoever plays it calls
/// [`SynthesizedAudio::remove`] afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesizedAudio {
    path: PathBuf,
    voice: String,
    bytes: usize,
}

impl SynthesizedAudio {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Voice that produced the audio (primary or fallback).
    pub fn voice(&self) -> &str {
        &self.voice
    }

    pub fn len(&self) -> usize {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }

    /// Delete the file. A file that is already gone is not an error.
    pub async fn remove(self) -> io::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Write audio into `dir` under a unique name.
pub async fn write_audio(dir: &Path, voice: &str, audio: &[u8]) -> io::Result<SynthesizedAudio> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("tts_{}.mp3", uuid::Uuid::new_v4().simple()));
    tokio::fs::write(&path, audio).await?;

    Ok(SynthesizedAudio {
        path,
        voice: voice.to_string(),
        bytes: audio.len(),
    })
}

/// Resolve the configured output directory; empty means the OS temp dir.
pub fn output_dir(configured: &str) -> PathBuf {
    if configured.is_empty() {
        std::env::temp_dir()
    } else {
        PathBuf::from(configured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_remove() {
        let dir = tempfile::tempdir().unwrap();
        let audio = write_audio(dir.path(), "de-DE-KillianNeural", b"ID3data").await.unwrap();

        assert_eq!(audio.len(), 7);
        assert_eq!(audio.voice(), "de-DE-KillianNeural");
        assert_eq!(tokio::fs::read(audio.path()).await.unwrap(), b"ID3data");

        let path = audio.path().to_path_buf();
        audio.clone().remove().await.unwrap();
        assert!(!path.exists());

        // Second removal is a no-op.
        audio.remove().await.unwrap();
    }

    #[test]
    fn test_output_dir_defaults_to_temp() {
        assert_eq!(output_dir(""), std::env::temp_dir());
        assert_eq!(output_dir("/var/tts"), PathBuf::from("/var/tts"));
    }
}
