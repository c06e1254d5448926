use std::path::Path;

use async_trait::async_trait;
use tracing::{info, warn};

use ai_client::OpenAi;

use crate::traits::Transcriber;

pub const WHISPER_MODEL: &str = "whisper-1";

/// Whisper through the OpenAI audio API. Output is English regardless of the
/// spoken language.
pub struct WhisperTranscriber {
    ai: OpenAi,
}

impl WhisperTranscriber {
    pub fn new(api_key: &str) -> Self {
        Self {
            ai: OpenAi::new(api_key, WHISPER_MODEL),
        }
    }

    pub fn with_client(ai: OpenAi) -> Self {
        Self { ai }
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> String {
        match self.ai.translate_audio(audio_path).await {
            Ok(text) => {
                info!(chars = text.len(), "Transcription complete");
                text
            }
            Err(e) => {
                warn!(path = %audio_path.display(), error = %e, "Transcription failed");
                String::new()
            }
        }
    }
}

/// Used when no speech-to-text key is configured.
pub struct DisabledTranscriber;

#[async_trait]
impl Transcriber for DisabledTranscriber {
    async fn transcribe(&self, _audio_path: &Path) -> String {
        warn!("Transcription disabled, OPENAI_API_KEY not set");
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreadable_audio_yields_empty_transcript() {
        let transcriber = WhisperTranscriber::new("sk-test");
        let text = transcriber.transcribe(Path::new("/no/such/audio.mp3")).await;
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn disabled_transcriber_is_empty() {
        assert!(DisabledTranscriber.transcribe(Path::new("a.mp3")).await.is_empty());
    }
}
