mod client;
pub(crate) mod types;

use std::path::Path;

use anyhow::{Context, Result};

use crate::error::AiError;
use client::OpenAiClient;

/// Answer from an OpenAI-compatible chat endpoint.
#[derive(Debug, Clone)]
pub struct ChatAnswer {
    pub content: String,
    /// Citation URLs when the provider returns them (Perplexity does).
    pub citations: Vec<String>,
}

/// Client for OpenAI and any API that speaks its chat-completions dialect.
#[derive(Clone)]
pub struct OpenAi {
    model: String,
    client: OpenAiClient,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            client: OpenAiClient::new(&api_key.into()),
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            AiError::Config("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key, model))
    }

    /// Point at another OpenAI-compatible provider, e.g. `https://api.perplexity.ai`.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.client = self.client.with_base_url(&url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<ChatAnswer> {
        let request = types::ChatRequest::new(&self.model)
            .message(types::WireMessage::system(system))
            .message(types::WireMessage::user(user))
            .temperature(temperature)
            .max_tokens(max_tokens);

        let response = self.client.chat(&request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(AiError::EmptyResponse("chat completion"))?;

        Ok(ChatAnswer {
            content,
            citations: response.citations,
        })
    }

    /// Speech-to-English text for an audio file (`/audio/translations`).
    pub async fn translate_audio(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read audio file {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.mp3".to_string());

        let response = self
            .client
            .audio_text("translations", &self.model, file_name, bytes)
            .await?;

        Ok(response.text.trim().to_string())
    }
}
