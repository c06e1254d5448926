mod client;
pub(crate) mod types;

use anyhow::Result;
use base64::Engine;

use crate::error::AiError;
use client::GeminiClient;
use types::*;

/// Binary media sent inline with a prompt.
#[derive(Debug, Clone)]
pub struct InlineMedia {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Gemini handle. Used where the input is video, which the other providers
/// do not accept inline.
#[derive(Clone)]
pub struct Gemini {
    model: String,
    client: GeminiClient,
    temperature: f32,
}

impl Gemini {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            client: GeminiClient::new(&api_key.into()),
            temperature: 0.1,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.client = self.client.with_base_url(&url.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a prompt plus inline media and ask for a JSON answer.
    /// Returns the raw text; callers own parsing and validation.
    pub async fn generate_json(&self, prompt: &str, media: Option<&InlineMedia>) -> Result<String> {
        let mut parts = vec![Part::text(prompt)];
        if let Some(media) = media {
            let encoded = base64::engine::general_purpose::STANDARD.encode(&media.bytes);
            parts.push(Part::inline(&media.mime_type, encoded));
        }

        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: Some(GenerationConfig {
                temperature: self.temperature,
                response_mime_type: Some("application/json".to_string()),
            }),
        };

        let response = self.client.generate(&self.model, &request).await?;

        Ok(response.text().ok_or(AiError::EmptyResponse("Gemini"))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_new() {
        let ai = Gemini::new("key", "gemini-2.5-flash");
        assert_eq!(ai.model(), "gemini-2.5-flash");
        assert_eq!(ai.temperature, 0.1);
    }
}
