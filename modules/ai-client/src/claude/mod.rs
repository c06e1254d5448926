mod client;
pub(crate) mod types;

use anyhow::Result;

use crate::error::AiError;
use crate::schema::StructuredOutput;
use client::ClaudeClient;
use types::*;

const STRUCTURED_TOOL: &str = "structured_response";

/// Claude handle. Cheap to clone; the underlying HTTP pool is shared.
#[derive(Clone)]
pub struct Claude {
    model: String,
    client: ClaudeClient,
    temperature: f32,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            client: ClaudeClient::new(&api_key.into()),
            temperature: 0.0,
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            AiError::Config("ANTHROPIC_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key, model))
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

    /// Force a typed response through a single tool call.
    pub async fn extract<T: StructuredOutput>(
        &self,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Result<T> {
        let request = ChatRequest::new(&self.model)
            .system(system_prompt)
            .message(WireMessage::user(user_prompt))
            .temperature(self.temperature)
            .forced_tool(ToolDefinitionWire {
                name: STRUCTURED_TOOL.to_string(),
                description: "Return the structured result for the input.".to_string(),
                input_schema: T::strict_schema(),
            });

        let response = self.client.chat(&request).await?;

        let input = response
            .tool_input()
            .ok_or(AiError::EmptyResponse("Claude structured output"))?;

        serde_json::from_value(input.clone()).map_err(|e| {
            AiError::Parse(format!("{} from Claude: {e}", T::type_name())).into()
        })
    }

    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .system(system)
            .message(WireMessage::user(user))
            .temperature(self.temperature);

        let response = self.client.chat(&request).await?;

        Ok(response
            .text()
            .ok_or(AiError::EmptyResponse("Claude"))?)
    }
}
