//! OpenAI API client implementing the text-generation port
//!
//! No retry logic lives here; the next scheduled run is the retry
//! mechanism, and callers fall back to deterministic recommendations when
//! a request fails.

use async_trait::async_trait;
use macroplan_core::recommendations::ports::TextGenerator;
use macroplan_domain::{MacroPlanError, Result};
use tracing::{debug, info};

use crate::errors::InfraError;

use super::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TEMPERATURE: f32 = 0.6;
const SYSTEM_PROMPT: &str = "You are a pragmatic nutrition coach inside a meal-tracking app. \
                             Keep answers short, concrete, and free of medical claims.";

/// OpenAI API client for generating recommendation text
pub struct OpenAIClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
}

impl OpenAIClient {
    /// Create a new OpenAI client
    pub fn new(api_key: String) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            api_url: OPENAI_API_URL.to_string(),
        }
    }

    /// Create a new client with a custom model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Create a new client with a custom API URL (for testing)
    #[cfg(test)]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

#[async_trait]
impl TextGenerator for OpenAIClient {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        debug!(model = %self.model, prompt_len = prompt.len(), "Calling text generation API");

        let payload = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage { role: "system".to_string(), content: SYSTEM_PROMPT.to_string() },
                ChatMessage { role: "user".to_string(), content: prompt.to_string() },
            ],
            max_tokens,
            temperature: DEFAULT_TEMPERATURE,
        };

        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(InfraError::from)
            .map_err(MacroPlanError::from)?
            .error_for_status()
            .map_err(InfraError::from)
            .map_err(MacroPlanError::from)?;

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| MacroPlanError::Network(format!("invalid generation response: {e}")))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                MacroPlanError::Network("generation response contained no choices".into())
            })?;

        if let Some(usage) = body.usage {
            info!(tokens = usage.total_tokens, "Text generation complete");
        }

        Ok(content)
    }
}
