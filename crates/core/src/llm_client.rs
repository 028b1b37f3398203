//! LLM Gateway
//!
//! A single prompt-in, text-out call to an external completion service. The
//! [`LLMClient`] trait is the transport seam; [`LlmGateway`] wraps it with the
//! one layer of error handling the simulation relies on: any failure is
//! logged and replaced with [`FALLBACK_TEXT`], so a flaky service never stops
//! the simulated day.

use anyhow::{Context, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error};

/// Text substituted for any failed completion.
pub const FALLBACK_TEXT: &str = "An error occurred while processing your request.";

/// Sampling parameters sent with every completion request.
///
/// Exactly one choice is requested per call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 150,
            temperature: 0.7,
        }
    }
}

/// A generic client for a text-completion LLM.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Sends `prompt` as a single user message and returns the generated text.
    async fn complete(&self, prompt: &str, config: &ModelConfig) -> Result<String>;
}

/// An implementation of `LLMClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            client: Client::with_config(config),
        }
    }
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    #[allow(deprecated)]
    async fn complete(&self, prompt: &str, config: &ModelConfig) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&config.model)
            .messages(vec![
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()?
                    .into(),
            ])
            .max_tokens(config.max_tokens)
            .temperature(config.temperature)
            .n(1u8)
            .build()?;

        let response = self.client.chat().create(request).await?;

        let content = response
            .choices
            .first()
            .context("No response choice from LLM")?
            .message
            .content
            .as_ref()
            .context("No content in LLM response")?;

        Ok(content.clone())
    }
}

/// The simulation's only door to the LLM.
///
/// Calls are awaited one at a time; the gateway never surfaces an error to
/// its caller.
pub struct LlmGateway {
    client: Arc<dyn LLMClient>,
    model: ModelConfig,
    failures: usize,
}

impl LlmGateway {
    pub fn new(client: Arc<dyn LLMClient>, model: ModelConfig) -> Self {
        Self {
            client,
            model,
            failures: 0,
        }
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    /// Number of calls that ended in the fallback text so far.
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Returns the trimmed completion for `prompt`, or [`FALLBACK_TEXT`] if
    /// the service fails for any reason.
    pub async fn query(&mut self, prompt: &str) -> String {
        debug!(model = %self.model.model, prompt_len = prompt.len(), "Querying LLM");
        match self.client.complete(prompt, &self.model).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                self.failures += 1;
                error!(error = ?e, "OpenAI API error");
                FALLBACK_TEXT.to_string()
            }
        }
    }
}
