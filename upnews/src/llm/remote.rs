use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{prompts, ContentGenerator, LlmResponse, PromptKind, UsageMetadata};
use crate::news::NewsItem;

/// Content generator backed by an OpenAI-compatible chat completion API
pub struct RemoteGenerator {
    base_url: String,
    api_key: String,
    model: String,
    default_timeout: Duration,
    default_max_tokens: usize,
    default_temperature: f32,
    client: reqwest::Client,
}

impl RemoteGenerator {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            default_timeout: Duration::from_secs(60),
            default_max_tokens: 1500,
            default_temperature: 0.7,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_defaults(
        mut self,
        timeout_secs: u64,
        max_tokens: usize,
        temperature: f32,
    ) -> Self {
        self.default_timeout = Duration::from_secs(timeout_secs);
        self.default_max_tokens = max_tokens;
        self.default_temperature = temperature;
        self
    }

    /// Build a generator from the `[generator]` config section, reading the API key
    /// from the configured environment variable.
    pub fn from_config(config: &common::GeneratorConfig) -> Result<Self> {
        let api_url = config
            .api_url
            .clone()
            .context("generator.api_url is not configured")?;
        let key_env = config.api_key_env.as_deref().unwrap_or("LLM_API_KEY");
        let api_key = std::env::var(key_env)
            .with_context(|| format!("environment variable {} is not set", key_env))?;
        let model = config.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string());

        Ok(Self::new(api_url, api_key, model).with_defaults(
            config.timeout_seconds.unwrap_or(60),
            config.max_tokens.unwrap_or(1500),
            config.temperature.unwrap_or(0.7),
        ))
    }

    /// Send one prompt with the generator's timeout, token limit and temperature.
    pub async fn complete(&self, prompt: impl Into<String>) -> Result<LlmResponse> {
        let req_body = OpenAiRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.into(),
            }],
            max_tokens: Some(self.default_max_tokens),
            temperature: Some(self.default_temperature),
        };

        let response = tokio::time::timeout(
            self.default_timeout,
            self.client
                .post(&self.base_url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&req_body)
                .send(),
        )
        .await
        .context("LLM request timed out")?
        .context("LLM HTTP request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM API error {}: {}", status, body);
        }

        let resp_body: OpenAiResponse = response
            .json()
            .await
            .context("Failed to parse LLM response")?;

        let choice = resp_body
            .choices
            .first()
            .context("LLM response has no choices")?;

        let usage = resp_body
            .usage
            .map(|u| UsageMetadata {
                prompt_tokens: u.prompt_tokens.unwrap_or(0),
                completion_tokens: u.completion_tokens.unwrap_or(0),
                total_tokens: u.total_tokens.unwrap_or(0),
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content: choice.message.content.clone(),
            usage,
            model: resp_body.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

#[async_trait::async_trait]
impl ContentGenerator for RemoteGenerator {
    async fn generate(&self, item: &NewsItem, kind: PromptKind) -> Result<String> {
        let response = self.complete(prompts::render(kind, item)).await?;
        debug!(
            model = %response.model,
            prompt = %kind,
            total_tokens = response.usage.total_tokens,
            "article generated"
        );
        if response.content.trim().is_empty() {
            anyhow::bail!("LLM returned empty content");
        }
        Ok(response.content)
    }
}

// OpenAI API request/response structures
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<usize>,
    #[serde(default)]
    completion_tokens: Option<usize>,
    #[serde(default)]
    total_tokens: Option<usize>,
}
