//! Cloud proxy backend (§4.3, §6): same external `Generate` contract as the
//! local backend, translated internally to an OpenAI-compatible
//! `/v1/chat/completions` call toward whichever of deepseek/openai/
//! openrouter has credentials in the environment.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

use super::client::{GenerateOptions, LlmGenerator};
use super::rate_limiter::CallRateLimiter;

#[derive(Debug, Clone, Copy)]
enum Provider {
    DeepSeek,
    OpenAi,
    OpenRouter,
}

impl Provider {
    fn base_url(self) -> &'static str {
        match self {
            Provider::DeepSeek => "https://api.deepseek.com",
            Provider::OpenAi => "https://api.openai.com",
            Provider::OpenRouter => "https://openrouter.ai/api",
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    response_format: ResponseFormat<'a>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

pub struct CloudProxyBackend {
    provider: Provider,
    api_key: String,
    client: Client,
    limiter: CallRateLimiter,
}

impl CloudProxyBackend {
    /// Reads credentials from the environment, preferring `DEEPSEEK_API_KEY`,
    /// then `OPENAI_API_KEY`, then `OPENROUTER_API_KEY` (§6).
    /// `calls_per_minute` bounds this backend's own call schedule (§4.3); see
    /// [`crate::config::ModelConfig::calls_per_minute`].
    pub fn from_env(connect_timeout: Duration, read_timeout: Duration, calls_per_minute: u32) -> anyhow::Result<Self> {
        let (provider, api_key) = if let Ok(key) = std::env::var("DEEPSEEK_API_KEY") {
            (Provider::DeepSeek, key)
        } else if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            (Provider::OpenAi, key)
        } else if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
            (Provider::OpenRouter, key)
        } else {
            anyhow::bail!("no cloud LLM credentials found (DEEPSEEK_API_KEY, OPENAI_API_KEY, or OPENROUTER_API_KEY)");
        };

        let client = Client::builder().connect_timeout(connect_timeout).timeout(read_timeout).build()?;
        Ok(Self { provider, api_key, client, limiter: CallRateLimiter::per_minute(calls_per_minute) })
    }
}

impl LlmGenerator for CloudProxyBackend {
    fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, LlmError> {
        self.limiter.wait();
        let url = format!("{}/v1/chat/completions", self.provider.base_url());
        let body = ChatRequest {
            model: &options.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            stream: false,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self.client.post(&url).bearer_auth(&self.api_key).json(&body).send()?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Upstream { status, body });
        }

        let parsed: ChatResponse = response.json().map_err(LlmError::Transport)?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Schema("no choices in chat completion response".to_string()))
    }
}
