//! Local backend (§4.3, §6): `POST /api/generate` against a configurable
//! host, Ollama's wire shape. `reqwest::blocking` matches the teacher's
//! synchronous style and §5's "the LLM call is blocking" design note.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

use super::client::{GenerateOptions, LlmGenerator};
use super::rate_limiter::CallRateLimiter;

#[derive(Serialize)]
struct LocalRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'a str,
}

#[derive(Deserialize)]
struct LocalResponse {
    response: String,
}

pub struct LocalBackend {
    host: String,
    client: Client,
    limiter: CallRateLimiter,
}

impl LocalBackend {
    /// `calls_per_minute` bounds this backend's own call schedule (§4.3); see
    /// [`crate::config::ModelConfig::calls_per_minute`].
    pub fn new(host: impl Into<String>, connect_timeout: Duration, read_timeout: Duration, calls_per_minute: u32) -> anyhow::Result<Self> {
        let client = Client::builder().connect_timeout(connect_timeout).timeout(read_timeout).build()?;
        Ok(Self { host: host.into(), client, limiter: CallRateLimiter::per_minute(calls_per_minute) })
    }
}

impl LlmGenerator for LocalBackend {
    fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, LlmError> {
        self.limiter.wait();
        let url = format!("{}/api/generate", self.host.trim_end_matches('/'));
        let body = LocalRequest {
            model: &options.model,
            prompt,
            stream: false,
            format: "json",
        };

        let response = self.client.post(&url).json(&body).send()?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Upstream { status, body });
        }

        let parsed: LocalResponse = response.json().map_err(LlmError::Transport)?;
        if parsed.response.is_empty() {
            return Err(LlmError::Upstream { status: 200, body: "empty `response` field".to_string() });
        }
        Ok(parsed.response)
    }
}
