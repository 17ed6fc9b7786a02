//! The single textual I/O surface every LLM consumer in C4/C5/C7 calls
//! through (§4.3). Two backends ([`crate::llm::local::LocalBackend`],
//! [`crate::llm::proxy::CloudProxyBackend`]) implement it; tests inject a
//! fake — the same "instantiable per agent instance" design note the
//! teacher applies to its own `Game`/`GameFactory` boundary (§9).

use std::time::Duration;

use crate::error::LlmError;

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub model: String,
    pub format_json: bool,
    pub temperature: f64,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl GenerateOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            format_json: true,
            temperature: 0.7,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(15),
        }
    }
}

pub trait LlmGenerator: Send + Sync {
    /// Blocking, single-request call (§4.3 "blocking, single-request-at-a-
    /// time façade"). Returns the raw response text; callers own parsing.
    fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, LlmError>;
}
