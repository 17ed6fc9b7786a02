//! C3: the LLM client/proxy/rate-limiter layer (§4.3). One [`LlmGenerator`]
//! trait, two real backends (local Ollama-style, cloud proxy) that each
//! enforce their own [`rate_limiter::CallRateLimiter`] before every call, a
//! shared JSON-extraction helper, and a degraded-channel fallback.

pub mod client;
pub mod fallback;
pub mod json_extract;
pub mod local;
pub mod proxy;
pub mod rate_limiter;

pub use client::{GenerateOptions, LlmGenerator};
pub use fallback::DegradedChannel;
pub use rate_limiter::CallRateLimiter;
