//! Typed error variants for the pieces of the system whose callers need to
//! match on a closed taxonomy (§7 of the spec), rather than just bubble a
//! human-readable message.

use thiserror::Error;

/// Errors raised by the LLM client/proxy layer (C3).
///
/// The transport/parse split mirrors the error taxonomy table: transport
/// errors bump the caller's consecutive-failure counter, parse errors are
/// treated as a refresh miss that leaves the cache untouched.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("no JSON object found in response")]
    NoJsonObject,

    #[error("malformed response shape: {0}")]
    Schema(String),
}

/// Errors that can end an MCTS search iteration early without panicking or
/// relying on exceptions-as-control-flow (§9's "exception for control flow"
/// note): the outer budget loop matches on this and exits cleanly.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("no legal action available at this node")]
    NoLegalActions,
}

/// Errors raised while spawning, monitoring, or reaping a game-runner child
/// process (C1).
#[derive(Debug, Error)]
pub enum ChildRunnerError {
    #[error("failed to spawn child process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed to read child output: {0}")]
    Io(#[source] std::io::Error),
}

/// Configuration errors, which per §7 fail the whole tournament fast,
/// before any matchup runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown agent class '{0}'")]
    UnknownAgentClass(String),

    #[error("invalid plan: {0}")]
    InvalidPlan(String),
}
