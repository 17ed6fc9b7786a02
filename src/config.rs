//! Configuration for arena behaviors.
//!
//! Mirrors the teacher's `Configuration` builder: programmatic construction
//! via [`ArenaConfig::new`], or environment-variable driven construction via
//! [`ArenaConfig::from_env`]. No module-level mutable state is used anywhere
//! in this crate (§9 "Global state" design note) — every tunable lives on a
//! config value threaded through constructors.
//!
//! # Environment Variables
//!
//! - `ARENA_VERBOSE` — print per-matchup progress to stdout (default: `true`)
//! - `ARENA_LOG_DIR` — enable file logging to the given directory
//! - `ARENA_MAX_PARALLEL` — max matchups run concurrently (default: `1`,
//!   because a single LLM backend is shared — see §5; clamped to the
//!   machine's physical core count)
//! - `MODEL_HOST` — local LLM backend host (default `http://localhost:11434`)
//! - `MODEL_NAME` — model name used by player 1 (required to use an LLM agent)
//! - `MODEL_NAME_P2` — optional override for player 2's model
//! - `LLM_CALLS_PER_MINUTE` — rate-limit cap for backends built from
//!   `ModelConfig` (default: `20`)
//! - `MCTS_PRIOR_CACHE_TICKS`, `MCTS_GOAL_CACHE_TICKS` — C4 refresh intervals
//! - `HYBRID_INTERVAL_TICKS`, `HYBRID_COMBAT_INTERVAL_TICKS` — C7 intervals

use std::path::PathBuf;
use std::time::Duration;

/// Upper bound for [`ArenaConfig::max_parallel`]. Physical cores, not logical:
/// the teacher's `constraints::AutoCpus::Auto` picks the same count because
/// hyperthreads don't carry independent game-runner throughput.
fn max_physical_parallelism() -> usize {
    num_cpus::get_physical().max(1)
}

/// Top-level configuration for the tournament orchestrator (C1).
#[derive(Debug, Clone)]
pub struct ArenaConfig {
    pub verbose: bool,
    pub log_dir: Option<PathBuf>,
    pub max_parallel: usize,
    pub artifact_dir: PathBuf,
}

impl ArenaConfig {
    pub fn new() -> Self {
        Self {
            verbose: true,
            log_dir: None,
            max_parallel: 1,
            artifact_dir: PathBuf::from("artifacts"),
        }
    }

    pub fn from_env() -> Self {
        fn get_env_flag(var: &str, default: bool) -> bool {
            match std::env::var(var) {
                Ok(val) => val.eq_ignore_ascii_case("true"),
                Err(_) => default,
            }
        }

        let log_dir = std::env::var("ARENA_LOG_DIR")
            .ok()
            .map(PathBuf::from)
            .filter(|p| p.is_dir());

        let max_parallel = std::env::var("ARENA_MAX_PARALLEL")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(|v: usize| v.min(max_physical_parallelism()))
            .unwrap_or(1);

        Self {
            verbose: get_env_flag("ARENA_VERBOSE", true),
            log_dir,
            max_parallel,
            ..Self::new()
        }
    }

    pub fn with_verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    pub fn with_log<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.log_dir = Some(path.into());
        self
    }

    /// Clamped to the machine's physical core count, the same bound the
    /// teacher's `AutoCpus::Auto` uses: oversubscribing logical cores tanks
    /// per-agent throughput when every matchup runs its own game process.
    pub fn with_max_parallel(mut self, value: usize) -> Self {
        self.max_parallel = value.max(1).min(max_physical_parallelism());
        self
    }

    pub fn with_artifact_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.artifact_dir = path.into();
        self
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for reaching the LLM backend used by C4/C7 agents (C3).
///
/// Never a global: each agent instance owns one, so tests can point it at a
/// fake server or swap in a fake [`crate::llm::LlmGenerator`] entirely.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub host: String,
    pub model_name: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Upper bound on calls/minute a backend built from this config will
    /// allow through its [`crate::llm::rate_limiter::CallRateLimiter`] (§4.3
    /// "rate-limit-aware call schedule").
    pub calls_per_minute: u32,
}

impl ModelConfig {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            model_name: model_name.into(),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(15),
            calls_per_minute: 20,
        }
    }

    /// Reads `MODEL_HOST` (default `http://localhost:11434`), `MODEL_NAME`
    /// (required), and `LLM_CALLS_PER_MINUTE` (default `20`). `player`
    /// selects between `MODEL_NAME` (player 0) and the optional
    /// `MODEL_NAME_P2` override (player 1).
    pub fn from_env(player: usize) -> anyhow::Result<Self> {
        let host = std::env::var("MODEL_HOST").unwrap_or_else(|_| "http://localhost:11434".into());
        let model_name = if player == 1 {
            std::env::var("MODEL_NAME_P2").or_else(|_| std::env::var("MODEL_NAME"))
        } else {
            std::env::var("MODEL_NAME")
        }
        .map_err(|_| anyhow::anyhow!("MODEL_NAME is required"))?;
        let calls_per_minute = std::env::var("LLM_CALLS_PER_MINUTE").ok().and_then(|v| v.parse().ok()).unwrap_or(20);

        Ok(Self {
            host,
            model_name,
            calls_per_minute,
            ..Self::new("")
        })
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }
}

/// Tunables for the LLM-guided MCTS search (C4). Kept as plain configuration
/// rather than module statics, per §9.
#[derive(Debug, Clone, Copy)]
pub struct SearchBudget {
    pub turn_budget: Duration,
    pub iteration_cap: Option<usize>,
    pub rollout_ticks: u32,
    pub epsilon_0: f64,
    pub epsilon_local: f64,
    pub epsilon_global: f64,
    pub prior_cache_ticks: u32,
    pub goal_cache_ticks: u32,
}

impl SearchBudget {
    pub fn new() -> Self {
        Self {
            turn_budget: Duration::from_millis(200),
            iteration_cap: None,
            rollout_ticks: 100,
            epsilon_0: 0.05,
            epsilon_local: 0.5,
            epsilon_global: 0.5,
            prior_cache_ticks: 300,
            goal_cache_ticks: 500,
        }
    }

    pub fn from_env() -> Self {
        fn parse_env<T: std::str::FromStr>(var: &str, default: T) -> T {
            std::env::var(var).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
        }

        let mut budget = Self::new();
        budget.prior_cache_ticks = parse_env("MCTS_PRIOR_CACHE_TICKS", budget.prior_cache_ticks);
        budget.goal_cache_ticks = parse_env("MCTS_GOAL_CACHE_TICKS", budget.goal_cache_ticks);
        budget
    }

    pub fn with_turn_budget(mut self, d: Duration) -> Self {
        self.turn_budget = d;
        self
    }
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self::new()
    }
}

/// Tunables for the hybrid strategy agent's LLM-driven state transitions (C7).
#[derive(Debug, Clone, Copy)]
pub struct HybridTiming {
    pub base_interval_ticks: u32,
    pub combat_interval_ticks: u32,
}

impl HybridTiming {
    pub fn new() -> Self {
        Self {
            base_interval_ticks: 200,
            combat_interval_ticks: 100,
        }
    }

    pub fn from_env() -> Self {
        fn parse_env(var: &str, default: u32) -> u32 {
            std::env::var(var).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
        }
        Self {
            base_interval_ticks: parse_env("HYBRID_INTERVAL_TICKS", 200),
            combat_interval_ticks: parse_env("HYBRID_COMBAT_INTERVAL_TICKS", 100),
        }
    }
}

impl Default for HybridTiming {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_parallel_is_clamped_to_physical_cores() {
        let huge = max_physical_parallelism() + 1000;
        let cfg = ArenaConfig::new().with_max_parallel(huge);
        assert_eq!(cfg.max_parallel, max_physical_parallelism());
    }

    #[test]
    fn max_parallel_floor_is_one() {
        let cfg = ArenaConfig::new().with_max_parallel(0);
        assert_eq!(cfg.max_parallel, 1);
    }
}
