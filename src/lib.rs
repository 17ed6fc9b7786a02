//! # rts-arena-bench
//!
//! A benchmark arena orchestrator and LLM-guided agent core for an RTS game
//! simulator treated as an external collaborator.
//!
//! It provides:
//! - a single-elimination [`orchestrator`] that runs many (agent × opponent ×
//!   map) matchups as isolated child processes under wall-clock budgets;
//! - a cross-run [`leaderboard`] consolidator;
//! - an [`llm`] client/proxy/rate-limiter layer shared by both agent cores;
//! - an epsilon-greedy informed-[`mcts`] agent biased by a situation-indexed
//!   [`policy`] prior and scored by the strategic [`evaluation`] function;
//! - a lightweight [`hybrid`] rule-strategy agent for when lookahead isn't
//!   affordable.
//!
//! The RTS rules engine itself is out of scope (§1): this crate only depends
//! on the [`rts::RtsState`] boundary trait, implemented by whatever
//! simulator a deployment links in.
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use rts_arena_bench::agent::{AgentIdentity, OpponentSpec};
//! use rts_arena_bench::config::{ArenaConfig, ModelConfig};
//! use rts_arena_bench::orchestrator::child_runner::ProcessChildRunner;
//! use rts_arena_bench::orchestrator::{run_tournament, TournamentPlan};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ArenaConfig::from_env();
//!     let model = ModelConfig::from_env(0)?;
//!     let runner = Arc::new(ProcessChildRunner::new("./game-runner"));
//!
//!     let plan = TournamentPlan {
//!         run_id: "run-1".into(),
//!         agents: vec![AgentIdentity::new("MyAgent", "hybrid")],
//!         ladder: vec![OpponentSpec { name: "Easy".into(), weight: 10.0 }],
//!         map: "arena".into(),
//!         tick_cap: 1500,
//!         wall_clock_budget: Duration::from_secs(30),
//!     };
//!
//!     let run = run_tournament(&plan, &config, &model, None, runner);
//!     run.write_json(&config.artifact_dir)?;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod hybrid;
pub mod leaderboard;
pub mod llm;
pub mod logging;
pub mod mcts;
pub mod orchestrator;
pub mod policy;
pub mod rts;

/// Commonly used types for quick access.
///
/// ```
/// use rts_arena_bench::prelude::*;
/// ```
pub mod prelude {
    pub use crate::agent::{AgentIdentity, GameOutcome, Matchup, OpponentSpec, OutcomeKind, Score};
    pub use crate::config::{ArenaConfig, HybridTiming, ModelConfig, SearchBudget};
    pub use crate::evaluation::{StrategicGoal, StrategicGoals, TargetPriority};
    pub use crate::hybrid::HybridAgent;
    pub use crate::leaderboard::{consolidate, Leaderboard};
    pub use crate::llm::{GenerateOptions, LlmGenerator};
    pub use crate::mcts::McAgent;
    pub use crate::orchestrator::{run_tournament, TournamentPlan};
    pub use crate::rts::{PlayerAction, RtsFactory, RtsState, Unit, UnitAction};
}
