//! Core data model shared by the orchestrator and leaderboard (§3): agent
//! identity, matchups, game outcomes, and derived scores.
//!
//! [`AgentIdentity`]'s per-matchup log file numbering is a direct
//! generalization of the teacher's `Agent` (`match_number: AtomicUsize`,
//! `create_new_match_log_file`): here it numbers the stderr logs persisted
//! per §4.1 ("stderr is preserved in per-game logs").

use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identifies one competing agent across a `BenchmarkRun`.
///
/// `(display_name, agent_architecture)` is the leaderboard dedup key (§3,
/// §4.2), so both fields are carried everywhere an agent is referenced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub display_name: String,
    pub agent_architecture: String,
    #[serde(skip)]
    log_dir: Option<PathBuf>,
    #[serde(skip)]
    match_number: std::sync::Arc<AtomicUsize>,
}

impl PartialEq for AgentIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.display_name == other.display_name && self.agent_architecture == other.agent_architecture
    }
}
impl Eq for AgentIdentity {}

impl std::hash::Hash for AgentIdentity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.display_name.hash(state);
        self.agent_architecture.hash(state);
    }
}

impl AgentIdentity {
    pub fn new(display_name: impl Into<String>, agent_architecture: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            agent_architecture: agent_architecture.into(),
            log_dir: None,
            match_number: std::sync::Arc::new(AtomicUsize::new(1)),
        }
    }

    pub fn with_log_dir(mut self, dir: PathBuf) -> Self {
        self.log_dir = Some(dir);
        self
    }

    /// Creates the next numbered stderr log file for this agent, if logging
    /// is enabled. Returns `None` when no log directory was configured.
    pub fn create_stderr_log_file(&self) -> Option<File> {
        let dir = self.log_dir.as_ref()?;
        let id = self.match_number.fetch_add(1, Ordering::Relaxed);
        let path = dir.join(format!("{}_match_{id}_stderr.txt", self.display_name));
        File::create(&path).ok()
    }
}

/// A named reference opponent with its elimination weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpponentSpec {
    pub name: String,
    pub weight: f64,
}

/// A planned game: immutable once scheduled by C1 (§3).
#[derive(Debug, Clone)]
pub struct Matchup {
    pub agent: AgentIdentity,
    pub opponent: OpponentSpec,
    pub map: String,
    pub tick_cap: u32,
    pub wall_clock_budget: Duration,
    pub game_index: usize,
}

/// The result of one matchup (§3). `result` never includes extra states —
/// exactly the five the spec enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Win,
    Draw,
    Loss,
    Timeout,
    Crash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameOutcome {
    pub result: OutcomeKind,
    pub ticks: u32,
    /// Which side (0 or 1) won; `None` for draw/timeout/crash.
    pub winner_side: Option<usize>,
    pub crash_reason: Option<String>,
}

impl GameOutcome {
    pub fn timeout(ticks_observed: u32) -> Self {
        Self {
            result: OutcomeKind::Timeout,
            ticks: ticks_observed,
            winner_side: None,
            crash_reason: None,
        }
    }

    pub fn crash(reason: impl Into<String>) -> Self {
        Self {
            result: OutcomeKind::Crash,
            ticks: 0,
            winner_side: None,
            crash_reason: Some(reason.into()),
        }
    }
}

/// A derived score for one matchup: weighted points plus the efficiency
/// bonus, per §3's "Score" definition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub weighted_points: f64,
}
