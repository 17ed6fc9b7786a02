//! Benchmark-run artifacts: a JSON record for machines and a Markdown table
//! for humans, written atomically so a crash mid-write can't corrupt a run
//! a later invocation would try to resume (§4.1).
//!
//! The JSON shape is a fixed external contract (§6) consumed by the
//! leaderboard consolidator and the static leaderboard web page, so field
//! names here are not free to drift: `entries[].opponents` is a map keyed by
//! opponent name rather than the ordered match-by-match list an earlier
//! draft of this module used, and every struct carries a `#[serde(flatten)]`
//! catch-all so a round-trip through `load`/`write_json` never drops a field
//! this crate doesn't itself know about (§6 "unknown fields are preserved on
//! round-trip", §8).

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::agent::{AgentIdentity, OutcomeKind};
use crate::leaderboard::Grade;
use crate::orchestrator::scheduler::PlayedMatchup;

/// Aggregated head-to-head record against one opponent (§6 schema).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpponentRecord {
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub draws: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub weighted_points: f64,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl OpponentRecord {
    /// A clean win and nothing else — the only state that keeps an
    /// elimination run alive past this opponent.
    pub fn is_win(&self) -> bool {
        self.wins > 0 && self.draws == 0 && self.losses == 0
    }
}

/// One agent's result for a run (§6 schema): `opponents` maps opponent name
/// to its aggregated record, so repeated games against the same opponent
/// (`games_per_matchup>1`, not implemented here — see `DESIGN.md`) would
/// accumulate rather than overwrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRunRecord {
    pub display_name: String,
    pub agent_architecture: String,
    pub opponents: HashMap<String, OpponentRecord>,
    pub score: f64,
    pub grade: String,
    /// `"cleared all"` once every ladder opponent was beaten, otherwise the
    /// name of the opponent that ended the run (§6 schema).
    #[serde(default)]
    pub eliminated_at: String,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Folds freshly-played matchups into `opponents`, summing per-opponent
/// counters so resuming a run never discards what a prior invocation already
/// recorded against the same opponent.
fn accumulate_opponents(opponents: &mut HashMap<String, OpponentRecord>, played: &[PlayedMatchup]) {
    for p in played {
        let rec = opponents.entry(p.opponent.name.clone()).or_default();
        match p.outcome.result {
            OutcomeKind::Win => rec.wins += 1,
            OutcomeKind::Draw => rec.draws += 1,
            OutcomeKind::Loss | OutcomeKind::Timeout | OutcomeKind::Crash => rec.losses += 1,
        }
        rec.weighted_points += p.score.weighted_points;
    }
}

/// `"cleared all"` if every ladder opponent, in order, has a clean win
/// recorded; otherwise the name of the ladder opponent the run stopped at.
/// Elimination always plays a contiguous ladder prefix (§3), so the played
/// count alone locates that opponent without needing play order.
fn eliminated_at_label(opponents: &HashMap<String, OpponentRecord>, ladder: &[crate::agent::OpponentSpec]) -> String {
    if opponents.is_empty() {
        return "not started".to_string();
    }
    let count = opponents.len().min(ladder.len());
    let all_wins = ladder.iter().take(count).all(|o| opponents.get(&o.name).is_some_and(|r| r.is_win()));
    if count >= ladder.len() && all_wins {
        "cleared all".to_string()
    } else {
        ladder.get(count - 1).map(|o| o.name.clone()).unwrap_or_else(|| "not started".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRun {
    pub run_id: String,
    /// Preserved verbatim by the leaderboard consolidator (§4.2 versioning);
    /// runs written by a different arena version are never directly compared.
    #[serde(default = "current_arena_version")]
    pub arena_version: String,
    pub generated: String,
    pub map: String,
    pub tick_cap: u32,
    /// Always 1 in this implementation — single-elimination advances on a
    /// plain win, not a best-of-N majority (§4.1's `games_per_pair>1`
    /// majority-vote path is out of scope here; see `DESIGN.md`).
    #[serde(default = "one")]
    pub games_per_matchup: u32,
    pub entries: Vec<AgentRunRecord>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

fn one() -> u32 {
    1
}

fn current_arena_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl BenchmarkRun {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            arena_version: current_arena_version(),
            generated: now_iso8601(),
            map: String::new(),
            tick_cap: 0,
            games_per_matchup: 1,
            entries: Vec::new(),
            extra: HashMap::new(),
        }
    }

    pub fn with_map(mut self, map: impl Into<String>) -> Self {
        self.map = map.into();
        self
    }

    pub fn with_tick_cap(mut self, tick_cap: u32) -> Self {
        self.tick_cap = tick_cap;
        self
    }

    /// Replaces (or inserts) one agent's recorded opponents wholesale. Use
    /// [`BenchmarkRun::append_matchups`] instead when resuming a run, so
    /// matchups recorded by a prior invocation aren't discarded.
    pub fn upsert_agent(&mut self, agent: &AgentIdentity, played: &[PlayedMatchup], ladder: &[crate::agent::OpponentSpec]) {
        let mut opponents = HashMap::new();
        accumulate_opponents(&mut opponents, played);
        let record = build_record(agent, opponents, ladder);

        if let Some(existing) = self.entries.iter_mut().find(|a| is_same_agent(a, agent)) {
            *existing = record;
        } else {
            self.entries.push(record);
        }
    }

    /// Appends matchups played in this invocation onto whatever a prior
    /// invocation already recorded for `agent` (§4.1 resumability).
    pub fn append_matchups(&mut self, agent: &AgentIdentity, played: &[PlayedMatchup], ladder: &[crate::agent::OpponentSpec]) {
        if let Some(existing) = self.entries.iter_mut().find(|a| is_same_agent(a, agent)) {
            accumulate_opponents(&mut existing.opponents, played);
            existing.score = existing.opponents.values().map(|o| o.weighted_points).sum();
            existing.grade = Grade::from_score(existing.score).label().to_string();
            existing.eliminated_at = eliminated_at_label(&existing.opponents, ladder);
        } else {
            self.upsert_agent(agent, played, ladder);
        }
    }

    pub fn agent_record(&self, agent: &AgentIdentity) -> Option<&AgentRunRecord> {
        self.entries.iter().find(|a| is_same_agent(a, agent))
    }

    /// How many ladder opponents were already recorded for `agent`, used to
    /// skip replaying matchups a prior, interrupted invocation already
    /// completed (§4.1 resumability).
    pub fn already_played(&self, agent: &AgentIdentity) -> usize {
        self.agent_record(agent).map(|a| a.opponents.len()).unwrap_or(0)
    }

    /// Writes `run.json`: serialize to a temp file, then rename over the
    /// final path. The rename is atomic on the same filesystem, so a reader
    /// (or a resumed run) never observes a half-written file. Refreshes
    /// `generated` to the write time, matching the leaderboard's own
    /// "generated" semantics (§6).
    pub fn write_json(&mut self, dir: &Path) -> io::Result<PathBuf> {
        self.generated = now_iso8601();
        let path = dir.join("run.json");
        let tmp = dir.join("run.json.tmp");
        let body = serde_json::to_string_pretty(self).expect("BenchmarkRun always serializes");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &path)?;
        Ok(path)
    }

    pub fn write_markdown(&self, dir: &Path) -> io::Result<PathBuf> {
        let path = dir.join("run.md");
        let tmp = dir.join("run.md.tmp");
        fs::write(&tmp, self.render_markdown())?;
        fs::rename(&tmp, &path)?;
        Ok(path)
    }

    fn render_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# Benchmark run {}\n\n", self.run_id));
        out.push_str(&format!("generated: {}\n\n", self.generated));
        out.push_str("| Agent | Architecture | Opponents beaten | Score | Grade |\n");
        out.push_str("|---|---|---|---|---|\n");
        for entry in &self.entries {
            let beaten = entry.opponents.values().filter(|o| o.is_win()).count();
            out.push_str(&format!(
                "| {} | {} | {}/{} | {:.2} | {} |\n",
                entry.display_name,
                entry.agent_architecture,
                beaten,
                entry.opponents.len(),
                entry.score,
                entry.grade,
            ));
        }
        out
    }

    /// Loads a previously-written `run.json`, if any. Absence just means
    /// this is a fresh run, not an error.
    pub fn load(dir: &Path) -> Option<Self> {
        let body = fs::read_to_string(dir.join("run.json")).ok()?;
        serde_json::from_str(&body).ok()
    }
}

fn is_same_agent(record: &AgentRunRecord, agent: &AgentIdentity) -> bool {
    record.display_name == agent.display_name && record.agent_architecture == agent.agent_architecture
}

fn build_record(agent: &AgentIdentity, opponents: HashMap<String, OpponentRecord>, ladder: &[crate::agent::OpponentSpec]) -> AgentRunRecord {
    let score = opponents.values().map(|o| o.weighted_points).sum();
    let eliminated_at = eliminated_at_label(&opponents, ladder);
    AgentRunRecord {
        display_name: agent.display_name.clone(),
        agent_architecture: agent.agent_architecture.clone(),
        opponents,
        score,
        grade: Grade::from_score(score).label().to_string(),
        eliminated_at,
        extra: HashMap::new(),
    }
}

fn now_iso8601() -> String {
    let format = time::format_description::parse("[year]-[month]-[day]T[hour]:[minute]:[second]Z")
        .expect("static format description");
    OffsetDateTime::now_utc().format(&format).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{GameOutcome, OpponentSpec, OutcomeKind as OK, Score};

    fn played(name: &str, weight: f64, win: bool) -> PlayedMatchup {
        PlayedMatchup {
            opponent: OpponentSpec { name: name.into(), weight },
            outcome: GameOutcome {
                result: if win { OK::Win } else { OK::Loss },
                ticks: 100,
                winner_side: Some(0),
                crash_reason: None,
            },
            score: Score { weighted_points: if win { weight } else { 0.0 } },
        }
    }

    fn ladder() -> Vec<OpponentSpec> {
        vec![
            OpponentSpec { name: "Easy".into(), weight: 10.0 },
            OpponentSpec { name: "Med".into(), weight: 15.0 },
            OpponentSpec { name: "Hard".into(), weight: 20.0 },
        ]
    }

    #[test]
    fn json_round_trips_and_tracks_progress() {
        let agent = AgentIdentity::new("A", "hybrid");
        let mut run = BenchmarkRun::new("run-1");
        run.upsert_agent(&agent, &[played("Easy", 10.0, true)], &ladder());
        assert_eq!(run.already_played(&agent), 1);

        let dir = std::env::temp_dir().join(format!("arena-artifacts-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        run.write_json(&dir).unwrap();

        let loaded = BenchmarkRun::load(&dir).expect("run.json should exist");
        assert_eq!(loaded.already_played(&agent), 1);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unknown_top_level_and_entry_fields_are_preserved_on_round_trip() {
        let agent = AgentIdentity::new("A", "hybrid");
        let mut run = BenchmarkRun::new("run-1");
        run.upsert_agent(&agent, &[played("Easy", 10.0, true)], &ladder());

        let mut body: serde_json::Value = serde_json::to_value(&run).unwrap();
        body["future_top_level_field"] = serde_json::json!("kept");
        body["entries"][0]["future_entry_field"] = serde_json::json!(42);
        body["entries"][0]["opponents"]["Easy"]["ticks"] = serde_json::json!(100);

        let reloaded: BenchmarkRun = serde_json::from_value(body).unwrap();
        assert_eq!(reloaded.extra.get("future_top_level_field").unwrap(), "kept");
        let entry = &reloaded.entries[0];
        assert_eq!(entry.extra.get("future_entry_field").unwrap(), 42);
        assert_eq!(entry.opponents["Easy"].extra.get("ticks").unwrap(), 100);

        let round_tripped = serde_json::to_value(&reloaded).unwrap();
        assert_eq!(round_tripped["future_top_level_field"], "kept");
        assert_eq!(round_tripped["entries"][0]["future_entry_field"], 42);
    }

    #[test]
    fn upsert_replaces_rather_than_duplicates() {
        let agent = AgentIdentity::new("A", "hybrid");
        let mut run = BenchmarkRun::new("run-1");
        run.upsert_agent(&agent, &[played("Easy", 10.0, true)], &ladder());
        run.upsert_agent(&agent, &[played("Easy", 10.0, true), played("Med", 15.0, false)], &ladder());
        assert_eq!(run.entries.len(), 1);
        assert_eq!(run.already_played(&agent), 2);
    }

    #[test]
    fn eliminated_at_reports_cleared_all_once_ladder_is_swept() {
        let agent = AgentIdentity::new("A", "hybrid");
        let mut run = BenchmarkRun::new("run-1");
        let clean = vec![played("Easy", 10.0, true), played("Med", 15.0, true), played("Hard", 20.0, true)];
        run.upsert_agent(&agent, &clean, &ladder());
        let record = run.agent_record(&agent).unwrap();
        assert_eq!(record.eliminated_at, "cleared all");
        assert!((record.score - 45.0).abs() < 1e-9);
    }

    #[test]
    fn eliminated_at_names_the_stopping_opponent() {
        let agent = AgentIdentity::new("A", "hybrid");
        let mut run = BenchmarkRun::new("run-1");
        let stopped = vec![played("Easy", 10.0, true), played("Med", 15.0, false)];
        run.upsert_agent(&agent, &stopped, &ladder());
        let record = run.agent_record(&agent).unwrap();
        assert_eq!(record.eliminated_at, "Med");
    }
}
