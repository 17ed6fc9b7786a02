//! Single-elimination scheduling (§3, §4.1).
//!
//! The teacher's `tournament_strategy.rs` carries a literal
//! `//TODO: knockout AKA single elimination tournament` next to its
//! `SwissTournament`/`RoundRobinTournament` implementations — this module is
//! that TODO, built the way its siblings are: a small struct that owns the
//! played-so-far state and exposes a `next_matchup` / `record_result` pair
//! rather than a single monolithic loop.

use crate::agent::{AgentIdentity, GameOutcome, Matchup, OpponentSpec, OutcomeKind, Score};
use crate::orchestrator::scoring::score_matchup;

/// One played entry in an agent's elimination run: the opponent faced, the
/// outcome, and the score it contributed.
#[derive(Debug, Clone)]
pub struct PlayedMatchup {
    pub opponent: OpponentSpec,
    pub outcome: GameOutcome,
    pub score: Score,
}

/// Drives one agent through its ordered opponent ladder, stopping at the
/// first non-win (§3: "once an agent records a non-win result it plays no
/// further opponents in that run").
pub struct EliminationRun {
    agent: AgentIdentity,
    ladder: Vec<OpponentSpec>,
    next_index: usize,
    played: Vec<PlayedMatchup>,
    stopped: bool,
}

impl EliminationRun {
    pub fn new(agent: AgentIdentity, ladder: Vec<OpponentSpec>) -> Self {
        Self {
            agent,
            ladder,
            next_index: 0,
            played: Vec::new(),
            stopped: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.stopped || self.next_index >= self.ladder.len()
    }

    /// Skips ahead past matchups a prior invocation already recorded,
    /// without replaying them (§4.1 resumability). `self.played` stays
    /// empty, so only newly-run matchups show up there for this session.
    pub fn resume_to(&mut self, already_played: usize) {
        self.next_index = already_played.min(self.ladder.len());
    }

    /// Marks the run as already eliminated, for resuming a run whose last
    /// recorded matchup was not a win.
    pub fn force_stop(&mut self) {
        self.stopped = true;
    }

    /// Builds the next matchup to run, or `None` if the run is over.
    pub fn next_matchup(&self, map: &str, tick_cap: u32, wall_clock_budget: std::time::Duration) -> Option<Matchup> {
        if self.is_finished() {
            return None;
        }
        Some(Matchup {
            agent: self.agent.clone(),
            opponent: self.ladder[self.next_index].clone(),
            map: map.to_string(),
            tick_cap,
            wall_clock_budget,
            game_index: self.next_index,
        })
    }

    /// Records the outcome of the matchup `next_matchup` just produced and
    /// advances (or halts) the ladder.
    pub fn record_result(&mut self, opponent: OpponentSpec, outcome: GameOutcome, tick_cap: u32) {
        let score = score_matchup(&outcome, &opponent, tick_cap);
        let is_win = outcome.result == OutcomeKind::Win;
        self.played.push(PlayedMatchup { opponent, outcome, score });
        self.next_index += 1;
        if !is_win {
            self.stopped = true;
        }
    }

    pub fn agent(&self) -> &AgentIdentity {
        &self.agent
    }

    pub fn played(&self) -> &[PlayedMatchup] {
        &self.played
    }

    pub fn total_score(&self) -> f64 {
        self.played.iter().map(|p| p.score.weighted_points).sum()
    }

    pub fn ladder_len(&self) -> usize {
        self.ladder.len()
    }

    pub fn ladder(&self) -> &[OpponentSpec] {
        &self.ladder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ladder() -> Vec<OpponentSpec> {
        vec![
            OpponentSpec { name: "Easy".into(), weight: 10.0 },
            OpponentSpec { name: "Med".into(), weight: 15.0 },
            OpponentSpec { name: "Hard".into(), weight: 20.0 },
        ]
    }

    fn win(ticks: u32) -> GameOutcome {
        GameOutcome { result: OutcomeKind::Win, ticks, winner_side: Some(0), crash_reason: None }
    }

    fn loss() -> GameOutcome {
        GameOutcome { result: OutcomeKind::Loss, ticks: 50, winner_side: Some(1), crash_reason: None }
    }

    #[test]
    fn seed_scenario_1_plays_full_ladder_on_clean_clear() {
        let mut run = EliminationRun::new(AgentIdentity::new("A", "hybrid"), ladder());
        while let Some(m) = run.next_matchup("arena", 1500, Duration::from_secs(5)) {
            run.record_result(m.opponent, win(100), 1500);
        }
        assert_eq!(run.played().len(), 3);
        assert!((run.total_score() - 54.0).abs() < 1e-6);
    }

    #[test]
    fn seed_scenario_2_stops_on_first_non_win() {
        let mut run = EliminationRun::new(AgentIdentity::new("A", "hybrid"), ladder());
        let m = run.next_matchup("arena", 1500, Duration::from_secs(5)).unwrap();
        run.record_result(m.opponent, win(100), 1500);
        let m = run.next_matchup("arena", 1500, Duration::from_secs(5)).unwrap();
        run.record_result(m.opponent, loss(), 1500);

        assert!(run.is_finished());
        assert_eq!(run.played().len(), 2);
        assert!(run.next_matchup("arena", 1500, Duration::from_secs(5)).is_none());
    }
}
