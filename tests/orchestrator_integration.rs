//! End-to-end exercise of C1 (the orchestrator) and C2 (the leaderboard)
//! through fake collaborators, generalizing the teacher's "inject a fake
//! agent instead of a compiled binary" pattern from `tests/launch.rs` to
//! this crate's `ChildRunner` boundary.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rts_arena_bench::agent::{AgentIdentity, GameOutcome, Matchup, OpponentSpec, OutcomeKind};
use rts_arena_bench::config::{ArenaConfig, ModelConfig};
use rts_arena_bench::leaderboard;
use rts_arena_bench::orchestrator::child_runner::ChildRunner;
use rts_arena_bench::orchestrator::{run_tournament, TournamentPlan};

/// Scripted outcomes keyed by opponent name, standing in for a real
/// game-runner child process.
struct FakeRunner {
    outcomes: Mutex<HashMap<String, GameOutcome>>,
}

impl ChildRunner for FakeRunner {
    fn run(&self, matchup: &Matchup, _model: &ModelConfig, _model_p2: Option<&ModelConfig>) -> GameOutcome {
        self.outcomes
            .lock()
            .unwrap()
            .get(&matchup.opponent.name)
            .cloned()
            .unwrap_or_else(|| GameOutcome::crash("fake runner has no scripted outcome"))
    }
}

fn win(ticks: u32) -> GameOutcome {
    GameOutcome { result: OutcomeKind::Win, ticks, winner_side: Some(0), crash_reason: None }
}

fn loss(ticks: u32) -> GameOutcome {
    GameOutcome { result: OutcomeKind::Loss, ticks, winner_side: Some(1), crash_reason: None }
}

fn temp_artifact_dir(label: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("arena-integration-{label}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn agent_that_clears_the_ladder_scores_every_matchup() {
    let dir = temp_artifact_dir("clears-ladder");
    let config = ArenaConfig::new().with_artifact_dir(dir.clone());
    let model = ModelConfig::new("test-model");

    let ladder = vec![
        OpponentSpec { name: "Easy".into(), weight: 10.0 },
        OpponentSpec { name: "Medium".into(), weight: 15.0 },
        OpponentSpec { name: "Hard".into(), weight: 20.0 },
    ];
    let mut outcomes = HashMap::new();
    outcomes.insert("Easy".to_string(), win(400));
    outcomes.insert("Medium".to_string(), win(500));
    outcomes.insert("Hard".to_string(), win(600));
    let runner = Arc::new(FakeRunner { outcomes: Mutex::new(outcomes) });

    let agent = AgentIdentity::new("Contender", "hybrid");
    let plan = TournamentPlan {
        run_id: "integration-run-1".into(),
        agents: vec![agent.clone()],
        ladder,
        map: "arena".into(),
        tick_cap: 1500,
        wall_clock_budget: Duration::from_secs(5),
    };

    let mut run = run_tournament(&plan, &config, &model, None, runner);
    let record = run.agent_record(&agent).expect("agent should have a record");
    assert_eq!(record.opponents.len(), 3, "agent should play the full ladder");
    assert_eq!(record.eliminated_at, "cleared all");
    assert!(record.score > 0.0);

    run.write_json(&dir).unwrap();
    let board = leaderboard::consolidate(&dir).unwrap();
    assert_eq!(board.leaderboard.len(), 1);
    assert_eq!(board.leaderboard[0].display_name, "Contender");
    assert_eq!(board.history.len(), 1);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn agent_that_loses_stops_the_ladder_and_is_labeled_by_the_blocking_opponent() {
    let dir = temp_artifact_dir("stops-ladder");
    let config = ArenaConfig::new().with_artifact_dir(dir.clone());
    let model = ModelConfig::new("test-model");

    let ladder = vec![
        OpponentSpec { name: "Easy".into(), weight: 10.0 },
        OpponentSpec { name: "Medium".into(), weight: 15.0 },
        OpponentSpec { name: "Hard".into(), weight: 20.0 },
    ];
    let mut outcomes = HashMap::new();
    outcomes.insert("Easy".to_string(), win(400));
    outcomes.insert("Medium".to_string(), loss(300));
    let runner = Arc::new(FakeRunner { outcomes: Mutex::new(outcomes) });

    let agent = AgentIdentity::new("Underdog", "mcts");
    let plan = TournamentPlan {
        run_id: "integration-run-2".into(),
        agents: vec![agent.clone()],
        ladder,
        map: "arena".into(),
        tick_cap: 1500,
        wall_clock_budget: Duration::from_secs(5),
    };

    let run = run_tournament(&plan, &config, &model, None, runner);
    let record = run.agent_record(&agent).expect("agent should have a record");
    assert_eq!(record.opponents.len(), 2, "the ladder stops at the first non-win");
    assert_eq!(record.eliminated_at, "Medium");

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn interrupted_run_resumes_without_replaying_completed_matchups() {
    let dir = temp_artifact_dir("resume");
    let config = ArenaConfig::new().with_artifact_dir(dir.clone());
    let model = ModelConfig::new("test-model");

    let ladder = vec![OpponentSpec { name: "Easy".into(), weight: 10.0 }, OpponentSpec { name: "Medium".into(), weight: 15.0 }];
    let agent = AgentIdentity::new("Resumer", "hybrid");

    // First invocation only ever sees "Easy"; simulate a crash before "Medium" runs.
    let mut first_outcomes = HashMap::new();
    first_outcomes.insert("Easy".to_string(), win(200));
    let first_runner = Arc::new(FakeRunner { outcomes: Mutex::new(first_outcomes) });
    let plan = TournamentPlan {
        run_id: "integration-run-3".into(),
        agents: vec![agent.clone()],
        ladder: vec![ladder[0].clone()],
        map: "arena".into(),
        tick_cap: 1500,
        wall_clock_budget: Duration::from_secs(5),
    };
    let mut first = run_tournament(&plan, &config, &model, None, first_runner);
    first.write_json(&dir).unwrap();

    // Second invocation sees the full ladder; it should only actually play "Medium".
    let mut second_outcomes = HashMap::new();
    second_outcomes.insert("Easy".to_string(), GameOutcome::crash("should not replay"));
    second_outcomes.insert("Medium".to_string(), win(300));
    let second_runner = Arc::new(FakeRunner { outcomes: Mutex::new(second_outcomes) });
    let full_plan = TournamentPlan { ladder: ladder.clone(), ..plan };

    let second = run_tournament(&full_plan, &config, &model, None, second_runner);
    let record = second.agent_record(&agent).unwrap();
    assert_eq!(record.opponents.len(), 2);
    assert!(record.opponents["Easy"].is_win(), "the resumed matchup keeps its original result, not a crash");
    assert!(record.opponents["Medium"].is_win());
    assert_eq!(record.eliminated_at, "cleared all");

    std::fs::remove_dir_all(&dir).ok();
}
