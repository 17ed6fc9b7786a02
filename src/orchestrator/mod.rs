//! C1, the tournament orchestrator (§3, §4.1): schedules each agent's
//! single-elimination ladder, runs matchups through a [`ChildRunner`], and
//! persists a resumable [`BenchmarkRun`].
//!
//! Shaped after the teacher's `Evaluator::evaluate`: collect the work up
//! front, dispatch onto worker threads bounded by configured parallelism,
//! and drain results from an mpsc channel.

pub mod artifacts;
pub mod child_runner;
pub mod scheduler;
pub mod scoring;

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::agent::{AgentIdentity, OpponentSpec};
use crate::config::{ArenaConfig, ModelConfig};
use artifacts::BenchmarkRun;
use child_runner::ChildRunner;
use scheduler::EliminationRun;

/// The fixed shape of one benchmark invocation (§3): which agents run,
/// against which opponent ladder, on which map, under what caps.
#[derive(Debug, Clone)]
pub struct TournamentPlan {
    pub run_id: String,
    pub agents: Vec<AgentIdentity>,
    pub ladder: Vec<OpponentSpec>,
    pub map: String,
    pub tick_cap: u32,
    pub wall_clock_budget: Duration,
}

/// Runs every agent's elimination ladder and returns the consolidated
/// [`BenchmarkRun`], persisting JSON + Markdown artifacts as each agent
/// finishes so a killed process loses at most one in-flight batch.
pub fn run_tournament(
    plan: &TournamentPlan,
    config: &ArenaConfig,
    model: &ModelConfig,
    model_p2: Option<&ModelConfig>,
    runner: Arc<dyn ChildRunner>,
) -> BenchmarkRun {
    let mut run = BenchmarkRun::load(&config.artifact_dir).unwrap_or_else(|| {
        BenchmarkRun::new(plan.run_id.clone())
            .with_map(plan.map.clone())
            .with_tick_cap(plan.tick_cap)
    });

    let chunk_size = config.max_parallel.max(1);
    for chunk in plan.agents.chunks(chunk_size) {
        let (tx, rx) = mpsc::channel();

        for agent in chunk {
            let tx = tx.clone();
            let agent = agent.clone();
            let ladder = plan.ladder.clone();
            let map = plan.map.clone();
            let tick_cap = plan.tick_cap;
            let wall_clock_budget = plan.wall_clock_budget;
            let runner = Arc::clone(&runner);
            let model = model.clone();
            let model_p2 = model_p2.cloned();

            let existing_record = run.agent_record(&agent).cloned();

            thread::spawn(move || {
                let already_played = existing_record.as_ref().map(|r| r.opponents.len()).unwrap_or(0);
                let eliminated_already = existing_record
                    .as_ref()
                    .and_then(|r| ladder.get(already_played.saturating_sub(1)).map(|o| (r, o)))
                    .and_then(|(r, o)| r.opponents.get(&o.name))
                    .is_some_and(|o| !o.is_win());

                let mut elim = EliminationRun::new(agent.clone(), ladder);
                if existing_record.is_some() {
                    elim.resume_to(already_played);
                    if eliminated_already {
                        elim.force_stop();
                    }
                }

                while let Some(m) = elim.next_matchup(&map, tick_cap, wall_clock_budget) {
                    let outcome = runner.run(&m, &model, model_p2.as_ref());
                    info!(
                        agent = %m.agent.display_name,
                        opponent = %m.opponent.name,
                        result = ?outcome.result,
                        ticks = outcome.ticks,
                        "matchup finished"
                    );
                    elim.record_result(m.opponent, outcome, tick_cap);
                }
                let _ = tx.send(elim);
            });
        }
        drop(tx);

        for elim in rx.iter().take(chunk.len()) {
            run.append_matchups(elim.agent(), elim.played(), elim.ladder());
            if let Err(e) = run.write_json(&config.artifact_dir) {
                warn!("failed to persist run.json: {e}");
            }
            if let Err(e) = run.write_markdown(&config.artifact_dir) {
                warn!("failed to persist run.md: {e}");
            }
        }
    }

    run
}
