//! The `benchmark` CLI (§6): runs one or more agents through their
//! single-elimination opponent ladder and folds the resulting `run.json`
//! into the cross-run leaderboard.
//!
//! Exit codes match §6 exactly: `0` on clean completion (individual matchup
//! failures are recorded, not fatal), `2` on a configuration error (bad
//! selector syntax, unknown opponent), `3` when a prerequisite is missing
//! (no model configured, the game-runner binary doesn't exist).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use rts_arena_bench::agent::{AgentIdentity, OpponentSpec};
use rts_arena_bench::config::{ArenaConfig, ModelConfig};
use rts_arena_bench::error::ConfigError;
use rts_arena_bench::leaderboard;
use rts_arena_bench::logging;
use rts_arena_bench::orchestrator::child_runner::ProcessChildRunner;
use rts_arena_bench::orchestrator::{run_tournament, TournamentPlan};

/// `benchmark --agents <selector> --opponents <ordered-list> --map <path>
/// --tick-cap <int> --budget-seconds <int> --artifacts <dir> [--games N]`
#[derive(Parser, Debug)]
#[command(author, version, about = "Runs RTS agents through a single-elimination benchmark ladder", long_about = None)]
struct Cli {
    /// Agents to benchmark, as a comma-separated `name:architecture` list
    /// (architecture is one of `mcts`, `hybrid`). Example:
    /// `--agents MyAgent:hybrid,OtherAgent:mcts`.
    #[arg(long, value_delimiter = ',', required = true)]
    agents: Vec<String>,

    /// The opponent ladder, in ascending difficulty, as a comma-separated
    /// `name:weight` list. Example: `--opponents Easy:10,Medium:15,Hard:20`.
    #[arg(long, value_delimiter = ',', required = true)]
    opponents: Vec<String>,

    /// Map identifier passed through to the game-runner child process.
    #[arg(long)]
    map: String,

    /// Per-game tick cap.
    #[arg(long = "tick-cap")]
    tick_cap: u32,

    /// Per-game wall-clock budget, in seconds.
    #[arg(long = "budget-seconds")]
    budget_seconds: u64,

    /// Directory to write `run.json`/`run.md` and the consolidated
    /// leaderboard into.
    #[arg(long)]
    artifacts: PathBuf,

    /// Games played per matchup before the ladder advances. Only `1` is
    /// supported; anything else is a configuration error (the best-of-N
    /// majority-vote path isn't implemented, see `DESIGN.md`).
    #[arg(long, default_value_t = 1)]
    games: u32,

    /// Path to the external game-runner binary (§1: building and launching
    /// it is out of scope for this crate, so the path is supplied here).
    #[arg(long = "game-runner", default_value = "./game-runner")]
    game_runner: PathBuf,

    /// A stable identifier for this invocation, used as the run id and
    /// default artifact file prefix. Defaults to the map name.
    #[arg(long)]
    run_id: Option<String>,

    /// Skip leaderboard consolidation after the run completes.
    #[arg(long)]
    no_leaderboard: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = ArenaConfig::from_env().with_artifact_dir(cli.artifacts.clone());
    if let Some(log_dir) = &config.log_dir {
        logging::init_logger(log_dir);
    }

    if let Err(e) = std::fs::create_dir_all(&config.artifact_dir) {
        eprintln!("could not create artifact directory {}: {e}", config.artifact_dir.display());
        return ExitCode::from(2);
    }

    let agents = match parse_agents(&cli.agents) {
        Ok(agents) => agents,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(2);
        }
    };

    let ladder = match parse_opponents(&cli.opponents) {
        Ok(ladder) => ladder,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(2);
        }
    };

    if cli.games != 1 {
        eprintln!("configuration error: --games must be 1 (best-of-N majority scoring is not implemented)");
        return ExitCode::from(2);
    }

    if !cli.game_runner.exists() {
        eprintln!("missing prerequisite: game-runner binary not found at {}", cli.game_runner.display());
        return ExitCode::from(3);
    }

    let model = match ModelConfig::from_env(0) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("missing prerequisite: {e}");
            return ExitCode::from(3);
        }
    };
    let model_p2 = ModelConfig::from_env(1).ok();

    let run_id = cli.run_id.clone().unwrap_or_else(|| cli.map.clone());
    let plan = TournamentPlan {
        run_id,
        agents,
        ladder,
        map: cli.map.clone(),
        tick_cap: cli.tick_cap,
        wall_clock_budget: Duration::from_secs(cli.budget_seconds),
    };

    let runner = Arc::new(ProcessChildRunner::new(cli.game_runner.clone()));

    info!(run_id = %plan.run_id, agents = plan.agents.len(), opponents = plan.ladder.len(), "starting tournament");
    let mut run = run_tournament(&plan, &config, &model, model_p2.as_ref(), runner);

    if let Err(e) = run.write_json(&config.artifact_dir) {
        error!("failed to write run.json: {e}");
    }
    if let Err(e) = run.write_markdown(&config.artifact_dir) {
        error!("failed to write run.md: {e}");
    }

    if !cli.no_leaderboard {
        match leaderboard::consolidate(&config.artifact_dir) {
            Ok(board) => info!(entries = board.leaderboard.len(), "leaderboard consolidated"),
            Err(e) => error!("failed to consolidate leaderboard: {e}"),
        }
    }

    let non_wins: u32 = run
        .entries
        .iter()
        .flat_map(|a| a.opponents.values())
        .map(|o| o.draws + o.losses)
        .sum();
    if non_wins > 0 {
        info!(non_wins, "completed with per-matchup non-win results recorded");
    }

    ExitCode::SUCCESS
}

/// Parses `name:architecture` pairs. Unknown architectures are rejected here
/// rather than deep in the orchestrator, so a typo fails before any matchup
/// runs (§7's "configuration errors fail the whole tournament fast").
fn parse_agents(raw: &[String]) -> Result<Vec<AgentIdentity>, ConfigError> {
    raw.iter()
        .map(|entry| {
            let (name, architecture) = entry
                .split_once(':')
                .ok_or_else(|| ConfigError::InvalidPlan(format!("agent selector '{entry}' must be 'name:architecture'")))?;
            match architecture {
                "mcts" | "hybrid" => Ok(AgentIdentity::new(name, architecture)),
                other => Err(ConfigError::UnknownAgentClass(other.to_string())),
            }
        })
        .collect()
}

/// Parses `name:weight` pairs, preserving the given order as the ladder's
/// ascending-difficulty order (§3).
fn parse_opponents(raw: &[String]) -> Result<Vec<OpponentSpec>, ConfigError> {
    raw.iter()
        .map(|entry| {
            let (name, weight) = entry
                .split_once(':')
                .ok_or_else(|| ConfigError::InvalidPlan(format!("opponent selector '{entry}' must be 'name:weight'")))?;
            let weight: f64 = weight
                .parse()
                .map_err(|_| ConfigError::InvalidPlan(format!("opponent selector '{entry}' has a non-numeric weight")))?;
            Ok(OpponentSpec { name: name.to_string(), weight })
        })
        .collect()
}
