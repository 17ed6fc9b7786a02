//! Spawns and supervises one game-runner child process per matchup (§4.1,
//! §6). Generalizes the teacher's `ClientHandler`/`LimitedProcess` pair
//! (spawn, enforce a deadline, escalate to a kill) from a TCP-based action
//! protocol to the spec's line-oriented stdout contract.
//!
//! [`ChildRunner`] is a trait specifically so the orchestrator's scheduling
//! logic can be exercised in tests without spawning real processes (§9's
//! "C3 must be instantiable per agent instance so tests can inject a fake"
//! note, applied here to the child-process boundary).

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{instrument, warn};

use crate::agent::{GameOutcome, Matchup, OutcomeKind};
use crate::config::ModelConfig;
use crate::error::ChildRunnerError;

/// Runs one matchup to completion (or timeout/crash) and returns its outcome.
pub trait ChildRunner: Send + Sync {
    fn run(&self, matchup: &Matchup, model: &ModelConfig, model_p2: Option<&ModelConfig>) -> GameOutcome;
}

/// Spawns the externally-supplied game-runner binary per matchup.
///
/// Building and shell-launching that binary is out of scope (§1) — this
/// type only knows how to invoke it with the env vars §6 specifies, read its
/// one `RESULT` line from stdout, and enforce the wall-clock budget with a
/// graceful-signal / grace-window / force-kill escalation (§4.1, §9).
#[derive(Debug, Clone)]
pub struct ProcessChildRunner {
    pub command: PathBuf,
    pub args: Vec<String>,
    pub grace_period: Duration,
}

impl ProcessChildRunner {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            grace_period: Duration::from_secs(2),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    fn kill_with_escalation(&self, child: &mut Child) {
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }
        send_graceful_signal(child.id());

        let deadline = Instant::now() + self.grace_period;
        while Instant::now() < deadline {
            if matches!(child.try_wait(), Ok(Some(_))) {
                return;
            }
            thread::sleep(Duration::from_millis(20));
        }
        let _ = child.kill();
        let _ = child.wait();
    }
}

impl ChildRunner for ProcessChildRunner {
    #[instrument(skip_all, fields(agent = %matchup.agent.display_name, opponent = %matchup.opponent.name))]
    fn run(&self, matchup: &Matchup, model: &ModelConfig, model_p2: Option<&ModelConfig>) -> GameOutcome {
        let stderr_file = matchup.agent.create_stderr_log_file();

        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .env("AGENT_CLASS", &matchup.agent.agent_architecture)
            .env("OPPONENT_CLASS", &matchup.opponent.name)
            .env("MAP", &matchup.map)
            .env("TICK_CAP", matchup.tick_cap.to_string())
            .env("MODEL_HOST", &model.host)
            .env("MODEL_NAME", &model.model_name)
            .stdin(Stdio::null())
            .stdout(Stdio::piped());

        if let Some(p2) = model_p2 {
            cmd.env("MODEL_NAME_P2", &p2.model_name);
        }

        match &stderr_file {
            Some(file) => {
                let stderr = match file.try_clone() {
                    Ok(f) => f,
                    Err(e) => return GameOutcome::crash(ChildRunnerError::Io(e).to_string()),
                };
                cmd.stderr(Stdio::from(stderr));
            }
            None => {
                cmd.stderr(Stdio::null());
            }
        }

        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                let err = ChildRunnerError::Spawn(e);
                warn!("{err}");
                return GameOutcome::crash(err.to_string());
            }
        };

        let stdout = match child.stdout.take() {
            Some(s) => s,
            None => return GameOutcome::crash("child produced no stdout handle"),
        };

        // A dedicated thread reads stdout looking for the terminal marker so
        // the main loop can poll the wall-clock deadline independently of
        // blocking I/O (§4.1: "the orchestrator never blocks indefinitely").
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines().map_while(Result::ok) {
                if line.starts_with("RESULT ") {
                    let _ = tx.send(line);
                    return;
                }
            }
        });

        let deadline = Instant::now() + matchup.wall_clock_budget;
        let mut result_line = None;
        loop {
            match rx.recv_timeout(Duration::from_millis(25)) {
                Ok(line) => {
                    result_line = Some(line);
                    break;
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if Instant::now() >= deadline {
                        break;
                    }
                    if matches!(child.try_wait(), Ok(Some(_))) {
                        // child exited on its own without (yet) delivering a
                        // RESULT line through the channel; give the reader
                        // thread one more beat to drain buffered output.
                        if let Ok(line) = rx.recv_timeout(Duration::from_millis(50)) {
                            result_line = Some(line);
                        }
                        break;
                    }
                }
            }
        }

        match result_line {
            Some(line) => {
                let _ = child.wait();
                parse_result_line(&line).unwrap_or_else(|| GameOutcome::crash("malformed RESULT line"))
            }
            None => {
                let already_exited = matches!(child.try_wait(), Ok(Some(_)));
                self.kill_with_escalation(&mut child);
                if already_exited {
                    GameOutcome::crash("child exited without a RESULT line")
                } else {
                    GameOutcome::timeout(0)
                }
            }
        }
    }
}

/// Parses `RESULT winner=<0|1|draw> ticks=<N> agent_side=<0|1>` (§6).
fn parse_result_line(line: &str) -> Option<GameOutcome> {
    let mut winner: Option<String> = None;
    let mut ticks: Option<u32> = None;
    let mut agent_side: Option<usize> = None;

    for token in line.trim_start_matches("RESULT").split_whitespace() {
        let (key, value) = token.split_once('=')?;
        match key {
            "winner" => winner = Some(value.to_string()),
            "ticks" => ticks = value.parse().ok(),
            "agent_side" => agent_side = value.parse().ok(),
            _ => {}
        }
    }

    let winner = winner?;
    let ticks = ticks?;
    let agent_side = agent_side?;

    let (result, winner_side) = if winner == "draw" {
        (OutcomeKind::Draw, None)
    } else {
        let winning_side: usize = winner.parse().ok()?;
        let result = if winning_side == agent_side {
            OutcomeKind::Win
        } else {
            OutcomeKind::Loss
        };
        (result, Some(winning_side))
    };

    Some(GameOutcome {
        result,
        ticks,
        winner_side,
        crash_reason: None,
    })
}

#[cfg(unix)]
fn send_graceful_signal(pid: u32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
}

#[cfg(not(unix))]
fn send_graceful_signal(_pid: u32) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_win_for_tracked_side() {
        let outcome = parse_result_line("RESULT winner=0 ticks=100 agent_side=0").unwrap();
        assert_eq!(outcome.result, OutcomeKind::Win);
        assert_eq!(outcome.ticks, 100);
        assert_eq!(outcome.winner_side, Some(0));
    }

    #[test]
    fn parses_loss_when_other_side_wins() {
        let outcome = parse_result_line("RESULT winner=1 ticks=200 agent_side=0").unwrap();
        assert_eq!(outcome.result, OutcomeKind::Loss);
    }

    #[test]
    fn parses_draw() {
        let outcome = parse_result_line("RESULT winner=draw ticks=1500 agent_side=0").unwrap();
        assert_eq!(outcome.result, OutcomeKind::Draw);
        assert_eq!(outcome.winner_side, None);
    }

    #[test]
    fn rejects_malformed_line() {
        assert!(parse_result_line("RESULT winner=0 ticks=oops agent_side=0").is_none());
    }
}
