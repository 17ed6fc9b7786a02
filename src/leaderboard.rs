//! C2: the leaderboard consolidator (§4.2). Reduces every `run.json` under a
//! directory to a single ranked table, deduplicated by agent identity.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::orchestrator::artifacts::{BenchmarkRun, OpponentRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "F")]
    F,
}

impl Grade {
    /// Bands from §3: A+≥90, A≥80, B≥70, C≥60, D≥40, else F. The sole policy
    /// decision this component makes (§4.2).
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Grade::APlus
        } else if score >= 80.0 {
            Grade::A
        } else if score >= 70.0 {
            Grade::B
        } else if score >= 60.0 {
            Grade::C
        } else if score >= 40.0 {
            Grade::D
        } else {
            Grade::F
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

/// One agent's standing (§6 schema): flat identity fields rather than a
/// nested `agent` object, matching the run-record shape it was folded from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub display_name: String,
    pub agent_architecture: String,
    pub score: f64,
    pub grade: Grade,
    pub opponents: HashMap<String, OpponentRecord>,
    pub eliminated_at: String,
    pub arena_version: String,
    pub run_id: String,
    pub timestamp: String,
    /// Set once a later consolidation finds a different arena version among
    /// the candidate entries for this key (§4.2 versioning note).
    pub comparable: bool,
    /// The `run*.json` this entry was read from (§6: "history: [ ...all
    /// entries with source_file and date... ]").
    pub source_file: String,
}

/// §6's Leaderboard JSON: `leaderboard` holds only the deduplicated
/// best-per-key entries; `history` keeps every candidate ever read, so a
/// superseded run (e.g. an older arena version, scenario 4) is never lost,
/// only out-ranked.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Leaderboard {
    pub generated: String,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub history: Vec<LeaderboardEntry>,
}

/// Folds every `run*.json` under `dir` into a ranked [`Leaderboard`],
/// writing `leaderboard.json` and `leaderboard.md` atomically. Unreadable or
/// malformed files are logged and skipped rather than aborting the whole
/// consolidation (§4.2).
pub fn consolidate(dir: &Path) -> io::Result<Leaderboard> {
    let mut best: HashMap<(String, String), LeaderboardEntry> = HashMap::new();
    let mut history: Vec<LeaderboardEntry> = Vec::new();

    for path in find_run_files(dir)? {
        let body = match fs::read_to_string(&path) {
            Ok(body) => body,
            Err(e) => {
                warn!("could not read run file {}: {e}", path.display());
                continue;
            }
        };
        let run: BenchmarkRun = match serde_json::from_str(&body) {
            Ok(run) => run,
            Err(e) => {
                warn!("skipping malformed run file {}: {e}", path.display());
                continue;
            }
        };
        let source_file = path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();

        for entry in &run.entries {
            let key = (entry.display_name.clone(), entry.agent_architecture.clone());
            let candidate = LeaderboardEntry {
                display_name: entry.display_name.clone(),
                agent_architecture: entry.agent_architecture.clone(),
                score: entry.score,
                grade: Grade::from_score(entry.score),
                opponents: entry.opponents.clone(),
                eliminated_at: entry.eliminated_at.clone(),
                arena_version: run.arena_version.clone(),
                run_id: run.run_id.clone(),
                timestamp: run.generated.clone(),
                comparable: true,
                source_file: source_file.clone(),
            };
            history.push(candidate.clone());

            match best.get(&key) {
                None => {
                    best.insert(key, candidate);
                }
                Some(existing) => {
                    if is_better(&candidate, existing) {
                        best.insert(key, candidate);
                    }
                }
            }
        }
    }

    let mut entries: Vec<LeaderboardEntry> = best.into_values().collect();
    mark_incompatible_versions(&mut entries);
    entries.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.display_name.cmp(&b.display_name)));
    history.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.display_name.cmp(&b.display_name)));

    let board = Leaderboard { generated: now_iso8601(), leaderboard: entries, history };
    write_json(&board, dir)?;
    write_markdown(&board, dir)?;
    Ok(board)
}

fn now_iso8601() -> String {
    let format = time::format_description::parse("[year]-[month]-[day]T[hour]:[minute]:[second]Z")
        .expect("static format description");
    time::OffsetDateTime::now_utc().format(&format).unwrap_or_default()
}

/// `candidate` replaces `existing` iff it scores strictly higher, or ties and
/// is strictly more recent (§3 dedup rule: "keeps the maximum score... ties
/// broken by later timestamp").
fn is_better(candidate: &LeaderboardEntry, existing: &LeaderboardEntry) -> bool {
    if candidate.score != existing.score {
        candidate.score > existing.score
    } else {
        candidate.timestamp > existing.timestamp
    }
}

/// If any two entries disagree on arena version, every entry is flagged
/// non-comparable — the leaderboard as a whole spans incompatible versions,
/// so no ranking in it can be trusted as apples-to-apples (§4.2).
fn mark_incompatible_versions(entries: &mut [LeaderboardEntry]) {
    let mut versions = entries.iter().map(|e| e.arena_version.as_str());
    let first = match versions.next() {
        Some(v) => v,
        None => return,
    };
    let all_same = versions.all(|v| v == first);
    if !all_same {
        for entry in entries {
            entry.comparable = false;
        }
    }
}

fn find_run_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_run_file = path.is_file()
            && path.file_name().and_then(|n| n.to_str()).is_some_and(|name| name.starts_with("run") && name.ends_with(".json"));
        if is_run_file {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn write_json(board: &Leaderboard, dir: &Path) -> io::Result<PathBuf> {
    let path = dir.join("leaderboard.json");
    let tmp = dir.join("leaderboard.json.tmp");
    let body = serde_json::to_string_pretty(board).expect("Leaderboard always serializes");
    fs::write(&tmp, body)?;
    fs::rename(&tmp, &path)?;
    Ok(path)
}

fn write_markdown(board: &Leaderboard, dir: &Path) -> io::Result<PathBuf> {
    let path = dir.join("leaderboard.md");
    let tmp = dir.join("leaderboard.md.tmp");
    let mut out = String::from("# Leaderboard\n\n| Rank | Agent | Architecture | Score | Grade | Version |\n|---|---|---|---|---|---|\n");
    for (rank, entry) in board.leaderboard.iter().enumerate() {
        let version_label = if entry.comparable { entry.arena_version.clone() } else { format!("{} (not comparable)", entry.arena_version) };
        out.push_str(&format!(
            "| {} | {} | {} | {:.2} | {} | {} |\n",
            rank + 1,
            entry.display_name,
            entry.agent_architecture,
            entry.score,
            entry.grade.label(),
            version_label,
        ));
    }
    fs::write(&tmp, out)?;
    fs::rename(&tmp, &path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentIdentity, OpponentSpec};
    use crate::orchestrator::artifacts::AgentRunRecord;

    fn agent_run(name: &str, arch: &str, score: f64) -> AgentRunRecord {
        let agent = AgentIdentity::new(name, arch);
        let ladder = vec![OpponentSpec { name: "Easy".into(), weight: 10.0 }];
        let mut run = BenchmarkRun::new("seed");
        run.upsert_agent(
            &agent,
            &[crate::orchestrator::scheduler::PlayedMatchup {
                opponent: ladder[0].clone(),
                outcome: crate::agent::GameOutcome { result: crate::agent::OutcomeKind::Win, ticks: 100, winner_side: Some(0), crash_reason: None },
                score: crate::agent::Score { weighted_points: score },
            }],
            &ladder,
        );
        run.entries.remove(0)
    }

    fn write_run(dir: &Path, file_name: &str, run: &BenchmarkRun) {
        fs::write(dir.join(file_name), serde_json::to_string_pretty(run).unwrap()).unwrap();
    }

    #[test]
    fn grade_bands_match_score_thresholds() {
        assert_eq!(Grade::from_score(95.0), Grade::APlus);
        assert_eq!(Grade::from_score(85.0), Grade::A);
        assert_eq!(Grade::from_score(70.0), Grade::B);
        assert_eq!(Grade::from_score(60.0), Grade::C);
        assert_eq!(Grade::from_score(40.0), Grade::D);
        assert_eq!(Grade::from_score(10.0), Grade::F);
    }

    #[test]
    fn grade_serializes_to_plus_suffixed_label() {
        let json = serde_json::to_string(&Grade::APlus).unwrap();
        assert_eq!(json, "\"A+\"");
    }

    #[test]
    fn seed_scenario_4_keeps_best_run_per_agent_key() {
        let dir = std::env::temp_dir().join(format!("arena-leaderboard-test-{}-a", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let mut run1 = BenchmarkRun::new("run-1");
        run1.entries.push(agent_run("Alpha", "hybrid", 42.0));
        write_run(&dir, "run-1.json", &run1);

        let mut run2 = BenchmarkRun::new("run-2");
        run2.entries.push(agent_run("Alpha", "hybrid", 91.0));
        write_run(&dir, "run-2.json", &run2);

        let board = consolidate(&dir).unwrap();
        assert_eq!(board.leaderboard.len(), 1);
        assert_eq!(board.leaderboard[0].score, 91.0);
        assert_eq!(board.leaderboard[0].grade, Grade::APlus);
        assert_eq!(board.history.len(), 2, "both runs appear in history even though only one ranks");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn malformed_run_file_is_skipped_not_fatal() {
        let dir = std::env::temp_dir().join(format!("arena-leaderboard-test-{}-b", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        fs::write(dir.join("run-bad.json"), "{ not json").unwrap();
        let mut run = BenchmarkRun::new("run-good");
        run.entries.push(agent_run("Beta", "mcts", 55.0));
        write_run(&dir, "run-good.json", &run);

        let board = consolidate(&dir).unwrap();
        assert_eq!(board.leaderboard.len(), 1);
        assert_eq!(board.leaderboard[0].display_name, "Beta");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn differing_arena_versions_mark_all_entries_not_comparable() {
        let dir = std::env::temp_dir().join(format!("arena-leaderboard-test-{}-c", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let mut run1 = BenchmarkRun::new("run-1");
        run1.arena_version = "0.1.0".into();
        run1.entries.push(agent_run("Alpha", "hybrid", 42.0));
        write_run(&dir, "run-1.json", &run1);

        let mut run2 = BenchmarkRun::new("run-2");
        run2.arena_version = "0.2.0".into();
        run2.entries.push(agent_run("Beta", "mcts", 55.0));
        write_run(&dir, "run-2.json", &run2);

        let board = consolidate(&dir).unwrap();
        assert!(board.leaderboard.iter().all(|e| !e.comparable));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn idempotent_consolidation_is_stable() {
        let dir = std::env::temp_dir().join(format!("arena-leaderboard-test-{}-d", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let mut run = BenchmarkRun::new("run-1");
        run.entries.push(agent_run("Alpha", "hybrid", 42.0));
        write_run(&dir, "run-1.json", &run);

        let first = consolidate(&dir).unwrap();
        let second = consolidate(&dir).unwrap();
        assert_eq!(first.leaderboard.len(), second.leaderboard.len());
        assert_eq!(first.leaderboard[0].score, second.leaderboard[0].score);

        fs::remove_dir_all(&dir).ok();
    }
}
