//! Scoring rules (§3, §4.1): per-matchup weighted points with an efficiency
//! bonus for early wins, aggregated into a per-agent total.

use crate::agent::{GameOutcome, OpponentSpec, OutcomeKind, Score};

/// `+0.2` if the win landed under 50% of the tick cap, `+0.1` under 75%,
/// `0.0` otherwise (or for non-wins).
pub fn efficiency_bonus(outcome: &GameOutcome, tick_cap: u32) -> f64 {
    if outcome.result != OutcomeKind::Win || tick_cap == 0 {
        return 0.0;
    }
    let ratio = outcome.ticks as f64 / tick_cap as f64;
    if ratio < 0.5 {
        0.2
    } else if ratio < 0.75 {
        0.1
    } else {
        0.0
    }
}

/// `game_score`: win=1.0+bonus, draw=0.5, else 0.
fn game_score(outcome: &GameOutcome, tick_cap: u32) -> f64 {
    match outcome.result {
        OutcomeKind::Win => 1.0 + efficiency_bonus(outcome, tick_cap),
        OutcomeKind::Draw => 0.5,
        OutcomeKind::Loss | OutcomeKind::Timeout | OutcomeKind::Crash => 0.0,
    }
}

/// `points = opponent_weight × game_score`.
pub fn score_matchup(outcome: &GameOutcome, opponent: &OpponentSpec, tick_cap: u32) -> Score {
    Score {
        weighted_points: opponent.weight * game_score(outcome, tick_cap),
    }
}

/// Agent score = Σ points over played matchups (only the matchups that were
/// actually played before elimination stopped the run, §3 invariant).
pub fn total_score(scores: &[Score]) -> f64 {
    scores.iter().map(|s| s.weighted_points).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn win(ticks: u32) -> GameOutcome {
        GameOutcome {
            result: OutcomeKind::Win,
            ticks,
            winner_side: Some(0),
            crash_reason: None,
        }
    }

    #[test]
    fn efficiency_bonus_bands() {
        assert_eq!(efficiency_bonus(&win(100), 1500), 0.2); // <50%
        assert_eq!(efficiency_bonus(&win(1000), 1500), 0.1); // <75%
        assert_eq!(efficiency_bonus(&win(1400), 1500), 0.0); // >=75%
    }

    #[test]
    fn seed_scenario_1_clean_clear() {
        // agents=[A], opponents=[Easy w=10, Med w=15, Hard w=20], all wins at
        // ticks=100 with tick_cap=1500 => efficiency bonus +0.2 each.
        let opponents = [
            OpponentSpec { name: "Easy".into(), weight: 10.0 },
            OpponentSpec { name: "Med".into(), weight: 15.0 },
            OpponentSpec { name: "Hard".into(), weight: 20.0 },
        ];
        let outcome = win(100);
        let total: f64 = opponents
            .iter()
            .map(|o| score_matchup(&outcome, o, 1500).weighted_points)
            .sum();
        assert!((total - 54.0).abs() < 1e-6);
    }

    #[test]
    fn non_win_scores_zero() {
        let loss = GameOutcome {
            result: OutcomeKind::Loss,
            ticks: 50,
            winner_side: Some(1),
            crash_reason: None,
        };
        let opponent = OpponentSpec { name: "Med".into(), weight: 15.0 };
        assert_eq!(score_matchup(&loss, &opponent, 1500).weighted_points, 0.0);
    }
}
