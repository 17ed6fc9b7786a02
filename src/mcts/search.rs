//! C4: the epsilon-greedy informed-MCTS engine (§4.4). Selection picks
//! between an unexpanded, prior-weighted action (ε₀), the locally best child
//! (ε_local), or the globally best child; simulation rolls out with a fast
//! stochastic policy; action selection at budget end favors visit count.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::Rng;

use crate::config::SearchBudget;
use crate::error::SearchError;
use crate::evaluation::{evaluate, StrategicGoals};
use crate::policy::PolicyPrior;
use crate::rts::{GameResult, PlayerAction, PlayerId, RtsState, UnitAction};

use super::tree::Tree;

/// At most this many joint-action candidates are sampled per expansion; the
/// true joint space is exponential in unit count, so §4.4's
/// "product-normalized... yielding a weight for each sampled joint action"
/// is read as sampling, not exhaustive enumeration.
const MAX_CANDIDATE_ACTIONS: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    pub turn_budget: Duration,
    pub iteration_cap: Option<usize>,
    pub rollout_ticks: u32,
    pub epsilon_0: f64,
    pub epsilon_local: f64,
    pub epsilon_global: f64,
}

impl From<SearchBudget> for SearchParams {
    fn from(b: SearchBudget) -> Self {
        Self {
            turn_budget: b.turn_budget,
            iteration_cap: b.iteration_cap,
            rollout_ticks: b.rollout_ticks,
            epsilon_0: b.epsilon_0,
            epsilon_local: b.epsilon_local,
            epsilon_global: b.epsilon_global,
        }
    }
}

/// Outcome of one `search` call, including enough tree-shape data for tests
/// to check the budget/visit-count testable properties (§8).
pub struct SearchResult {
    pub action: PlayerAction,
    pub iterations: usize,
    pub root_child_visits: Vec<u32>,
}

/// Runs one search for `player` and returns its chosen joint action. Never
/// mutates `root_state`; all lookahead happens on clones (§4.4).
pub fn search<S: RtsState>(
    root_state: &S,
    player: PlayerId,
    opponent: PlayerId,
    prior: &PolicyPrior,
    goals: &StrategicGoals,
    params: SearchParams,
    rng: &mut SmallRng,
) -> Result<SearchResult, SearchError> {
    let root_candidates = sample_candidate_actions(root_state, player, opponent, prior, rng);
    if root_candidates.is_empty() {
        return Ok(SearchResult { action: PlayerAction::empty(), iterations: 0, root_child_visits: vec![] });
    }

    let root_tick = root_state.tick();
    let mut tree = Tree::new(root_state.clone(), root_candidates);
    let deadline = Instant::now() + params.turn_budget;
    let mut iterations = 0usize;

    loop {
        if Instant::now() >= deadline {
            break;
        }
        if let Some(cap) = params.iteration_cap {
            if iterations >= cap {
                break;
            }
        }
        run_one_iteration(&mut tree, player, opponent, prior, goals, &params, root_tick, rng);
        iterations += 1;
    }

    let root_child_visits = tree.nodes[tree.root()].children.iter().map(|&(_, idx, _)| tree.nodes[idx].visit_count).collect();
    let action = select_best_child(&tree, tree.root())?;
    Ok(SearchResult { action, iterations, root_child_visits })
}

fn run_one_iteration<S: RtsState>(
    tree: &mut Tree<S>,
    player: PlayerId,
    opponent: PlayerId,
    prior: &PolicyPrior,
    goals: &StrategicGoals,
    params: &SearchParams,
    root_tick: u32,
    rng: &mut SmallRng,
) {
    let mut path = vec![tree.root()];
    let mut node_idx = tree.root();

    loop {
        let has_untried = !tree.nodes[node_idx].untried_actions.is_empty();
        let has_children = !tree.nodes[node_idx].children.is_empty();

        if !has_untried && !has_children {
            break;
        }

        let expand_now = has_untried && (!has_children || rng.random::<f64>() < params.epsilon_0);
        if expand_now {
            let (action, weight) = pop_weighted(&mut tree.nodes[node_idx].untried_actions, rng);
            let mut next_state = tree.nodes[node_idx].state.clone();
            if next_state.result() == GameResult::Ongoing {
                let opponent_action = sample_uniform_action(&next_state, opponent, rng);
                next_state.advance_tick(make_joint(player, action.clone(), opponent_action));
            }
            let untried = sample_candidate_actions(&next_state, player, opponent, prior, rng);
            let child_idx = tree.add_child(node_idx, action, next_state, untried, weight);
            path.push(child_idx);
            node_idx = child_idx;
            break;
        }

        let use_local = rng.random::<f64>() < params.epsilon_local;
        match select_child(tree, node_idx, use_local) {
            Some(child_idx) => {
                path.push(child_idx);
                node_idx = child_idx;
            }
            None => break,
        }
    }

    let value = simulate(&tree.nodes[node_idx].state, player, opponent, goals, params.rollout_ticks, root_tick, rng);
    tree.backpropagate(&path, value);
}

fn select_child<S: RtsState>(tree: &Tree<S>, node_idx: usize, use_local: bool) -> Option<usize> {
    let children = &tree.nodes[node_idx].children;
    if children.is_empty() {
        return None;
    }

    let mut best: Option<(usize, f64, u32, f64)> = None;
    for &(_, child_idx, prior_weight) in children {
        let child = &tree.nodes[child_idx];
        let score = if use_local {
            child.mean_value()
        } else {
            child.mean_value() + prior_weight / (child.visit_count as f64 + 1.0).sqrt()
        };

        let take = match best {
            None => true,
            Some((_, best_score, best_visits, best_prior)) => {
                if (score - best_score).abs() > 1e-12 {
                    score > best_score
                } else if child.visit_count != best_visits {
                    child.visit_count > best_visits
                } else {
                    prior_weight > best_prior
                }
            }
        };
        if take {
            best = Some((child_idx, score, child.visit_count, prior_weight));
        }
    }
    best.map(|(idx, ..)| idx)
}

/// End-of-budget action selection: highest visit count, ties broken by
/// highest mean evaluation (§4.4).
fn select_best_child<S: RtsState>(tree: &Tree<S>, root: usize) -> Result<PlayerAction, SearchError> {
    let children = &tree.nodes[root].children;
    if children.is_empty() {
        return Err(SearchError::NoLegalActions);
    }

    let mut best_action = None;
    let mut best_visits: i64 = -1;
    let mut best_mean = f64::NEG_INFINITY;
    for (action, child_idx, _) in children {
        let child = &tree.nodes[*child_idx];
        let visits = child.visit_count as i64;
        let better = visits > best_visits || (visits == best_visits && child.mean_value() > best_mean);
        if better {
            best_visits = visits;
            best_mean = child.mean_value();
            best_action = Some(action.clone());
        }
    }
    best_action.ok_or(SearchError::NoLegalActions)
}

fn simulate<S: RtsState>(
    state: &S,
    player: PlayerId,
    opponent: PlayerId,
    goals: &StrategicGoals,
    rollout_ticks: u32,
    root_tick: u32,
    rng: &mut SmallRng,
) -> f64 {
    let mut state = state.clone();
    let mut elapsed_rollout = 0u32;

    while elapsed_rollout < rollout_ticks && state.result() == GameResult::Ongoing {
        let player_action = sample_uniform_action(&state, player, rng);
        let opponent_action = sample_uniform_action(&state, opponent, rng);
        state.advance_tick(make_joint(player, player_action, opponent_action));
        elapsed_rollout += 1;
    }

    let raw = evaluate(player, opponent, &state, goals);
    let elapsed_ticks = state.tick().saturating_sub(root_tick) as f64;
    raw * 0.99_f64.powf(elapsed_ticks / 10.0)
}

fn sample_candidate_actions<S: RtsState>(
    state: &S,
    player: PlayerId,
    opponent: PlayerId,
    prior: &PolicyPrior,
    rng: &mut SmallRng,
) -> Vec<(PlayerAction, f64)> {
    if state.result() != GameResult::Ongoing {
        return Vec::new();
    }
    let units = state.units_of(player);
    if units.is_empty() {
        return Vec::new();
    }

    let mut candidates = Vec::with_capacity(MAX_CANDIDATE_ACTIONS);
    for _ in 0..MAX_CANDIDATE_ACTIONS {
        let mut actions = Vec::with_capacity(units.len());
        let mut weight = 1.0;
        for unit in &units {
            let legal = state.legal_actions(unit.id);
            if legal.is_empty() {
                continue;
            }
            let dist = prior.distribution_for(unit, player, opponent, &legal, state);
            let (chosen, w) = weighted_choice(&legal, &dist, rng);
            weight *= w;
            actions.push(chosen);
        }
        if !actions.is_empty() {
            candidates.push((PlayerAction(actions), weight));
        }
    }

    let total: f64 = candidates.iter().map(|(_, w)| w).sum();
    if total > 0.0 {
        for c in &mut candidates {
            c.1 /= total;
        }
    }
    candidates
}

fn weighted_choice(legal: &[UnitAction], dist: &HashMap<crate::rts::ActionKind, f64>, rng: &mut SmallRng) -> (UnitAction, f64) {
    let weights: Vec<f64> = legal.iter().map(|a| dist.get(&a.kind).copied().unwrap_or(0.1)).collect();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        let idx = rng.random_range(0..legal.len());
        return (legal[idx].clone(), 1.0 / legal.len() as f64);
    }

    let mut r = rng.random::<f64>() * total;
    for (action, w) in legal.iter().zip(weights.iter()) {
        if r < *w {
            return (action.clone(), w / total);
        }
        r -= w;
    }
    (legal[legal.len() - 1].clone(), weights.last().copied().unwrap_or(1.0) / total)
}

fn sample_uniform_action<S: RtsState>(state: &S, player: PlayerId, rng: &mut SmallRng) -> PlayerAction {
    let units = state.units_of(player);
    let mut actions = Vec::with_capacity(units.len());
    for unit in units {
        let legal = state.legal_actions(unit.id);
        if legal.is_empty() {
            continue;
        }
        let idx = rng.random_range(0..legal.len());
        actions.push(legal[idx].clone());
    }
    PlayerAction(actions)
}

fn pop_weighted(untried: &mut Vec<(PlayerAction, f64)>, rng: &mut SmallRng) -> (PlayerAction, f64) {
    let total: f64 = untried.iter().map(|(_, w)| w).sum();
    let mut r = if total > 0.0 { rng.random::<f64>() * total } else { 0.0 };

    let mut chosen_idx = untried.len() - 1;
    for (i, (_, w)) in untried.iter().enumerate() {
        if total <= 0.0 || r < *w {
            chosen_idx = i;
            break;
        }
        r -= w;
    }
    untried.remove(chosen_idx)
}

fn make_joint(player: PlayerId, player_action: PlayerAction, opponent_action: PlayerAction) -> [PlayerAction; 2] {
    if player == 0 {
        [player_action, opponent_action]
    } else {
        [opponent_action, player_action]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rts::{ActionKind, Position, Unit, UnitKind};
    use rand::SeedableRng;

    #[derive(Clone)]
    struct ToyState {
        tick: u32,
        units: Vec<Unit>,
        result: GameResult,
    }

    impl RtsState for ToyState {
        fn tick(&self) -> u32 {
            self.tick
        }
        fn advance_tick(&mut self, _actions: [PlayerAction; 2]) {
            self.tick += 1;
            if self.tick >= 20 {
                self.result = GameResult::Win(0);
            }
        }
        fn units(&self) -> &[Unit] {
            &self.units
        }
        fn legal_actions(&self, unit: crate::rts::UnitId) -> Vec<UnitAction> {
            vec![
                UnitAction::none(unit),
                UnitAction { unit, kind: ActionKind::Move, target_position: Some(Position::new(1, 0)), target_unit: None, produced_kind: None },
            ]
        }
        fn nearest_resource_to(&self, _from: Position) -> Option<Position> {
            None
        }
        fn result(&self) -> GameResult {
            self.result
        }
        fn resources(&self, _player: PlayerId) -> u32 {
            0
        }
        fn production_cost_threshold(&self, _player: PlayerId) -> u32 {
            10
        }
    }

    fn toy_state() -> ToyState {
        ToyState {
            tick: 0,
            units: vec![
                Unit { id: 1, owner: 0, kind: UnitKind::Attacker, position: Position::new(0, 0), hp: 10, max_hp: 10, carried_resources: 0, production_cost: 10 },
                Unit { id: 2, owner: 1, kind: UnitKind::Attacker, position: Position::new(5, 5), hp: 10, max_hp: 10, carried_resources: 0, production_cost: 10 },
            ],
            result: GameResult::Ongoing,
        }
    }

    #[test]
    fn seed_scenario_6_budget_respected_and_visits_recorded() {
        let state = toy_state();
        let prior = PolicyPrior::new(300);
        let goals = StrategicGoals::default();
        let params = SearchParams {
            turn_budget: Duration::from_millis(200),
            iteration_cap: None,
            rollout_ticks: 20,
            epsilon_0: 0.3,
            epsilon_local: 0.5,
            epsilon_global: 0.5,
        };
        let mut rng = SmallRng::seed_from_u64(42);

        let start = Instant::now();
        let result = search(&state, 0, 1, &prior, &goals, params, &mut rng).unwrap();
        let elapsed = start.elapsed();

        assert!(elapsed < Duration::from_millis(250));
        assert!(result.root_child_visits.iter().any(|&v| v > 0));
    }

    #[test]
    fn no_legal_actions_yields_empty_action() {
        let mut state = toy_state();
        state.units.clear();
        let prior = PolicyPrior::new(300);
        let goals = StrategicGoals::default();
        let params = SearchParams {
            turn_budget: Duration::from_millis(10),
            iteration_cap: Some(5),
            rollout_ticks: 5,
            epsilon_0: 0.1,
            epsilon_local: 0.5,
            epsilon_global: 0.5,
        };
        let mut rng = SmallRng::seed_from_u64(1);
        let result = search(&state, 0, 1, &prior, &goals, params, &mut rng).unwrap();
        assert!(result.action.is_empty());
    }
}
