//! C5: the policy prior cache (§4.5). Turns a (unit, game state) into a
//! normalized probability distribution over that unit's legal actions, with
//! built-in defaults that may be overwritten by an LLM refresh.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::warn;

use crate::llm::client::{GenerateOptions, LlmGenerator};
use crate::llm::fallback::DegradedChannel;
use crate::llm::json_extract::parse_json;
use crate::rts::{ActionKind, PlayerId, Position, RtsState, Unit, UnitAction, UnitKind};

use super::situation::{classify, Situation};

const UNKNOWN_KIND_WEIGHT: f64 = 0.1;

fn default_table() -> HashMap<Situation, HashMap<ActionKind, f64>> {
    use ActionKind::*;
    use Situation::*;

    HashMap::from([
        (WorkerNearResource, HashMap::from([(Harvest, 0.8), (Move, 0.2)])),
        (WorkerIdle, HashMap::from([(Move, 0.7), (Harvest, 0.3)])),
        (WorkerCarrying, HashMap::from([(Return, 0.9), (Move, 0.1)])),
        (MilitaryInCombat, HashMap::from([(Attack, 0.8), (Move, 0.2)])),
        (MilitaryNotInCombat, HashMap::from([(Move, 0.6), (Attack, 0.4)])),
        (BaseEconomy, HashMap::from([(Produce, 0.5), (None, 0.5)])),
        (BaseLowResources, HashMap::from([(Produce, 0.3), (None, 0.7)])),
        (Barracks, HashMap::from([(Produce, 0.6), (None, 0.4)])),
    ])
}

/// The shape of an LLM prior-refresh response: `{situation: {kind: weight}}`
/// with string keys, parsed and matched against the known enum names so an
/// unrecognized key is skipped rather than rejecting the whole refresh (§7
/// "Schema error... skip the offending field, keep others").
#[derive(Debug, Deserialize)]
struct PriorRefreshResponse(HashMap<String, HashMap<String, f64>>);

/// C5's cached prior table plus its own degraded-channel bookkeeping (§4.3's
/// fallback shape, reused here per §4.5's refresh protocol).
pub struct PolicyPrior {
    table: HashMap<Situation, HashMap<ActionKind, f64>>,
    channel: DegradedChannel,
    last_refresh_tick: Option<u32>,
    cache_ticks: u32,
}

impl PolicyPrior {
    pub fn new(cache_ticks: u32) -> Self {
        Self {
            table: default_table(),
            channel: DegradedChannel::default(),
            last_refresh_tick: None,
            cache_ticks,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.channel.is_degraded()
    }

    /// §4.5 steps 2-4: look up the action-kind's weight for this unit's
    /// situation, apply positional adjustments, normalize to sum 1. An empty
    /// legal-action set returns an empty distribution (§8).
    pub fn distribution_for<S: RtsState>(
        &self,
        unit: &Unit,
        owner: PlayerId,
        opponent: PlayerId,
        legal: &[UnitAction],
        state: &S,
    ) -> HashMap<ActionKind, f64> {
        if legal.is_empty() {
            return HashMap::new();
        }

        let situation = classify(unit, owner, opponent, state);
        let kind_weights = self.table.get(&situation);

        let mut raw: HashMap<ActionKind, f64> = HashMap::new();
        for action in legal {
            let base = kind_weights
                .and_then(|t| t.get(&action.kind))
                .copied()
                .unwrap_or(UNKNOWN_KIND_WEIGHT);
            let adjusted = apply_positional_adjustment(base, situation, action, unit, opponent, state);
            *raw.entry(action.kind).or_insert(0.0) += adjusted;
        }

        let total: f64 = raw.values().sum();
        if total <= 0.0 {
            let uniform = 1.0 / raw.len().max(1) as f64;
            return raw.into_keys().map(|k| (k, uniform)).collect();
        }
        raw.into_iter().map(|(k, v)| (k, v / total)).collect()
    }

    /// Calls C3 at most once per `cache_ticks` window, and never from inside
    /// a tree expansion (§4.5 refresh protocol). On malformed response, logs
    /// and leaves the cached table unchanged.
    pub fn maybe_refresh(&mut self, current_tick: u32, llm: &dyn LlmGenerator, options: &GenerateOptions, prompt: &str) {
        let due = match self.last_refresh_tick {
            None => true,
            Some(last) => current_tick.saturating_sub(last) >= self.cache_ticks,
        };
        if !due {
            return;
        }
        self.last_refresh_tick = Some(current_tick);

        match llm.generate(prompt, options).and_then(|text| parse_json::<PriorRefreshResponse>(&text)) {
            Ok(response) => {
                self.apply_refresh(response);
                self.channel.record_success();
            }
            Err(e) => {
                warn!("policy prior refresh failed, keeping cached table: {e}");
                self.channel.record_failure();
            }
        }
    }

    fn apply_refresh(&mut self, response: PriorRefreshResponse) {
        for (situation_name, kinds) in response.0 {
            let Some(situation) = parse_situation_name(&situation_name) else {
                continue;
            };
            let mut kind_map = HashMap::new();
            for (kind_name, weight) in kinds {
                if let Some(kind) = parse_action_kind_name(&kind_name) {
                    kind_map.insert(kind, weight);
                }
            }
            if !kind_map.is_empty() {
                self.table.insert(situation, kind_map);
            }
        }
    }
}

fn parse_situation_name(name: &str) -> Option<Situation> {
    use Situation::*;
    Some(match name {
        "worker-near-resource" => WorkerNearResource,
        "worker-idle" => WorkerIdle,
        "worker-carrying" => WorkerCarrying,
        "military-in-combat" => MilitaryInCombat,
        "military-not-in-combat" => MilitaryNotInCombat,
        "base-economy" => BaseEconomy,
        "base-low-resources" => BaseLowResources,
        "barracks" => Barracks,
        _ => return None,
    })
}

fn parse_action_kind_name(name: &str) -> Option<ActionKind> {
    use ActionKind::*;
    Some(match name {
        "none" => None,
        "move" => Move,
        "harvest" => Harvest,
        "return" => Return,
        "produce" => Produce,
        "attack" => Attack,
        _ => return None,
    })
}

fn apply_positional_adjustment<S: RtsState>(
    base: f64,
    situation: Situation,
    action: &UnitAction,
    unit: &Unit,
    opponent: PlayerId,
    state: &S,
) -> f64 {
    let mut weight = base;

    if situation == Situation::MilitaryNotInCombat
        && action.kind == ActionKind::Move
        && moves_toward(action.target_position, unit.position, nearest_enemy(unit, opponent, state))
    {
        weight *= 1.5;
    }

    if situation == Situation::WorkerIdle
        && action.kind == ActionKind::Move
        && moves_toward(action.target_position, unit.position, state.nearest_resource_to(unit.position))
    {
        weight *= 1.5;
    }

    if action.kind == ActionKind::Attack {
        if let Some(target) = action.target_unit.and_then(|id| find_unit(state, id)) {
            weight *= match target.kind {
                UnitKind::Stockpile => 2.0,
                UnitKind::Harvester => 1.5,
                _ => 1.0,
            };
        }
    }

    if action.kind == ActionKind::Produce {
        match action.produced_kind {
            Some(UnitKind::Harvester) if situation == Situation::BaseEconomy => weight *= 1.2,
            Some(UnitKind::Attacker) => weight *= 1.3,
            _ => {}
        }
    }

    weight
}

fn nearest_enemy<S: RtsState>(unit: &Unit, opponent: PlayerId, state: &S) -> Option<Position> {
    state
        .units_of(opponent)
        .iter()
        .min_by_key(|enemy| unit.position.manhattan(&enemy.position))
        .map(|enemy| enemy.position)
}

fn moves_toward(target: Option<Position>, from: Position, landmark: Option<Position>) -> bool {
    match (target, landmark) {
        (Some(target), Some(landmark)) => target.manhattan(&landmark) < from.manhattan(&landmark),
        _ => false,
    }
}

fn find_unit<S: RtsState>(state: &S, id: crate::rts::UnitId) -> Option<&Unit> {
    state.units().iter().find(|u| u.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rts::{GameResult, PlayerAction};

    #[derive(Clone)]
    struct FixtureState {
        units: Vec<Unit>,
    }

    impl RtsState for FixtureState {
        fn tick(&self) -> u32 {
            0
        }
        fn advance_tick(&mut self, _actions: [PlayerAction; 2]) {}
        fn units(&self) -> &[Unit] {
            &self.units
        }
        fn legal_actions(&self, _unit: crate::rts::UnitId) -> Vec<UnitAction> {
            Vec::new()
        }
        fn nearest_resource_to(&self, _from: Position) -> Option<Position> {
            None
        }
        fn result(&self) -> GameResult {
            GameResult::Ongoing
        }
        fn resources(&self, _player: PlayerId) -> u32 {
            100
        }
        fn production_cost_threshold(&self, _player: PlayerId) -> u32 {
            10
        }
    }

    fn unit(id: u32, kind: UnitKind, pos: Position) -> Unit {
        Unit { id, owner: 0, kind, position: pos, hp: 10, max_hp: 10, carried_resources: 0, production_cost: 50 }
    }

    #[test]
    fn distribution_sums_to_one() {
        let prior = PolicyPrior::new(300);
        let state = FixtureState { units: vec![] };
        let u = unit(1, UnitKind::Attacker, Position::new(0, 0));
        let legal = vec![
            UnitAction { unit: 1, kind: ActionKind::Move, target_position: Some(Position::new(1, 0)), target_unit: None, produced_kind: None },
            UnitAction { unit: 1, kind: ActionKind::Attack, target_position: None, target_unit: Some(2), produced_kind: None },
        ];
        let dist = prior.distribution_for(&u, 0, 1, &legal, &state);
        let total: f64 = dist.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(dist.values().all(|&w| w >= 0.0));
    }

    #[test]
    fn empty_legal_actions_yields_empty_distribution() {
        let prior = PolicyPrior::new(300);
        let state = FixtureState { units: vec![] };
        let u = unit(1, UnitKind::Harvester, Position::new(0, 0));
        let dist = prior.distribution_for(&u, 0, 1, &[], &state);
        assert!(dist.is_empty());
    }

    #[test]
    fn attack_on_stockpile_outweighs_attack_on_harvester() {
        // Give the attacker a no-op alternative so the Attack share isn't
        // forced to 1.0 by normalization, letting the 2.0x vs 1.5x
        // positional adjustment actually show up in the resulting weights.
        let prior = PolicyPrior::new(300);
        let stockpile = unit(9, UnitKind::Stockpile, Position::new(5, 5));
        let harvester = unit(8, UnitKind::Harvester, Position::new(5, 5));
        let state = FixtureState { units: vec![stockpile.clone(), harvester.clone()] };
        let attacker = unit(1, UnitKind::Attacker, Position::new(5, 4));
        let wait = UnitAction::none(1);

        let legal_vs_stockpile = vec![
            wait.clone(),
            UnitAction { unit: 1, kind: ActionKind::Attack, target_position: None, target_unit: Some(stockpile.id), produced_kind: None },
        ];
        let legal_vs_harvester = vec![
            wait,
            UnitAction { unit: 1, kind: ActionKind::Attack, target_position: None, target_unit: Some(harvester.id), produced_kind: None },
        ];

        let dist_stockpile = prior.distribution_for(&attacker, 0, 1, &legal_vs_stockpile, &state);
        let dist_harvester = prior.distribution_for(&attacker, 0, 1, &legal_vs_harvester, &state);

        let stockpile_share = dist_stockpile[&ActionKind::Attack];
        let harvester_share = dist_harvester[&ActionKind::Attack];
        assert!(stockpile_share > harvester_share);
    }
}
