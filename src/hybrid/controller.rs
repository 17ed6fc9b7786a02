//! C7's hybrid strategy agent (§4.7): a lightweight LLM-guided FSM that is
//! competitive without lookahead. LLM calls happen every
//! `base_interval_ticks` (or `combat_interval_ticks` while in combat) and
//! name the next rule strategy plus four tactical scalars; a strength-ratio
//! retreat override can preempt the LLM's choice unconditionally.

use serde::Deserialize;
use tracing::warn;

use crate::config::HybridTiming;
use crate::llm::client::{GenerateOptions, LlmGenerator};
use crate::llm::json_extract::parse_json;
use crate::rts::{PlayerAction, PlayerId, RtsState, UnitKind};

use super::strategy::{act_for_unit, RuleStrategy};

const COMBAT_RANGE: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryTarget {
    Base,
    Workers,
    Army,
}

/// The four clamped tactical scalars the LLM call returns alongside the next
/// strategy name (§4.7).
#[derive(Debug, Clone, Copy)]
pub struct TacticalParams {
    pub aggression: f64,
    pub economy_priority: f64,
    pub retreat_threshold: f64,
    pub primary_target: PrimaryTarget,
}

impl Default for TacticalParams {
    fn default() -> Self {
        Self {
            aggression: 0.5,
            economy_priority: 0.5,
            retreat_threshold: 0.3,
            primary_target: PrimaryTarget::Base,
        }
    }
}

#[derive(Debug, Deserialize)]
struct HybridResponse {
    strategy: String,
    #[serde(default)]
    aggression: Option<f64>,
    #[serde(default)]
    #[serde(rename = "economy-priority")]
    economy_priority: Option<f64>,
    #[serde(default)]
    #[serde(rename = "retreat-threshold")]
    retreat_threshold: Option<f64>,
    #[serde(default)]
    #[serde(rename = "primary-target")]
    primary_target: Option<PrimaryTarget>,
}

/// Per-unit-kind strength weights for the retreat-override strength
/// comparison (§4.7). The simulator only distinguishes `Attacker` among
/// combat-capable kinds, so all attackers use the "light" weight; a coarser
/// roster than the spec's worker/light/heavy/ranged split — see `DESIGN.md`.
fn strength_weight(kind: UnitKind) -> f64 {
    match kind {
        UnitKind::Harvester => 1.0,
        UnitKind::Attacker => 2.0,
        UnitKind::Stockpile | UnitKind::Producer => 0.0,
    }
}

pub struct HybridAgent {
    player: PlayerId,
    opponent: PlayerId,
    strategy: RuleStrategy,
    params: TacticalParams,
    timing: HybridTiming,
    last_call_tick: Option<u32>,
}

impl HybridAgent {
    pub fn new(player: PlayerId, opponent: PlayerId, timing: HybridTiming) -> Self {
        Self {
            player,
            opponent,
            strategy: RuleStrategy::BoomEconomy,
            params: TacticalParams::default(),
            timing,
            last_call_tick: None,
        }
    }

    pub fn strategy(&self) -> RuleStrategy {
        self.strategy
    }

    pub fn get_action<S: RtsState>(&mut self, state: &S, llm: &dyn LlmGenerator, options: &GenerateOptions) -> PlayerAction {
        let tick = state.tick();
        let in_combat = self.in_combat(state);
        let interval = if in_combat { self.timing.combat_interval_ticks } else { self.timing.base_interval_ticks };
        let due = match self.last_call_tick {
            None => true,
            Some(last) => tick.saturating_sub(last) >= interval,
        };
        if due {
            self.last_call_tick = Some(tick);
            self.consult_llm(state, llm, options);
        }

        if in_combat && self.own_strength(state) < self.params.retreat_threshold * self.enemy_strength(state) {
            self.strategy = RuleStrategy::CounterAttack;
        }

        let actions = state
            .units_of(self.player)
            .into_iter()
            .map(|unit| act_for_unit(self.strategy, unit, self.player, self.opponent, state, &self.params))
            .collect();
        PlayerAction(actions)
    }

    fn consult_llm<S: RtsState>(&mut self, state: &S, llm: &dyn LlmGenerator, options: &GenerateOptions) {
        let prompt = format!(
            "Given the current RTS match state (tick {}, our resources {}, our units {}, enemy units {}), \
             return a JSON object with \"strategy\" naming one of worker-rush, light-rush, heavy-rush, \
             ranged-rush, turtle-defense, boom-economy, counter-attack, harass, plus numeric \
             \"aggression\", \"economy-priority\", \"retreat-threshold\" in [0,1] and \"primary-target\" \
             naming one of base, workers, army.",
            state.tick(),
            state.resources(self.player),
            state.units_of(self.player).len(),
            state.units_of(self.opponent).len(),
        );

        match llm.generate(&prompt, options) {
            Ok(text) => self.apply_response(&text),
            Err(e) => warn!("hybrid strategy refresh failed, keeping {:?}: {e}", self.strategy),
        }
    }

    fn apply_response(&mut self, text: &str) {
        match parse_json::<HybridResponse>(text) {
            Ok(response) => self.ingest(response),
            Err(_) => match fallback_strategy_name(text) {
                Some(strategy) => {
                    warn!("hybrid response was not valid JSON, recovered strategy {:?} from plain text", strategy);
                    self.strategy = strategy;
                }
                None => warn!("hybrid response unparsable and no recognized strategy name found, keeping {:?}", self.strategy),
            },
        }
    }

    fn ingest(&mut self, response: HybridResponse) {
        match RuleStrategy::parse(&response.strategy) {
            Some(strategy) => self.strategy = strategy,
            None => {
                if let Some(strategy) = fallback_strategy_name(&response.strategy) {
                    self.strategy = strategy;
                } else {
                    warn!("hybrid response named unrecognized strategy '{}', keeping {:?}", response.strategy, self.strategy);
                }
            }
        }
        if let Some(v) = response.aggression {
            self.params.aggression = v.clamp(0.0, 1.0);
        }
        if let Some(v) = response.economy_priority {
            self.params.economy_priority = v.clamp(0.0, 1.0);
        }
        if let Some(v) = response.retreat_threshold {
            self.params.retreat_threshold = v.clamp(0.0, 1.0);
        }
        if let Some(t) = response.primary_target {
            self.params.primary_target = t;
        }
    }

    fn in_combat<S: RtsState>(&self, state: &S) -> bool {
        let own = state.units_of(self.player);
        let enemies = state.units_of(self.opponent);
        own.iter()
            .filter(|u| u.kind == UnitKind::Attacker)
            .any(|u| enemies.iter().any(|e| u.position.manhattan(&e.position) <= COMBAT_RANGE))
    }

    fn own_strength<S: RtsState>(&self, state: &S) -> f64 {
        state.units_of(self.player).iter().map(|u| strength_weight(u.kind)).sum()
    }

    fn enemy_strength<S: RtsState>(&self, state: &S) -> f64 {
        state.units_of(self.opponent).iter().map(|u| strength_weight(u.kind)).sum()
    }
}

/// Scans free text for any of the eight recognized strategy names, used when
/// the LLM response isn't valid JSON at all (§4.7 "a plain-text fallback
/// scans the response body for any recognized strategy name").
fn fallback_strategy_name(text: &str) -> Option<RuleStrategy> {
    const NAMES: &[&str] = &[
        "worker-rush",
        "light-rush",
        "heavy-rush",
        "ranged-rush",
        "turtle-defense",
        "boom-economy",
        "counter-attack",
        "harass",
    ];
    let lower = text.to_lowercase();
    NAMES.iter().find(|name| lower.contains(*name)).and_then(|name| RuleStrategy::parse(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::rts::{ActionKind, GameResult, Position, Unit, UnitAction};

    #[derive(Clone)]
    struct FixtureState {
        units: Vec<Unit>,
        tick: u32,
    }

    impl RtsState for FixtureState {
        fn tick(&self) -> u32 {
            self.tick
        }
        fn advance_tick(&mut self, _actions: [PlayerAction; 2]) {
            self.tick += 1;
        }
        fn units(&self) -> &[Unit] {
            &self.units
        }
        fn legal_actions(&self, unit: crate::rts::UnitId) -> Vec<UnitAction> {
            vec![UnitAction::none(unit)]
        }
        fn nearest_resource_to(&self, _from: Position) -> Option<Position> {
            None
        }
        fn result(&self) -> GameResult {
            GameResult::Ongoing
        }
        fn resources(&self, _player: PlayerId) -> u32 {
            0
        }
        fn production_cost_threshold(&self, _player: PlayerId) -> u32 {
            10
        }
    }

    fn attacker(id: u32, owner: PlayerId, pos: Position) -> Unit {
        Unit { id, owner, kind: UnitKind::Attacker, position: pos, hp: 10, max_hp: 10, carried_resources: 0, production_cost: 50 }
    }

    struct FailingLlm;
    impl LlmGenerator for FailingLlm {
        fn generate(&self, _prompt: &str, _options: &GenerateOptions) -> Result<String, LlmError> {
            Err(LlmError::NoJsonObject)
        }
    }

    #[test]
    fn plain_text_fallback_recovers_strategy_name() {
        assert_eq!(fallback_strategy_name("I think turtle-defense is best here."), Some(RuleStrategy::TurtleDefense));
        assert_eq!(fallback_strategy_name("totally unrelated text"), None);
    }

    #[test]
    fn retreat_override_fires_when_outnumbered_in_combat() {
        let state = FixtureState {
            units: vec![attacker(1, 0, Position::new(0, 0)), attacker(2, 1, Position::new(1, 0)), attacker(3, 1, Position::new(1, 1))],
            tick: 0,
        };
        let mut agent = HybridAgent::new(0, 1, HybridTiming::default());
        agent.strategy = RuleStrategy::WorkerRush;
        agent.params.retreat_threshold = 0.9;

        let llm = FailingLlm;
        let options = GenerateOptions::new("test");
        agent.get_action(&state, &llm, &options);

        assert_eq!(agent.strategy(), RuleStrategy::CounterAttack);
    }

    #[test]
    fn llm_failure_keeps_last_accepted_strategy() {
        let state = FixtureState { units: vec![], tick: 0 };
        let mut agent = HybridAgent::new(0, 1, HybridTiming::default());
        agent.strategy = RuleStrategy::Harass;
        let llm = FailingLlm;
        let options = GenerateOptions::new("test");

        agent.get_action(&state, &llm, &options);

        assert_eq!(agent.strategy(), RuleStrategy::Harass);
    }
}
