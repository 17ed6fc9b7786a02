//! C7's rule strategies (§4.7): the eight named states of the hybrid agent's
//! FSM, each a deterministic per-tick action generator over four tactical
//! scalars supplied by the goal-selecting LLM call.
//!
//! The simulator's unit roster (§3) is coarser than the strategy names
//! suggest — one `Attacker` kind rather than separate light/heavy/ranged
//! units — so the rush variants differ in their tactical defaults and target
//! preference rather than in unit composition; see `DESIGN.md`.

use crate::rts::{ActionKind, PlayerId, Position, RtsState, Unit, UnitAction, UnitKind};

use super::controller::TacticalParams;

/// One of the eight named rule states a hybrid agent can occupy (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleStrategy {
    WorkerRush,
    LightRush,
    HeavyRush,
    RangedRush,
    TurtleDefense,
    BoomEconomy,
    CounterAttack,
    Harass,
}

impl RuleStrategy {
    pub fn parse(name: &str) -> Option<Self> {
        use RuleStrategy::*;
        Some(match name {
            "worker-rush" => WorkerRush,
            "light-rush" => LightRush,
            "heavy-rush" => HeavyRush,
            "ranged-rush" => RangedRush,
            "turtle-defense" => TurtleDefense,
            "boom-economy" => BoomEconomy,
            "counter-attack" => CounterAttack,
            "harass" => Harass,
            _ => return None,
        })
    }

    /// Whether this strategy favors committing attackers forward this tick,
    /// given the tactical `aggression` scalar. Defensive/economic states only
    /// attack when the enemy is already in range; rush/harass states push
    /// out once aggression crosses a lower bar.
    fn attacks_opportunistically(self, aggression: f64) -> bool {
        match self {
            RuleStrategy::TurtleDefense | RuleStrategy::BoomEconomy => false,
            RuleStrategy::CounterAttack => aggression > 0.6,
            RuleStrategy::Harass | RuleStrategy::WorkerRush => aggression > 0.3,
            RuleStrategy::LightRush | RuleStrategy::HeavyRush | RuleStrategy::RangedRush => aggression > 0.2,
        }
    }

    fn favors_producing_harvesters(self, economy_priority: f64) -> bool {
        matches!(self, RuleStrategy::BoomEconomy | RuleStrategy::TurtleDefense) || economy_priority > 0.6
    }
}

/// Generates one unit's action under `strategy`'s rules. Harvesters harvest
/// or return when a legal action allows it; producers build whichever kind
/// the strategy currently favors; attackers move toward, and attack,
/// `params.primary_target`'s nearest representative once in range, retreat
/// toward the owner's base otherwise.
pub fn act_for_unit<S: RtsState>(
    strategy: RuleStrategy,
    unit: &Unit,
    owner: PlayerId,
    opponent: PlayerId,
    state: &S,
    params: &TacticalParams,
) -> UnitAction {
    let legal = state.legal_actions(unit.id);
    if legal.is_empty() {
        return UnitAction::none(unit.id);
    }

    match unit.kind {
        UnitKind::Harvester => pick_harvester_action(&legal, strategy, params),
        UnitKind::Producer => pick_producer_action(&legal, strategy, params),
        UnitKind::Stockpile => legal.into_iter().find(|a| a.kind == ActionKind::None).unwrap_or_else(|| UnitAction::none(unit.id)),
        UnitKind::Attacker => pick_attacker_action(&legal, unit, owner, opponent, state, strategy, params),
    }
}

fn pick_harvester_action(legal: &[UnitAction], strategy: RuleStrategy, params: &TacticalParams) -> UnitAction {
    let prefer_return = legal.iter().find(|a| a.kind == ActionKind::Return);
    let prefer_harvest = legal.iter().find(|a| a.kind == ActionKind::Harvest);

    // Worker-rush sends idle workers to fight once aggression is high enough;
    // every other strategy keeps workers on the economy.
    if strategy == RuleStrategy::WorkerRush && params.aggression > 0.7 {
        if let Some(attack) = legal.iter().find(|a| a.kind == ActionKind::Attack) {
            return attack.clone();
        }
    }

    prefer_return.or(prefer_harvest).cloned().unwrap_or_else(|| legal[0].clone())
}

fn pick_producer_action(legal: &[UnitAction], strategy: RuleStrategy, params: &TacticalParams) -> UnitAction {
    let produce_harvester = legal.iter().find(|a| a.kind == ActionKind::Produce && a.produced_kind == Some(UnitKind::Harvester));
    let produce_attacker = legal.iter().find(|a| a.kind == ActionKind::Produce && a.produced_kind == Some(UnitKind::Attacker));
    let any_produce = legal.iter().find(|a| a.kind == ActionKind::Produce);

    if strategy.favors_producing_harvesters(params.economy_priority) {
        produce_harvester.or(any_produce).or(produce_attacker)
    } else {
        produce_attacker.or(any_produce).or(produce_harvester)
    }
    .cloned()
    .unwrap_or_else(|| legal[0].clone())
}

fn pick_attacker_action<S: RtsState>(
    legal: &[UnitAction],
    unit: &Unit,
    owner: PlayerId,
    opponent: PlayerId,
    state: &S,
    strategy: RuleStrategy,
    params: &TacticalParams,
) -> UnitAction {
    let attack = legal.iter().find(|a| {
        a.kind == ActionKind::Attack
            && a.target_unit
                .and_then(|id| state.units().iter().find(|u| u.id == id))
                .is_some_and(|target| matches_target(target, params.primary_target))
    });
    if let Some(attack) = attack {
        return attack.clone();
    }
    // No matching target in range: any attack beats nothing.
    if let Some(attack) = legal.iter().find(|a| a.kind == ActionKind::Attack) {
        if strategy.attacks_opportunistically(params.aggression) {
            return attack.clone();
        }
    }

    let landmark = match params.primary_target {
        super::controller::PrimaryTarget::Base | super::controller::PrimaryTarget::Workers => preferred_enemy_position(state, opponent, params),
        super::controller::PrimaryTarget::Army => preferred_enemy_position(state, opponent, params),
    };
    let move_action = legal.iter().find(|a| a.kind == ActionKind::Move && a.target_position.is_some());
    if let (Some(landmark), Some(_)) = (landmark, move_action) {
        if let Some(best) = legal
            .iter()
            .filter(|a| a.kind == ActionKind::Move)
            .min_by_key(|a| a.target_position.map(|p| p.manhattan(&landmark)).unwrap_or(u32::MAX))
        {
            return best.clone();
        }
    }

    let _ = owner;
    legal.iter().find(|a| a.kind == ActionKind::None).cloned().unwrap_or_else(|| UnitAction::none(unit.id))
}

fn matches_target(target: &Unit, primary_target: super::controller::PrimaryTarget) -> bool {
    use super::controller::PrimaryTarget::*;
    match primary_target {
        Base => target.kind == UnitKind::Stockpile,
        Workers => target.kind == UnitKind::Harvester,
        Army => target.kind == UnitKind::Attacker,
    }
}

fn preferred_enemy_position<S: RtsState>(state: &S, opponent: PlayerId, params: &TacticalParams) -> Option<Position> {
    let enemies = state.units_of(opponent);
    let preferred = enemies.iter().find(|u| matches_target(u, params.primary_target));
    preferred.or_else(|| enemies.first()).map(|u| u.position)
}
