//! Situation classification (§3, §4.5 step 1): the lookup key for C5's
//! per-unit policy prior.

use crate::rts::{PlayerId, RtsState, Unit, UnitKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Situation {
    WorkerNearResource,
    WorkerIdle,
    WorkerCarrying,
    MilitaryInCombat,
    MilitaryNotInCombat,
    BaseEconomy,
    BaseLowResources,
    Barracks,
}

const NEAR_RESOURCE_RANGE: u32 = 3;
const COMBAT_RANGE: u32 = 5;

/// Classifies one unit into exactly one [`Situation`] given the current
/// state — a total function (§8: every unit in every state maps to
/// exactly one situation).
pub fn classify<S: RtsState>(unit: &Unit, owner: PlayerId, opponent: PlayerId, state: &S) -> Situation {
    match unit.kind {
        UnitKind::Harvester => {
            if unit.carried_resources > 0 {
                Situation::WorkerCarrying
            } else if near_a_resource(unit, state) {
                Situation::WorkerNearResource
            } else {
                Situation::WorkerIdle
            }
        }
        UnitKind::Attacker => {
            if in_combat(unit, opponent, state) {
                Situation::MilitaryInCombat
            } else {
                Situation::MilitaryNotInCombat
            }
        }
        UnitKind::Producer => Situation::Barracks,
        UnitKind::Stockpile => {
            if state.resources(owner) < state.production_cost_threshold(owner) {
                Situation::BaseLowResources
            } else {
                Situation::BaseEconomy
            }
        }
    }
}

fn near_a_resource<S: RtsState>(unit: &Unit, state: &S) -> bool {
    state
        .nearest_resource_to(unit.position)
        .map(|pos| unit.position.manhattan(&pos) <= NEAR_RESOURCE_RANGE)
        .unwrap_or(false)
}

fn in_combat<S: RtsState>(unit: &Unit, opponent: PlayerId, state: &S) -> bool {
    state
        .units_of(opponent)
        .iter()
        .any(|enemy| unit.position.manhattan(&enemy.position) <= COMBAT_RANGE)
}
