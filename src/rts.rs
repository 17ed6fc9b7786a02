//! The boundary trait for the RTS rules engine and map loader.
//!
//! §1 treats the simulator as an external collaborator: "only their
//! interfaces matter". This module is the Rust expression of that interface,
//! generalizing the teacher's `game_interface::Game` trait (apply action /
//! get state / is finished / player score) to what an RTS agent needs:
//! advancing one tick, listing units, enumerating legal per-unit actions,
//! querying win/loss, and cloning state for MCTS lookahead.

use std::fmt;

/// Which side a unit or player belongs to. Exactly two players per match.
pub type PlayerId = usize;

/// Stable identifier for a single unit within one game.
pub type UnitId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance, used throughout §3/§4 for proximity checks
    /// (near-resource, in-combat range, etc.).
    pub fn manhattan(&self, other: &Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// Kinds of units the classifier and evaluation function reason about (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Harvester,
    Attacker,
    Stockpile,
    Producer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub id: UnitId,
    pub owner: PlayerId,
    pub kind: UnitKind,
    pub position: Position,
    pub hp: u32,
    pub max_hp: u32,
    pub carried_resources: u32,
    pub production_cost: u32,
}

impl Unit {
    pub fn hp_ratio(&self) -> f64 {
        if self.max_hp == 0 {
            0.0
        } else {
            self.hp as f64 / self.max_hp as f64
        }
    }
}

/// The closed set of action kinds a unit may be given (§3 "Action kinds").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    None,
    Move,
    Harvest,
    Return,
    Produce,
    Attack,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionKind::None => "none",
            ActionKind::Move => "move",
            ActionKind::Harvest => "harvest",
            ActionKind::Return => "return",
            ActionKind::Produce => "produce",
            ActionKind::Attack => "attack",
        };
        write!(f, "{s}")
    }
}

/// A single unit's chosen action for the current tick.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitAction {
    pub unit: UnitId,
    pub kind: ActionKind,
    pub target_position: Option<Position>,
    pub target_unit: Option<UnitId>,
    /// Set only for `Produce` actions, so the policy prior's positional
    /// adjustment (§4.5: "produce a harvester... produce a combat unit...")
    /// can tell what's being built without re-deriving it from cost alone.
    pub produced_kind: Option<UnitKind>,
}

impl UnitAction {
    pub fn none(unit: UnitId) -> Self {
        Self {
            unit,
            kind: ActionKind::None,
            target_position: None,
            target_unit: None,
            produced_kind: None,
        }
    }
}

/// The joint action for every unit a single player controls this tick.
///
/// §5's fairness axiom depends on the simulator composing both sides'
/// `PlayerAction` deterministically and advancing exactly one tick per call —
/// this type is what both C4 and C7 produce as their `getAction` result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerAction(pub Vec<UnitAction>);

impl PlayerAction {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    Ongoing,
    Win(PlayerId),
    Draw,
}

/// What the RTS engine must provide. Implemented by the (out-of-scope)
/// simulator; a minimal in-memory implementation lives under `#[cfg(test)]`
/// in this crate's test suite so C4/C5/C6/C7 can be exercised without a real
/// engine.
pub trait RtsState: Clone {
    fn tick(&self) -> u32;

    /// Advances the simulation exactly one tick, applying both players'
    /// joint actions. The simulator, not the caller, enforces that each side
    /// gets exactly one decision per tick (§5 fairness axiom).
    fn advance_tick(&mut self, actions: [PlayerAction; 2]);

    fn units(&self) -> &[Unit];

    fn units_of(&self, player: PlayerId) -> Vec<&Unit> {
        self.units().iter().filter(|u| u.owner == player).collect()
    }

    /// Legal actions for one unit in the current state.
    fn legal_actions(&self, unit: UnitId) -> Vec<UnitAction>;

    /// Position of the nearest harvestable resource node to `from`, if any
    /// remain on the map. Backs the situation classifier's near-resource
    /// check and the policy prior's "moves toward nearest resource"
    /// positional adjustment (§3, §4.5).
    fn nearest_resource_to(&self, from: Position) -> Option<Position>;

    fn result(&self) -> GameResult;

    fn resources(&self, player: PlayerId) -> u32;

    /// Cost threshold used by the situation classifier's
    /// "base-low-resources" check (§3).
    fn production_cost_threshold(&self, player: PlayerId) -> u32;
}

/// Produces a fresh, initialized game state for a given map (analog of the
/// teacher's `GameFactory<G>`).
pub trait RtsFactory<S: RtsState> {
    fn new_state(&self, map: &str) -> S;
}
