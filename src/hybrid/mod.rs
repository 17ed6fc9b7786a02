//! C7: the hybrid strategy agent (§4.7) — competitive without lookahead.

pub mod controller;
pub mod strategy;

pub use controller::{HybridAgent, PrimaryTarget, TacticalParams};
pub use strategy::RuleStrategy;
