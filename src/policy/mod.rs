//! C5: the policy prior cache (§4.5) — classifies units into situations and
//! caches a per-situation action-kind prior table, refreshed lazily from an
//! LLM response.

pub mod prior;
pub mod situation;

pub use prior::PolicyPrior;
pub use situation::{classify, Situation};
