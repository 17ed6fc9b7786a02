//! C4: the LLM-guided MCTS agent (§4.4). Wires the arena-based search
//! ([`search`]) to C5's policy prior and the goal controller, and owns the
//! lazy, cached LLM refreshes that happen "at the start of `getAction`,
//! before search begins" (§5).

pub mod goal_controller;
pub mod search;
pub mod tree;

use rand::rngs::SmallRng;

use crate::config::SearchBudget;
use crate::llm::client::{GenerateOptions, LlmGenerator};
use crate::policy::PolicyPrior;
use crate::rts::{PlayerAction, PlayerId, RtsState};

pub use goal_controller::{GoalController, RefreshState};
pub use search::{search as run_search, SearchParams, SearchResult};

/// One player's LLM-guided MCTS agent across a whole match. Holds its own
/// prior cache and goal controller — never shared across agent instances,
/// per §5's "each agent owns its client" rule.
pub struct McAgent {
    player: PlayerId,
    opponent: PlayerId,
    prior: PolicyPrior,
    goal_controller: GoalController,
    budget: SearchBudget,
    llm: Box<dyn LlmGenerator>,
    options: GenerateOptions,
}

impl McAgent {
    pub fn new(
        player: PlayerId,
        opponent: PlayerId,
        budget: SearchBudget,
        goals: crate::evaluation::StrategicGoals,
        llm: Box<dyn LlmGenerator>,
        options: GenerateOptions,
    ) -> Self {
        Self {
            player,
            opponent,
            prior: PolicyPrior::new(budget.prior_cache_ticks),
            goal_controller: GoalController::new(goals, budget.goal_cache_ticks),
            budget,
            llm,
            options,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.prior.is_degraded() || self.goal_controller.is_degraded()
    }

    /// One turn's decision: refresh caches lazily, then search. Never blocks
    /// on the LLM beyond the first call per cache window (§4.4).
    pub fn get_action<S: RtsState>(&mut self, state: &S, rng: &mut SmallRng) -> PlayerAction {
        let tick = state.tick();
        self.prior.maybe_refresh(tick, self.llm.as_ref(), &self.options, &prior_refresh_prompt(state, self.player));
        self.goal_controller.maybe_refresh(tick, self.llm.as_ref(), &self.options, &goal_refresh_prompt(state, self.player));

        let goals = self.goal_controller.goals();
        let params = SearchParams::from(self.budget);
        match run_search(state, self.player, self.opponent, &self.prior, &goals, params, rng) {
            Ok(result) => result.action,
            Err(_) => PlayerAction::empty(),
        }
    }
}

fn prior_refresh_prompt<S: RtsState>(state: &S, player: PlayerId) -> String {
    format!(
        "Given the current RTS match state (tick {}, our resources {}), return a JSON object mapping \
         each situation name (worker-near-resource, worker-idle, worker-carrying, military-in-combat, \
         military-not-in-combat, base-economy, base-low-resources, barracks) to an object of \
         action-kind weights (none, move, harvest, return, produce, attack).",
        state.tick(),
        state.resources(player),
    )
}

fn goal_refresh_prompt<S: RtsState>(state: &S, player: PlayerId) -> String {
    format!(
        "Given the current RTS match state (tick {}, our resources {}, our units {}, enemy units {}), \
         return a JSON object with \"primary\" and \"secondary\" fields naming one of expand-economy, \
         build-army, attack-base, attack-workers, defend, control-resources, and an optional \"target\" \
         field naming one of base, workers, army.",
        state.tick(),
        state.resources(player),
        state.units_of(player).len(),
        state.units_of(if player == 0 { 1 } else { 0 }).len(),
    )
}
