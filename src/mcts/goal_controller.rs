//! C4/C6's goal controller (§4.4): refreshes the active primary/secondary
//! strategic goal from C3 on a cache interval, with the same
//! initial→ready→degraded state machine shape §4.3 defines for the LLM
//! channel generally.

use serde::Deserialize;
use tracing::warn;

use crate::evaluation::{StrategicGoal, StrategicGoals, TargetPriority};
use crate::llm::client::{GenerateOptions, LlmGenerator};
use crate::llm::fallback::DegradedChannel;
use crate::llm::json_extract::parse_json;

/// §4.4's goal-refresh state machine: `initial → ready` on first success,
/// `ready → degraded` after `failure_threshold` consecutive failures,
/// `degraded → ready` on the next success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Initial,
    Ready,
    Degraded,
}

#[derive(Debug, Deserialize)]
struct GoalRefreshResponse {
    primary: String,
    secondary: String,
    #[serde(default)]
    target: Option<String>,
}

/// Holds the agent's current goals and the bookkeeping needed to refresh
/// them lazily from `getAction`, at most once per `cache_ticks` window (§4.4:
/// "triggered lazily... occur outside the tight tree-search inner loop").
pub struct GoalController {
    goals: StrategicGoals,
    state: RefreshState,
    channel: DegradedChannel,
    last_refresh_tick: Option<u32>,
    cache_ticks: u32,
}

impl GoalController {
    pub fn new(initial: StrategicGoals, cache_ticks: u32) -> Self {
        Self {
            goals: initial,
            state: RefreshState::Initial,
            channel: DegradedChannel::default(),
            last_refresh_tick: None,
            cache_ticks,
        }
    }

    pub fn goals(&self) -> StrategicGoals {
        self.goals
    }

    pub fn state(&self) -> RefreshState {
        self.state
    }

    pub fn is_degraded(&self) -> bool {
        self.state == RefreshState::Degraded
    }

    /// Calls C3 if the cache window has elapsed; on success replaces the
    /// active goals and moves to `Ready`; on failure leaves the cached goals
    /// untouched and moves to `Degraded` once `failure_threshold` consecutive
    /// failures accumulate (§4.4, §7 "Prior refresh miss" scenario).
    pub fn maybe_refresh(&mut self, current_tick: u32, llm: &dyn LlmGenerator, options: &GenerateOptions, prompt: &str) {
        let due = match self.last_refresh_tick {
            None => true,
            Some(last) => current_tick.saturating_sub(last) >= self.cache_ticks,
        };
        if !due {
            return;
        }
        self.last_refresh_tick = Some(current_tick);

        match llm.generate(prompt, options).and_then(|text| parse_json::<GoalRefreshResponse>(&text)) {
            Ok(response) => {
                if let Some(goals) = parse_goals(&response) {
                    self.goals = goals;
                    self.channel.record_success();
                    self.state = RefreshState::Ready;
                } else {
                    warn!("goal refresh returned unrecognized goal name, keeping cached goals");
                    self.record_failure();
                }
            }
            Err(e) => {
                warn!("goal refresh failed, keeping cached goals: {e}");
                self.record_failure();
            }
        }
    }

    fn record_failure(&mut self) {
        if self.channel.record_failure() {
            self.state = RefreshState::Degraded;
        }
    }
}

fn parse_goals(response: &GoalRefreshResponse) -> Option<StrategicGoals> {
    let primary = parse_goal_name(&response.primary)?;
    let secondary = parse_goal_name(&response.secondary)?;
    let target = response
        .target
        .as_deref()
        .and_then(parse_target_name)
        .unwrap_or(TargetPriority::Base);
    Some(StrategicGoals { primary, secondary, target })
}

fn parse_goal_name(name: &str) -> Option<StrategicGoal> {
    use StrategicGoal::*;
    Some(match name {
        "expand-economy" => ExpandEconomy,
        "build-army" => BuildArmy,
        "attack-base" => AttackBase,
        "attack-workers" => AttackWorkers,
        "defend" => Defend,
        "control-resources" => ControlResources,
        _ => return None,
    })
}

fn parse_target_name(name: &str) -> Option<TargetPriority> {
    use TargetPriority::*;
    Some(match name {
        "base" => Base,
        "workers" => Workers,
        "army" => Army,
        _ => return None,
    })
}
