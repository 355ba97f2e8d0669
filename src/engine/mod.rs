//! Step contract and the engine that runs one pass over the graph

mod executor;
mod step;


pub use executor::{ExecutionEngine, PassTrace};
pub use step::Step;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do when the human asks to try again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TryAgainPolicy {
    /// Finish the pass with no rebalance and no loop-back
    #[default]
    Complete,
    /// Abort the pass with an unsupported error
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bound on every non-human step
    #[serde(with = "humantime_serde")]
    pub step_timeout: Duration,
    /// Maximum drift of `equities + bonds` from 1.0; `None` disables the check
    pub allocation_tolerance: Option<f64>,
    pub on_try_again: TryAgainPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_timeout: Duration::from_secs(120),
            allocation_tolerance: Some(0.01),
            on_try_again: TryAgainPolicy::Complete,
        }
    }
}
