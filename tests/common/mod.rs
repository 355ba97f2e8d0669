//! Common test utilities and helpers

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use stratify::abstractions::Role;
use stratify::config::StratifyConfig;
use stratify::decision::DecisionChannel;
use stratify::engine::ExecutionEngine;
use stratify::pipeline::{allocation_engine, Collaborators};
use stratify::state::{load_market_data, Allocation, MarketData, SharedState};
use stratify::testing::{
    allocation_reply, risk_reply, ScriptedDecisions, ScriptedReasoning, StaticPrices, StaticSearch,
};

/// The sample market data shipped with the crate
pub fn sample_data_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/market_data.json")
}

pub fn sample_periods() -> Vec<MarketData> {
    load_market_data(&sample_data_path()).expect("sample market data loads")
}

/// Default configuration with CIO questioning off so each period costs one
/// reply per role
pub fn config() -> StratifyConfig {
    let mut config = StratifyConfig::default();
    config.cio.question_reports = false;
    config
}

/// First-period state starting from 60/40
pub fn first_state() -> SharedState {
    let first = sample_periods().remove(0);
    SharedState::new(1000.0, first, Allocation::new(0.6, 0.4)).expect("valid state")
}

/// Full pipeline over real steps with every collaborator scripted
pub struct Harness {
    pub reasoning: Arc<ScriptedReasoning>,
    pub search: Arc<StaticSearch>,
    pub prices: Arc<StaticPrices>,
    pub decisions: Arc<dyn DecisionChannel>,
}

impl Harness {
    pub fn new(decisions: Arc<dyn DecisionChannel>) -> Self {
        Self {
            reasoning: Arc::new(ScriptedReasoning::new()),
            search: Arc::new(StaticSearch::new("Markets steady on the month")),
            prices: Arc::new(
                StaticPrices::new()
                    .with_closes("SPY", &[384.0, 390.5, 398.2, 406.5])
                    .with_closes("^IRX", &[4.52, 4.55, 4.61]),
            ),
            decisions,
        }
    }

    pub fn with_tokens(tokens: &[&str]) -> (Self, Arc<ScriptedDecisions>) {
        let decisions = Arc::new(ScriptedDecisions::new(tokens.iter().copied()));
        (Self::new(decisions.clone()), decisions)
    }

    /// Queue one period's replies: analyst, quant and CIO equity weights and
    /// the risk verdict
    pub fn script_period(&self, analyst: f64, quant: f64, cio: f64, verdict: &str) {
        self.reasoning
            .push_reply(Role::Analyst, allocation_reply(analyst, 1.0 - analyst, "news flow"));
        self.reasoning
            .push_reply(Role::Quant, allocation_reply(quant, 1.0 - quant, "indicators"));
        self.reasoning
            .push_reply(Role::Cio, allocation_reply(cio, 1.0 - cio, "weighted view"));
        self.reasoning
            .push_reply(Role::Risk, risk_reply(verdict, "checked against history"));
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            reasoning: self.reasoning.clone(),
            search: Some(self.search.clone()),
            prices: self.prices.clone(),
            decisions: self.decisions.clone(),
        }
    }

    pub fn engine(&self, config: &StratifyConfig) -> ExecutionEngine {
        allocation_engine(&self.collaborators(), config).expect("allocation graph is valid")
    }
}
