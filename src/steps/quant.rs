use super::prompts::{quant_prompt, QUANT_SYSTEM};
use super::rates::extract_rate_decision;
use super::replies::parse_allocation_reply;
use crate::abstractions::{summarize, PriceSource, ReasoningEngine, ReasoningRequest, Role};
use crate::engine::Step;
use crate::error::Result;
use crate::state::{Period, SharedState, StateUpdate};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info};

/// Indicator-driven allocation: ticker summaries, misery index and the parsed
/// rate decision go into a single reasoning call
pub struct QuantStep {
    reasoning: Arc<dyn ReasoningEngine>,
    prices: Arc<dyn PriceSource>,
    symbols: Vec<String>,
}

impl QuantStep {
    pub fn new(
        reasoning: Arc<dyn ReasoningEngine>,
        prices: Arc<dyn PriceSource>,
        symbols: Vec<String>,
    ) -> Self {
        Self {
            reasoning,
            prices,
            symbols,
        }
    }
}

#[async_trait]
impl Step for QuantStep {
    async fn run(&self, state: &SharedState) -> Result<StateUpdate> {
        let period = Period {
            label: state.current_period_label.clone(),
            year: state.year,
            month: state.month,
        };
        let summaries = try_join_all(
            self.symbols
                .iter()
                .map(|symbol| summarize(self.prices.as_ref(), symbol, &period)),
        )
        .await?;

        let rates =
            extract_rate_decision(&state.market_data.economic_indicators.fed_interest_rate_decision);
        debug!(?rates, "parsed rate decision");

        let request = ReasoningRequest::structured(
            Role::Quant,
            QUANT_SYSTEM,
            quant_prompt(state, &summaries, &rates),
        );
        let reply = self.reasoning.complete(&request).await?;
        let report = parse_allocation_reply(&reply)?;

        info!(allocation = %report.allocation(), "quant report ready");
        debug!(justification = report.justification(), "quant justification");
        Ok(StateUpdate::quant_report(report))
    }
}
