use super::prompts::{analyst_prompt, ANALYST_SYSTEM};
use super::replies::parse_allocation_reply;
use crate::abstractions::{ReasoningEngine, ReasoningRequest, Role, WebSearch};
use crate::engine::Step;
use crate::error::Result;
use crate::state::{SharedState, StateUpdate};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Qualitative read of the month's news
pub struct AnalystStep {
    reasoning: Arc<dyn ReasoningEngine>,
    search: Option<Arc<dyn WebSearch>>,
}

impl AnalystStep {
    pub fn new(reasoning: Arc<dyn ReasoningEngine>) -> Self {
        Self {
            reasoning,
            search: None,
        }
    }

    pub fn with_search(mut self, search: Arc<dyn WebSearch>) -> Self {
        self.search = Some(search);
        self
    }
}

#[async_trait]
impl Step for AnalystStep {
    async fn run(&self, state: &SharedState) -> Result<StateUpdate> {
        let web_context = match (&self.search, state.market_data.news.headlines.first()) {
            (Some(search), Some(headline)) => Some(search.search(headline).await?),
            _ => None,
        };

        let request = ReasoningRequest::structured(
            Role::Analyst,
            ANALYST_SYSTEM,
            analyst_prompt(state, web_context.as_deref()),
        );
        let reply = self.reasoning.complete(&request).await?;
        let report = parse_allocation_reply(&reply)?;

        info!(allocation = %report.allocation(), "analyst report ready");
        debug!(justification = report.justification(), "analyst justification");
        Ok(StateUpdate::analyst_report(report))
    }
}
