use super::prompts::{risk_prompt, RISK_SYSTEM};
use super::replies::parse_risk_reply;
use crate::abstractions::{ReasoningEngine, ReasoningRequest, Role, WebSearch, NO_RESULTS};
use crate::engine::Step;
use crate::error::Result;
use crate::state::{SharedState, StateUpdate};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Risk gate over the CIO proposal.
///
/// When a search collaborator is present, the proposal's justification is
/// checked against the web first and the snippet becomes the report's
/// external evidence unless the reply supplies its own.
pub struct RiskStep {
    reasoning: Arc<dyn ReasoningEngine>,
    search: Option<Arc<dyn WebSearch>>,
}

impl RiskStep {
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
impl Step for RiskStep {
    async fn run(&self, state: &SharedState) -> Result<StateUpdate> {
        let proposal = state.require_cio_report()?;

        let evidence = match &self.search {
            Some(search) => {
                let snippet = search.search(proposal.justification()).await?;
                (snippet != NO_RESULTS).then_some(snippet)
            }
            None => None,
        };

        let request = ReasoningRequest::structured(
            Role::Risk,
            RISK_SYSTEM,
            risk_prompt(state, proposal, evidence.as_deref()),
        );
        let mut report = parse_risk_reply(&self.reasoning.complete(&request).await?)?;
        if report.external_evidence.is_none() {
            report.external_evidence = evidence;
        }

        info!(verdict = %report.verdict, "risk verdict");
        debug!(reason = %report.reason, evidence = ?report.external_evidence, "risk reasoning");
        Ok(StateUpdate::risk_report(report))
    }
}
