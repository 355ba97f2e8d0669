use crate::decision::{ApprovalRequest, DecisionChannel};
use crate::engine::Step;
use crate::error::Result;
use crate::state::{SharedState, StateUpdate};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Suspends the pass until the decision channel answers
pub struct HumanStep {
    channel: Arc<dyn DecisionChannel>,
}

impl HumanStep {
    pub fn new(channel: Arc<dyn DecisionChannel>) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl Step for HumanStep {
    async fn run(&self, state: &SharedState) -> Result<StateUpdate> {
        let request = ApprovalRequest::from_state(state)?;
        info!(
            proposed = %request.proposed,
            verdict = %request.verdict,
            "human approval required"
        );
        let approval = self.channel.decide(&request).await?;
        info!(%approval, "human decision received");
        Ok(StateUpdate::human_approval(approval))
    }

    fn awaits_decision(&self) -> bool {
        true
    }
}
