use super::{ApprovalRequest, DecisionChannel};
use crate::error::Result;
use crate::state::HumanApproval;
use async_trait::async_trait;
use tracing::info;

/// Fixed policy standing in for a person, for unattended runs
#[derive(Debug, Clone, Copy)]
pub struct AutoDecisions {
    answer: HumanApproval,
}

impl AutoDecisions {
    pub fn new(answer: HumanApproval) -> Self {
        Self { answer }
    }

    pub fn approve_all() -> Self {
        Self::new(HumanApproval::Approve)
    }

    pub fn reject_all() -> Self {
        Self::new(HumanApproval::Reject)
    }
}

#[async_trait]
impl DecisionChannel for AutoDecisions {
    async fn decide(&self, request: &ApprovalRequest) -> Result<HumanApproval> {
        info!(
            period = %request.period_label,
            decision = %self.answer,
            "automatic decision"
        );
        Ok(self.answer)
    }
}
