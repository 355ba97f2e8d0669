use crate::engine::Step;
use crate::error::{PipelineError, Result};
use crate::state::{
    ExecutionOutcome, ExecutionRecord, HumanApproval, SharedState, StateField, StateUpdate,
};
use async_trait::async_trait;
use tracing::{info, warn};

/// Acts on the approval. Rebalancing is recorded, not traded.
#[derive(Debug, Default)]
pub struct ExecutionStep;

impl ExecutionStep {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Step for ExecutionStep {
    async fn run(&self, state: &SharedState) -> Result<StateUpdate> {
        let proposal = state.require_cio_report()?.allocation();
        let approval = state
            .human_approval()
            .ok_or_else(|| PipelineError::missing_field(StateField::HumanApproval.name()))?;
        let previous = state.previous_allocation();

        let record = match approval {
            HumanApproval::Approve => {
                info!(
                    equities_amount = state.capital * proposal.equities,
                    bonds_amount = state.capital * proposal.bonds,
                    "portfolio was rebalanced to {} equities and {} bonds.",
                    proposal.equities,
                    proposal.bonds
                );
                ExecutionRecord {
                    outcome: ExecutionOutcome::Rebalanced,
                    realized: proposal,
                }
            }
            HumanApproval::Reject => {
                warn!(proposed = %proposal, "portfolio was not rebalanced.");
                ExecutionRecord {
                    outcome: ExecutionOutcome::Rejected,
                    realized: previous,
                }
            }
            HumanApproval::TryAgain => {
                warn!(
                    proposed = %proposal,
                    "try again requested but re-running is not supported; portfolio was not rebalanced."
                );
                ExecutionRecord {
                    outcome: ExecutionOutcome::RetryUnsupported,
                    realized: previous,
                }
            }
        };
        Ok(StateUpdate::execution(record))
    }
}
