//! Human-decision boundary
//!
//! The human step suspends the pass on a [`DecisionChannel`]. Channels own
//! their validation loop: an invalid token is re-requested and never reaches
//! the engine.

mod auto;
mod console;
mod queue;

pub use auto::AutoDecisions;
pub use console::ConsoleDecisions;
pub use queue::{DecisionInbox, PendingDecision, QueueDecisions};

use crate::error::{ErrorCode, PipelineError, Result};
use crate::state::{Allocation, HumanApproval, RiskVerdict, SharedState};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

/// What a reviewer sees when asked to sign off a proposal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalRequest {
    pub period_label: String,
    pub proposed: Allocation,
    pub previous: Allocation,
    pub verdict: RiskVerdict,
    pub reason: String,
}

impl ApprovalRequest {
    pub fn from_state(state: &SharedState) -> Result<Self> {
        let proposal = state.require_cio_report()?;
        let risk = state.require_risk_report()?;
        Ok(Self {
            period_label: state.current_period_label.clone(),
            proposed: proposal.allocation(),
            previous: state.previous_allocation(),
            verdict: risk.verdict.clone(),
            reason: risk.reason.clone(),
        })
    }
}

impl fmt::Display for ApprovalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Human approval required for {}", self.period_label)?;
        writeln!(f, "Risk verdict: {} ({})", self.verdict, self.reason)?;
        writeln!(f, "The proposed split is:")?;
        writeln!(f, "  {} for equities", self.proposed.equities)?;
        writeln!(f, "  {} for bonds", self.proposed.bonds)?;
        writeln!(f, "The previous split was {}", self.previous)?;
        writeln!(f, "[ 1 ] Approve")?;
        writeln!(f, "[ 0 ] Reject")?;
        write!(f, "[ X ] Try again")
    }
}

/// Source of human decisions
#[async_trait]
pub trait DecisionChannel: Send + Sync {
    /// Block until a valid decision arrives for `request`
    async fn decide(&self, request: &ApprovalRequest) -> Result<HumanApproval>;
}

/// Map a raw token onto a decision: `1` approve, `0` reject, `X` try again
pub fn parse_token(input: &str) -> Result<HumanApproval> {
    match input.trim() {
        "1" => Ok(HumanApproval::Approve),
        "0" => Ok(HumanApproval::Reject),
        "X" => Ok(HumanApproval::TryAgain),
        other => Err(PipelineError::input(format!(
            "'{other}' is not a decision; enter 1, 0 or X"
        ))),
    }
}

pub(crate) fn channel_closed(service: &str, message: impl Into<String>) -> PipelineError {
    PipelineError::ExternalService {
        code: ErrorCode::EXTERNAL_CHANNEL_CLOSED,
        service: service.to_string(),
        message: message.into(),
        source: None,
    }
}
