//! Conditional edge after the risk gate

use super::{NodeId, Route};
use crate::error::{PipelineError, Result};
use crate::state::{HumanApproval, RiskVerdict, SharedState, StateUpdate};

/// Where a verdict sends the pass. Unrecognized verdicts never default.
pub fn verdict_target(verdict: &RiskVerdict) -> Result<NodeId> {
    match verdict {
        RiskVerdict::Pass => Ok(NodeId::Execution),
        RiskVerdict::Warn | RiskVerdict::Block => Ok(NodeId::Human),
        RiskVerdict::Unrecognized(raw) => Err(PipelineError::routing(NodeId::Risk, raw.clone())),
    }
}

/// Router attached to the risk step.
///
/// A `Pass` verdict implies human sign-off, so that branch also writes
/// `human_approval = approve`.
pub fn route_risk_verdict(state: &SharedState) -> Result<Route> {
    let report = state.require_risk_report()?;
    let target = verdict_target(&report.verdict)?;
    let route = Route::to(target);
    if report.verdict == RiskVerdict::Pass {
        return Ok(route.with_update(StateUpdate::human_approval(HumanApproval::Approve)));
    }
    Ok(route)
}
