//! Partial state updates returned by steps

use super::{AllocationReport, ExecutionRecord, HumanApproval, PassOutputs, RiskReport};
use crate::error::{ErrorCode, PipelineError, Result};
use std::fmt;

/// Names of the fields a step may write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateField {
    AnalystReport,
    QuantReport,
    CioReport,
    RiskReport,
    HumanApproval,
    Execution,
}

impl StateField {
    pub fn name(&self) -> &'static str {
        match self {
            StateField::AnalystReport => "analyst_report",
            StateField::QuantReport => "quant_report",
            StateField::CioReport => "cio_report",
            StateField::RiskReport => "risk_report",
            StateField::HumanApproval => "human_approval",
            StateField::Execution => "execution",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Subset of state fields a step returns.
///
/// `None` means "not touched"; present fields replace the state value whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub analyst_report: Option<AllocationReport>,
    pub quant_report: Option<AllocationReport>,
    pub cio_report: Option<AllocationReport>,
    pub risk_report: Option<RiskReport>,
    pub human_approval: Option<HumanApproval>,
    pub execution: Option<ExecutionRecord>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyst_report(report: AllocationReport) -> Self {
        Self {
            analyst_report: Some(report),
            ..Self::default()
        }
    }

    pub fn quant_report(report: AllocationReport) -> Self {
        Self {
            quant_report: Some(report),
            ..Self::default()
        }
    }

    pub fn cio_report(report: AllocationReport) -> Self {
        Self {
            cio_report: Some(report),
            ..Self::default()
        }
    }

    pub fn risk_report(report: RiskReport) -> Self {
        Self {
            risk_report: Some(report),
            ..Self::default()
        }
    }

    pub fn human_approval(approval: HumanApproval) -> Self {
        Self {
            human_approval: Some(approval),
            ..Self::default()
        }
    }

    pub fn execution(record: ExecutionRecord) -> Self {
        Self {
            execution: Some(record),
            ..Self::default()
        }
    }

    /// Fields this update writes
    pub fn fields(&self) -> Vec<StateField> {
        let mut fields = Vec::new();
        if self.analyst_report.is_some() {
            fields.push(StateField::AnalystReport);
        }
        if self.quant_report.is_some() {
            fields.push(StateField::QuantReport);
        }
        if self.cio_report.is_some() {
            fields.push(StateField::CioReport);
        }
        if self.risk_report.is_some() {
            fields.push(StateField::RiskReport);
        }
        if self.human_approval.is_some() {
            fields.push(StateField::HumanApproval);
        }
        if self.execution.is_some() {
            fields.push(StateField::Execution);
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Allocation reports carried by this update, with their field names
    pub fn allocation_reports(&self) -> impl Iterator<Item = (StateField, &AllocationReport)> {
        [
            (StateField::AnalystReport, self.analyst_report.as_ref()),
            (StateField::QuantReport, self.quant_report.as_ref()),
            (StateField::CioReport, self.cio_report.as_ref()),
        ]
        .into_iter()
        .filter_map(|(field, report)| report.map(|r| (field, r)))
    }

    /// Combine two updates produced in the same superstep.
    ///
    /// Two writers of one field would make the merge order-dependent, so it
    /// is rejected.
    pub fn combine(mut self, other: StateUpdate) -> Result<Self> {
        let ours = self.fields();
        if let Some(clash) = other.fields().into_iter().find(|f| ours.contains(f)) {
            return Err(PipelineError::graph_with_code(
                ErrorCode::GRAPH_CONFLICTING_WRITE,
                format!("field {clash} written by more than one step in the same superstep"),
            ));
        }
        self.analyst_report = self.analyst_report.or(other.analyst_report);
        self.quant_report = self.quant_report.or(other.quant_report);
        self.cio_report = self.cio_report.or(other.cio_report);
        self.risk_report = self.risk_report.or(other.risk_report);
        self.human_approval = self.human_approval.or(other.human_approval);
        self.execution = self.execution.or(other.execution);
        Ok(self)
    }

    /// Fail if any field this update writes is already present
    pub(crate) fn check_unset(&self, outputs: &PassOutputs) -> Result<()> {
        let occupied = [
            (StateField::AnalystReport, outputs.analyst_report.is_some()),
            (StateField::QuantReport, outputs.quant_report.is_some()),
            (StateField::CioReport, outputs.cio_report.is_some()),
            (StateField::RiskReport, outputs.risk_report.is_some()),
            (StateField::HumanApproval, outputs.human_approval.is_some()),
            (StateField::Execution, outputs.execution.is_some()),
        ];
        for field in self.fields() {
            if occupied.iter().any(|(f, set)| *f == field && *set) {
                return Err(PipelineError::Validation {
                    code: ErrorCode::VALIDATION_ALREADY_SET,
                    field: field.name().to_string(),
                    message: "field is written once per pass".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Write into the per-pass outputs; every written field must be absent.
    ///
    /// Checks all fields before writing any, so a rejected update leaves the
    /// outputs untouched.
    pub(crate) fn apply_to(self, outputs: &mut PassOutputs) -> Result<()> {
        self.check_unset(outputs)?;
        set_if_present(&mut outputs.analyst_report, self.analyst_report);
        set_if_present(&mut outputs.quant_report, self.quant_report);
        set_if_present(&mut outputs.cio_report, self.cio_report);
        set_if_present(&mut outputs.risk_report, self.risk_report);
        set_if_present(&mut outputs.human_approval, self.human_approval);
        set_if_present(&mut outputs.execution, self.execution);
        Ok(())
    }
}

fn set_if_present<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}
