//! Report types written into the shared state by pipeline steps

use crate::error::{ErrorCode, PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// An equities/bonds split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub equities: f64,
    pub bonds: f64,
}

impl Allocation {
    pub fn new(equities: f64, bonds: f64) -> Self {
        Self { equities, bonds }
    }

    /// Split with bonds taking the remainder
    pub fn from_equities(equities: f64) -> Self {
        Self {
            equities: round2(equities),
            bonds: round2(1.0 - equities),
        }
    }

    pub fn sum(&self) -> f64 {
        self.equities + self.bonds
    }

    /// Fails if the split is more than `tolerance` away from 1.0
    pub fn check_sum(&self, field: &str, tolerance: f64) -> Result<()> {
        let drift = (self.sum() - 1.0).abs();
        if drift > tolerance + 1e-9 {
            return Err(PipelineError::Validation {
                code: ErrorCode::VALIDATION_SUM,
                field: field.to_string(),
                message: format!(
                    "equities {} + bonds {} = {:.4}, outside tolerance {}",
                    self.equities,
                    self.bonds,
                    self.sum(),
                    tolerance
                ),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} equities / {:.2} bonds", self.equities, self.bonds)
    }
}

/// Allocation recommendation produced by the analyst, quant and CIO steps.
///
/// Both values are validated to lie in `[0, 1]` and rounded to two decimal
/// places at construction, including when deserialized from a reasoning
/// engine reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAllocationReport")]
pub struct AllocationReport {
    equities: f64,
    bonds: f64,
    justification: String,
}

#[derive(Deserialize)]
struct RawAllocationReport {
    equities: f64,
    bonds: f64,
    justification: String,
}

impl TryFrom<RawAllocationReport> for AllocationReport {
    type Error = PipelineError;

    fn try_from(raw: RawAllocationReport) -> Result<Self> {
        AllocationReport::new(raw.equities, raw.bonds, raw.justification)
    }
}

impl AllocationReport {
    pub fn new(equities: f64, bonds: f64, justification: impl Into<String>) -> Result<Self> {
        Ok(Self {
            equities: checked_fraction("equities", equities)?,
            bonds: checked_fraction("bonds", bonds)?,
            justification: justification.into(),
        })
    }

    pub fn equities(&self) -> f64 {
        self.equities
    }

    pub fn bonds(&self) -> f64 {
        self.bonds
    }

    pub fn justification(&self) -> &str {
        &self.justification
    }

    pub fn allocation(&self) -> Allocation {
        Allocation::new(self.equities, self.bonds)
    }
}

impl fmt::Display for AllocationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "equities={} bonds={} justification={}",
            self.equities, self.bonds, self.justification
        )
    }
}

fn checked_fraction(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(PipelineError::out_of_range(field, value));
    }
    Ok(round2(value))
}

/// Categorical outcome of the risk gate.
///
/// Anything other than the three known verdicts is kept verbatim so routing
/// can reject it instead of silently defaulting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RiskVerdict {
    Pass,
    Warn,
    Block,
    Unrecognized(String),
}

impl RiskVerdict {
    pub fn as_str(&self) -> &str {
        match self {
            RiskVerdict::Pass => "Pass",
            RiskVerdict::Warn => "Warn",
            RiskVerdict::Block => "Block",
            RiskVerdict::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for RiskVerdict {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Pass" => RiskVerdict::Pass,
            "Warn" => RiskVerdict::Warn,
            "Block" => RiskVerdict::Block,
            _ => RiskVerdict::Unrecognized(raw),
        }
    }
}

impl From<&str> for RiskVerdict {
    fn from(raw: &str) -> Self {
        RiskVerdict::from(raw.to_string())
    }
}

impl From<RiskVerdict> for String {
    fn from(verdict: RiskVerdict) -> Self {
        verdict.as_str().to_string()
    }
}

impl fmt::Display for RiskVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict produced by the risk step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub verdict: RiskVerdict,
    pub reason: String,
    #[serde(default)]
    pub external_evidence: Option<String>,
}

impl RiskReport {
    pub fn new(verdict: impl Into<RiskVerdict>, reason: impl Into<String>) -> Self {
        Self {
            verdict: verdict.into(),
            reason: reason.into(),
            external_evidence: None,
        }
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.external_evidence = Some(evidence.into());
        self
    }
}

/// Human sign-off on a proposed split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HumanApproval {
    Approve,
    Reject,
    TryAgain,
}

impl fmt::Display for HumanApproval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HumanApproval::Approve => "approve",
            HumanApproval::Reject => "reject",
            HumanApproval::TryAgain => "try_again",
        };
        f.write_str(s)
    }
}

/// What the execution step did with the proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Rebalanced,
    Rejected,
    /// Try-again was requested; no loop-back exists so nothing was executed
    RetryUnsupported,
}

impl ExecutionOutcome {
    pub fn rebalanced(&self) -> bool {
        matches!(self, ExecutionOutcome::Rebalanced)
    }
}

/// Record written by the execution step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub outcome: ExecutionOutcome,
    /// Allocation actually held after this pass
    pub realized: Allocation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_report_rounds_to_two_decimals() {
        let report = AllocationReport::new(0.6666, 0.3333, "tilt").unwrap();
        assert_eq!(report.equities(), 0.67);
        assert_eq!(report.bonds(), 0.33);
    }

    #[test]
    fn test_allocation_report_rejects_out_of_range() {
        let err = AllocationReport::new(1.2, -0.2, "bad").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.code(), ErrorCode::VALIDATION_OUT_OF_RANGE);

        assert!(AllocationReport::new(f64::NAN, 0.5, "nan").is_err());
    }

    #[test]
    fn test_allocation_report_accepts_bounds() {
        let report = AllocationReport::new(1.0, 0.0, "all in").unwrap();
        assert_eq!(report.allocation(), Allocation::new(1.0, 0.0));
    }

    #[test]
    fn test_allocation_report_deserialize_validates() {
        let ok: AllocationReport =
            serde_json::from_str(r#"{"equities":0.555,"bonds":0.445,"justification":"x"}"#)
                .unwrap();
        assert_eq!(ok.equities(), 0.56);

        let bad = serde_json::from_str::<AllocationReport>(
            r#"{"equities":1.5,"bonds":0.0,"justification":"x"}"#,
        );
        assert!(bad.is_err());

        let missing = serde_json::from_str::<AllocationReport>(r#"{"equities":0.5,"bonds":0.5}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn test_check_sum_tolerance() {
        assert!(Allocation::new(0.7, 0.3).check_sum("cio", 0.01).is_ok());
        assert!(Allocation::new(0.34, 0.67).check_sum("cio", 0.01).is_ok());
        let err = Allocation::new(0.7, 0.7).check_sum("cio", 0.01).unwrap_err();
        assert_eq!(err.code(), ErrorCode::VALIDATION_SUM);
    }

    #[test]
    fn test_risk_verdict_parsing() {
        assert_eq!(RiskVerdict::from("Pass"), RiskVerdict::Pass);
        assert_eq!(RiskVerdict::from("Warn"), RiskVerdict::Warn);
        assert_eq!(RiskVerdict::from("Block"), RiskVerdict::Block);
        assert_eq!(
            RiskVerdict::from("pass"),
            RiskVerdict::Unrecognized("pass".to_string())
        );
        assert_eq!(
            RiskVerdict::from(" BLOCK "),
            RiskVerdict::Unrecognized(" BLOCK ".to_string())
        );
        assert_eq!(
            RiskVerdict::from("Escalate"),
            RiskVerdict::Unrecognized("Escalate".to_string())
        );
    }

    #[test]
    fn test_risk_report_round_trips_unknown_verdict() {
        let report: RiskReport =
            serde_json::from_str(r#"{"verdict":"Maybe","reason":"unsure"}"#).unwrap();
        assert_eq!(report.verdict, RiskVerdict::Unrecognized("Maybe".to_string()));
        assert!(report.external_evidence.is_none());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["verdict"], "Maybe");
    }

    #[test]
    fn test_human_approval_serialization() {
        assert_eq!(
            serde_json::to_string(&HumanApproval::TryAgain).unwrap(),
            "\"try_again\""
        );
    }
}
