//! Turning reasoning-engine replies into typed reports

use crate::abstractions::extract_json;
use crate::error::{PipelineError, Result};
use crate::state::{AllocationReport, RiskReport};
use serde_json::Value;

/// Parse `{"equities", "bonds", "justification"}`.
///
/// A reply that is not JSON, or has the wrong types, is a malformed external
/// response. A missing field or an out-of-range fraction is a validation error.
pub fn parse_allocation_reply(reply: &str) -> Result<AllocationReport> {
    let value = extract_json(reply)?;
    let equities = number_field(&value, "equities")?;
    let bonds = number_field(&value, "bonds")?;
    let justification = string_field(&value, "justification")?;
    AllocationReport::new(equities, bonds, justification)
}

/// Parse `{"verdict", "reason", "external_evidence"?}`; the verdict string is
/// kept as-is so routing can reject values it does not know
pub fn parse_risk_reply(reply: &str) -> Result<RiskReport> {
    let value = extract_json(reply)?;
    let verdict = string_field(&value, "verdict")?;
    let reason = string_field(&value, "reason")?;
    let report = RiskReport::new(verdict, reason);
    Ok(match value.get("external_evidence").and_then(Value::as_str) {
        Some(evidence) if !evidence.trim().is_empty() => report.with_evidence(evidence),
        _ => report,
    })
}

/// Follow-up questions the CIO puts to each analyst
#[derive(Debug, Clone, PartialEq)]
pub struct CioQuestions {
    pub quant: String,
    pub analyst: String,
}

pub fn parse_questions_reply(reply: &str) -> Result<CioQuestions> {
    let value = extract_json(reply)?;
    Ok(CioQuestions {
        quant: string_field(&value, "quant_question")?,
        analyst: string_field(&value, "analyst_question")?,
    })
}

fn field<'a>(value: &'a Value, name: &str) -> Result<&'a Value> {
    match value.get(name) {
        Some(Value::Null) | None => Err(PipelineError::missing_field(name)),
        Some(v) => Ok(v),
    }
}

fn number_field(value: &Value, name: &str) -> Result<f64> {
    let raw = field(value, name)?;
    match raw {
        Value::Number(n) => n.as_f64(),
        // Some models quote numbers
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| PipelineError::malformed("reasoning", format!("'{name}' is not a number: {raw}")))
}

fn string_field(value: &Value, name: &str) -> Result<String> {
    field(value, name)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| PipelineError::malformed("reasoning", format!("'{name}' is not a string")))
}
