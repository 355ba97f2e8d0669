//! Shared state threaded through one pipeline pass
//!
//! `SharedState` holds three kinds of data:
//! - carried data: capital and the previous allocation
//! - per-period inputs: market data and period label
//! - per-pass outputs, grouped in [`PassOutputs`]
//!
//! Steps never mutate it directly. They return a [`StateUpdate`] and the engine
//! merges it by field replacement. Rollover between periods replaces the period
//! inputs and swaps `PassOutputs` for its default, so any per-pass field added
//! later is reset without touching the rollover code.

pub mod market;
pub mod report;
mod update;

pub use market::{load_market_data, parse_market_data, EconomicIndicators, MarketData, News, Period};
pub use report::{
    round2, Allocation, AllocationReport, ExecutionOutcome, ExecutionRecord, HumanApproval,
    RiskReport, RiskVerdict,
};
pub use update::{StateField, StateUpdate};

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// The starting baseline is always a complete split
const INITIAL_SUM_TOLERANCE: f64 = 0.01;

/// Fields produced during a single pass; all absent at the start of each pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassOutputs {
    pub analyst_report: Option<AllocationReport>,
    pub quant_report: Option<AllocationReport>,
    pub cio_report: Option<AllocationReport>,
    pub risk_report: Option<RiskReport>,
    pub human_approval: Option<HumanApproval>,
    pub execution: Option<ExecutionRecord>,
}

impl PassOutputs {
    pub fn is_empty(&self) -> bool {
        self == &PassOutputs::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedState {
    /// Set once at initialization
    pub capital: f64,
    pub market_data: MarketData,
    pub current_period_label: String,
    pub year: i32,
    pub month: u32,
    pub prev_equity_allocation: f64,
    pub prev_bond_allocation: f64,
    #[serde(flatten)]
    pub outputs: PassOutputs,
}

impl SharedState {
    /// Build the state for the first period
    pub fn new(capital: f64, market_data: MarketData, previous: Allocation) -> Result<Self> {
        if !capital.is_finite() || capital < 0.0 {
            return Err(PipelineError::validation(
                "capital",
                format!("capital must be a non-negative amount, got {capital}"),
            ));
        }
        check_previous(previous, Some(INITIAL_SUM_TOLERANCE))?;
        let period = market_data.period()?;
        Ok(Self {
            capital,
            market_data,
            current_period_label: period.label,
            year: period.year,
            month: period.month,
            prev_equity_allocation: previous.equities,
            prev_bond_allocation: previous.bonds,
            outputs: PassOutputs::default(),
        })
    }

    pub fn previous_allocation(&self) -> Allocation {
        Allocation::new(self.prev_equity_allocation, self.prev_bond_allocation)
    }

    pub fn analyst_report(&self) -> Option<&AllocationReport> {
        self.outputs.analyst_report.as_ref()
    }

    pub fn quant_report(&self) -> Option<&AllocationReport> {
        self.outputs.quant_report.as_ref()
    }

    pub fn cio_report(&self) -> Option<&AllocationReport> {
        self.outputs.cio_report.as_ref()
    }

    pub fn risk_report(&self) -> Option<&RiskReport> {
        self.outputs.risk_report.as_ref()
    }

    pub fn human_approval(&self) -> Option<HumanApproval> {
        self.outputs.human_approval
    }

    pub fn execution(&self) -> Option<&ExecutionRecord> {
        self.outputs.execution.as_ref()
    }

    /// Required report accessor for steps that depend on an earlier one
    pub fn require_cio_report(&self) -> Result<&AllocationReport> {
        self.cio_report()
            .ok_or_else(|| PipelineError::missing_field(StateField::CioReport.name()))
    }

    pub fn require_risk_report(&self) -> Result<&RiskReport> {
        self.risk_report()
            .ok_or_else(|| PipelineError::missing_field(StateField::RiskReport.name()))
    }

    /// Check that an update could be merged without writing anything
    pub fn check_writable(&self, update: &StateUpdate) -> Result<()> {
        update.check_unset(&self.outputs)
    }

    /// Merge a partial update; each present field must still be absent
    pub fn apply(&mut self, update: StateUpdate) -> Result<()> {
        update.apply_to(&mut self.outputs)
    }

    /// Advance to the next period.
    ///
    /// Overwrites the period inputs, moves the previous allocation to
    /// `carried`, and clears every per-pass output. `tolerance` bounds the
    /// drift of `carried` from summing to one; `None` skips that check.
    pub fn rollover(
        &mut self,
        next: MarketData,
        carried: Allocation,
        tolerance: Option<f64>,
    ) -> Result<()> {
        check_previous(carried, tolerance)?;
        let period = next.period()?;
        self.market_data = next;
        self.current_period_label = period.label;
        self.year = period.year;
        self.month = period.month;
        self.prev_equity_allocation = carried.equities;
        self.prev_bond_allocation = carried.bonds;
        self.outputs = PassOutputs::default();
        Ok(())
    }
}

fn check_previous(previous: Allocation, tolerance: Option<f64>) -> Result<()> {
    for (field, value) in [
        ("prev_equity_allocation", previous.equities),
        ("prev_bond_allocation", previous.bonds),
    ] {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(PipelineError::out_of_range(field, value));
        }
    }
    match tolerance {
        Some(tolerance) => previous.check_sum("previous_allocation", tolerance),
        None => Ok(()),
    }
}

#[cfg(test)]
mod state_tests;
