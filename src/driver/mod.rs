//! Monthly driver: one pass per period, strictly in order
//!
//! After each pass the driver carries an allocation forward as the next
//! period's "previous" split and rolls the state over. Which allocation is
//! carried is the [`RolloverPolicy`]. A failed pass halts the driver; the
//! period is never retried or skipped.

use crate::engine::ExecutionEngine;
use crate::error::{ErrorCode, PipelineError, Result};
use crate::state::{
    Allocation, ExecutionOutcome, HumanApproval, MarketData, RiskVerdict, SharedState, StateField,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Allocation carried into the next period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloverPolicy {
    /// The CIO proposal, whether or not it was executed
    #[default]
    Proposed,
    /// What execution left in place: the proposal if rebalanced, else the
    /// previous baseline
    Realized,
}

impl RolloverPolicy {
    pub fn carried(&self, state: &SharedState) -> Result<Allocation> {
        match self {
            RolloverPolicy::Proposed => Ok(state.require_cio_report()?.allocation()),
            RolloverPolicy::Realized => state
                .execution()
                .map(|record| record.realized)
                .ok_or_else(|| PipelineError::missing_field(StateField::Execution.name())),
        }
    }
}

/// What happened in one period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodOutcome {
    pub label: String,
    pub run_id: Uuid,
    pub previous: Allocation,
    pub proposed: Allocation,
    pub verdict: RiskVerdict,
    pub approval: HumanApproval,
    pub outcome: ExecutionOutcome,
    pub realized: Allocation,
    /// Baseline handed to the next period
    pub carried: Allocation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub policy: RolloverPolicy,
    pub periods: Vec<PeriodOutcome>,
    pub final_allocation: Allocation,
}

impl SimulationSummary {
    pub fn rebalanced(&self) -> usize {
        self.periods
            .iter()
            .filter(|p| p.outcome.rebalanced())
            .count()
    }
}

pub struct MonthlyDriver {
    engine: ExecutionEngine,
    periods: Vec<MarketData>,
    state: SharedState,
    policy: RolloverPolicy,
    completed: usize,
    outcomes: Vec<PeriodOutcome>,
    halted: bool,
}

impl MonthlyDriver {
    /// Start at the first period with `initial` as the previous allocation
    pub fn new(
        engine: ExecutionEngine,
        periods: Vec<MarketData>,
        capital: f64,
        initial: Allocation,
        policy: RolloverPolicy,
    ) -> Result<Self> {
        let first = periods.first().cloned().ok_or_else(|| PipelineError::Data {
            code: ErrorCode::DATA_EMPTY,
            message: "no periods to run".to_string(),
            source: None,
        })?;
        let state = SharedState::new(capital, first, initial)?;

        Ok(Self {
            engine,
            periods,
            state,
            policy,
            completed: 0,
            outcomes: Vec::new(),
            halted: false,
        })
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn outcomes(&self) -> &[PeriodOutcome] {
        &self.outcomes
    }

    pub fn remaining(&self) -> usize {
        self.periods.len() - self.completed
    }

    /// Run the next period's pass.
    ///
    /// Returns `None` once every period has run.
    pub async fn run_period(&mut self) -> Result<Option<PeriodOutcome>> {
        if self.halted {
            return Err(PipelineError::unsupported(
                "a previous period failed; failed periods are not retried",
            ));
        }
        if self.remaining() == 0 {
            return Ok(None);
        }

        let label = self.state.current_period_label.clone();
        info!(period = %label, previous = %self.state.previous_allocation(), "period started");

        let outcome = match self.pass().await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.halted = true;
                warn!(period = %label, error = %e, "period failed, halting");
                return Err(e.in_period(label));
            }
        };

        if let Some(next) = self.periods.get(self.completed + 1).cloned() {
            let tolerance = self.engine.config().allocation_tolerance;
            if let Err(e) = self.state.rollover(next, outcome.carried, tolerance) {
                self.halted = true;
                return Err(e.in_period(label));
            }
        }
        self.completed += 1;

        info!(
            period = %label,
            outcome = ?outcome.outcome,
            carried = %outcome.carried,
            "period complete"
        );
        self.outcomes.push(outcome.clone());
        Ok(Some(outcome))
    }

    /// Run up to `count` periods, bounded by the periods left
    pub async fn run_periods(&mut self, count: usize) -> Result<SimulationSummary> {
        let count = count.min(self.remaining());
        let mut periods = Vec::with_capacity(count);
        for _ in 0..count {
            match self.run_period().await? {
                Some(outcome) => periods.push(outcome),
                None => break,
            }
        }

        let final_allocation = periods
            .last()
            .map(|p| p.carried)
            .unwrap_or_else(|| self.state.previous_allocation());
        Ok(SimulationSummary {
            policy: self.policy,
            periods,
            final_allocation,
        })
    }

    async fn pass(&mut self) -> Result<PeriodOutcome> {
        let previous = self.state.previous_allocation();
        let trace = self.engine.run_pass(&mut self.state).await?;

        let state = &self.state;
        let risk = state.require_risk_report()?;
        let record = state
            .execution()
            .ok_or_else(|| PipelineError::missing_field(StateField::Execution.name()))?;
        let approval = state
            .human_approval()
            .ok_or_else(|| PipelineError::missing_field(StateField::HumanApproval.name()))?;

        Ok(PeriodOutcome {
            label: state.current_period_label.clone(),
            run_id: trace.run_id,
            previous,
            proposed: state.require_cio_report()?.allocation(),
            verdict: risk.verdict.clone(),
            approval,
            outcome: record.outcome,
            realized: record.realized,
            carried: self.policy.carried(state)?,
        })
    }
}
