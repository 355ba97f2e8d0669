//! Superstep scheduler for one pipeline pass
//!
//! Every superstep runs the set of ready nodes concurrently against the same
//! snapshot of state, then merges their updates in one atomic write. A node
//! reached by a static edge is ready once all its static predecessors have
//! completed, which is what makes the CIO step a join barrier. A node selected
//! by a conditional edge is ready in the next superstep.

use super::{EngineConfig, Step, TryAgainPolicy};
use crate::error::{PipelineError, Result};
use crate::graph::{NodeId, PipelineGraph};
use crate::state::{HumanApproval, SharedState, StateUpdate};
use futures::future::try_join_all;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Static,
    Conditional,
}

/// Record of what ran during a pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassTrace {
    pub run_id: Uuid,
    /// Nodes run in each superstep, in order
    pub supersteps: Vec<Vec<NodeId>>,
    /// Target chosen by the conditional edge, if one was evaluated
    pub routed_to: Option<NodeId>,
}

impl PassTrace {
    pub fn superstep_of(&self, id: NodeId) -> Option<usize> {
        self.supersteps.iter().position(|nodes| nodes.contains(&id))
    }

    pub fn ran(&self, id: NodeId) -> bool {
        self.superstep_of(id).is_some()
    }

    pub fn order(&self) -> Vec<NodeId> {
        self.supersteps.iter().flatten().copied().collect()
    }
}

pub struct ExecutionEngine {
    graph: Arc<PipelineGraph>,
    config: EngineConfig,
}

impl ExecutionEngine {
    pub fn new(graph: PipelineGraph, config: EngineConfig) -> Self {
        Self {
            graph: Arc::new(graph),
            config,
        }
    }

    pub fn graph(&self) -> &PipelineGraph {
        &self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one full pass, mutating `state` in place.
    ///
    /// Any step failure, timeout or routing failure aborts the pass. Updates
    /// from the superstep that failed are discarded.
    pub async fn run_pass(&self, state: &mut SharedState) -> Result<PassTrace> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "pass",
            run_id = %run_id,
            period = %state.current_period_label
        );
        self.run_supersteps(run_id, state).instrument(span).await
    }

    async fn run_supersteps(&self, run_id: Uuid, state: &mut SharedState) -> Result<PassTrace> {
        let mut trace = PassTrace {
            run_id,
            supersteps: Vec::new(),
            routed_to: None,
        };
        let mut completed: BTreeSet<NodeId> = BTreeSet::new();
        let mut triggered: BTreeMap<NodeId, Trigger> = self
            .graph
            .entry_nodes()
            .iter()
            .filter(|id| !id.is_synthetic())
            .map(|&id| (id, Trigger::Static))
            .collect();

        info!("starting pass");

        while !triggered.is_empty() {
            let ready: Vec<NodeId> = triggered
                .iter()
                .filter(|(id, trigger)| {
                    **trigger == Trigger::Conditional || self.predecessors_done(**id, &completed)
                })
                .map(|(id, _)| *id)
                .collect();

            if ready.is_empty() {
                let waiting: Vec<&str> = triggered.keys().map(NodeId::as_str).collect();
                return Err(PipelineError::graph(format!(
                    "pass stalled with nodes waiting on predecessors that never ran: {}",
                    waiting.join(", ")
                )));
            }

            let updates = self.run_superstep(&ready, state).await?;
            self.merge(updates, state)?;

            for &id in &ready {
                triggered.remove(&id);
                completed.insert(id);
            }
            trace.supersteps.push(ready.clone());

            for &id in &ready {
                for &next in self.graph.static_successors(id) {
                    if next != NodeId::End {
                        triggered.entry(next).or_insert(Trigger::Static);
                    }
                }
                if let Some(edge) = self.graph.conditional(id) {
                    let route = edge.route(state).map_err(|e| e.in_step(id))?;
                    info!(from = %id, to = %route.target, "routed");
                    if !route.update.is_empty() {
                        debug!(fields = ?route.update.fields(), "route implies state update");
                        self.guard_try_again(&route.update)?;
                        state.apply(route.update).map_err(|e| e.in_step(id))?;
                    }
                    trace.routed_to = Some(route.target);
                    if route.target != NodeId::End {
                        triggered.insert(route.target, Trigger::Conditional);
                    }
                }
            }

            if let Some(again) = triggered.keys().find(|id| completed.contains(id)) {
                return Err(PipelineError::graph(format!("{again} triggered twice in one pass")));
            }
        }

        info!(supersteps = trace.supersteps.len(), "pass complete");
        Ok(trace)
    }

    fn predecessors_done(&self, id: NodeId, completed: &BTreeSet<NodeId>) -> bool {
        self.graph
            .static_predecessors(id)
            .iter()
            .all(|pred| *pred == NodeId::Start || completed.contains(pred))
    }

    /// Run every ready node against the same snapshot; the first failure
    /// cancels the rest
    async fn run_superstep(
        &self,
        ready: &[NodeId],
        state: &SharedState,
    ) -> Result<Vec<(NodeId, StateUpdate)>> {
        let calls = ready.iter().map(|&id| async move {
            let step = self
                .graph
                .step(id)
                .ok_or_else(|| PipelineError::graph(format!("{id} has no registered step")))?;
            self.call_step(id, step.as_ref(), state)
                .await
                .map(|update| (id, update))
                .map_err(|e| e.in_step(id))
        });
        try_join_all(calls).await
    }

    async fn call_step(&self, id: NodeId, step: &dyn Step, state: &SharedState) -> Result<StateUpdate> {
        let started = Instant::now();
        info!(step = %id, "step started");

        let update = if step.awaits_decision() {
            step.run(state).await?
        } else {
            let bound = self.config.step_timeout;
            tokio::time::timeout(bound, step.run(state))
                .await
                .map_err(|_| PipelineError::timeout(id, bound))??
        };

        info!(
            step = %id,
            fields = ?update.fields(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "step finished"
        );
        Ok(update)
    }

    /// Validate and combine the superstep's updates, then write them in one go
    fn merge(&self, updates: Vec<(NodeId, StateUpdate)>, state: &mut SharedState) -> Result<()> {
        let mut merged = StateUpdate::new();
        for (id, update) in updates {
            self.check_update(id, &update, state)?;
            merged = merged.combine(update)?;
        }
        state.apply(merged)
    }

    fn check_update(&self, id: NodeId, update: &StateUpdate, state: &SharedState) -> Result<()> {
        state.check_writable(update).map_err(|e| e.in_step(id))?;
        if let Some(tolerance) = self.config.allocation_tolerance {
            for (field, report) in update.allocation_reports() {
                report
                    .allocation()
                    .check_sum(field.name(), tolerance)
                    .map_err(|e| e.in_step(id))?;
            }
        }
        self.guard_try_again(update).map_err(|e| e.in_step(id))
    }

    fn guard_try_again(&self, update: &StateUpdate) -> Result<()> {
        if update.human_approval == Some(HumanApproval::TryAgain) {
            if self.config.on_try_again == TryAgainPolicy::Fail {
                return Err(PipelineError::unsupported(
                    "try again was requested but re-running the pass is not implemented",
                ));
            }
            warn!("try again requested; the pass will finish without a rebalance");
        }
        Ok(())
    }
}

