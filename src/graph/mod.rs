//! Static pipeline topology
//!
//! A graph is a set of registered nodes, the static edges between them, and at
//! most one conditional edge per branching node. `START` and `END` are
//! synthetic. The graph is validated once in [`GraphBuilder::build`]; the
//! engine only ever sees a [`PipelineGraph`] that passed validation.

mod routing;
mod validation;

pub use routing::{route_risk_verdict, verdict_target};

use crate::engine::Step;
use crate::error::{ErrorCode, PipelineError, Result};
use crate::state::{SharedState, StateUpdate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Identifier of a node in the allocation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeId {
    Start,
    Analyst,
    Quant,
    Cio,
    Risk,
    Human,
    Execution,
    End,
}

impl NodeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeId::Start => "START",
            NodeId::Analyst => "AnalystStep",
            NodeId::Quant => "QuantStep",
            NodeId::Cio => "CIOStep",
            NodeId::Risk => "RiskStep",
            NodeId::Human => "HumanStep",
            NodeId::Execution => "ExecutionStep",
            NodeId::End => "END",
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, NodeId::Start | NodeId::End)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a conditional edge: where to go, plus any fields implied by
/// taking that branch
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub target: NodeId,
    pub update: StateUpdate,
}

impl Route {
    pub fn to(target: NodeId) -> Self {
        Self {
            target,
            update: StateUpdate::default(),
        }
    }

    pub fn with_update(mut self, update: StateUpdate) -> Self {
        self.update = update;
        self
    }
}

pub type RouterFn = Arc<dyn Fn(&SharedState) -> Result<Route> + Send + Sync>;

/// Runtime branch from one node, declared with every target it may select
#[derive(Clone)]
pub struct ConditionalEdge {
    pub source: NodeId,
    pub targets: Vec<NodeId>,
    router: RouterFn,
}

impl ConditionalEdge {
    /// Evaluate the branch; selecting an undeclared target is a routing failure
    pub fn route(&self, state: &SharedState) -> Result<Route> {
        let route = (self.router)(state)?;
        if !self.targets.contains(&route.target) {
            return Err(PipelineError::graph(format!(
                "router on {} selected undeclared target {}",
                self.source, route.target
            )));
        }
        Ok(route)
    }
}

impl fmt::Debug for ConditionalEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalEdge")
            .field("source", &self.source)
            .field("targets", &self.targets)
            .finish()
    }
}

/// Builder collecting nodes and edges; problems are reported together at build
#[derive(Default)]
pub struct GraphBuilder {
    nodes: BTreeMap<NodeId, Arc<dyn Step>>,
    edges: Vec<(NodeId, NodeId)>,
    conditionals: BTreeMap<NodeId, ConditionalEdge>,
    errors: Vec<(u16, String)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(mut self, id: NodeId, step: Arc<dyn Step>) -> Self {
        if id.is_synthetic() {
            self.errors.push((
                ErrorCode::GRAPH_GENERIC,
                format!("{id} is synthetic and cannot be registered"),
            ));
        } else if self.nodes.insert(id, step).is_some() {
            self.errors.push((
                ErrorCode::GRAPH_DUPLICATE_NODE,
                format!("{id} registered more than once"),
            ));
        }
        self
    }

    pub fn add_edge(mut self, from: NodeId, to: NodeId) -> Self {
        self.edges.push((from, to));
        self
    }

    pub fn add_conditional_edges<F>(mut self, source: NodeId, targets: &[NodeId], router: F) -> Self
    where
        F: Fn(&SharedState) -> Result<Route> + Send + Sync + 'static,
    {
        let edge = ConditionalEdge {
            source,
            targets: targets.to_vec(),
            router: Arc::new(router),
        };
        if self.conditionals.insert(source, edge).is_some() {
            self.errors.push((
                ErrorCode::GRAPH_DUPLICATE_ROUTER,
                format!("{source} has more than one conditional edge"),
            ));
        }
        self
    }

    pub fn build(self) -> Result<PipelineGraph> {
        if let Some((code, message)) = self.errors.into_iter().next() {
            return Err(PipelineError::graph_with_code(code, message));
        }
        validation::validate(&self.nodes, &self.edges, &self.conditionals)?;

        let mut successors: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        let mut predecessors: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for &(from, to) in &self.edges {
            successors.entry(from).or_default().push(to);
            predecessors.entry(to).or_default().push(from);
        }

        Ok(PipelineGraph {
            nodes: self.nodes,
            successors,
            predecessors,
            conditionals: self.conditionals,
        })
    }
}

/// Validated, immutable topology
pub struct PipelineGraph {
    nodes: BTreeMap<NodeId, Arc<dyn Step>>,
    successors: BTreeMap<NodeId, Vec<NodeId>>,
    predecessors: BTreeMap<NodeId, Vec<NodeId>>,
    conditionals: BTreeMap<NodeId, ConditionalEdge>,
}

impl PipelineGraph {
    pub fn step(&self, id: NodeId) -> Option<&Arc<dyn Step>> {
        self.nodes.get(&id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Nodes launched at the start of a pass
    pub fn entry_nodes(&self) -> &[NodeId] {
        self.static_successors(NodeId::Start)
    }

    pub fn static_successors(&self, id: NodeId) -> &[NodeId] {
        self.successors.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn static_predecessors(&self, id: NodeId) -> &[NodeId] {
        self.predecessors.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn conditional(&self, id: NodeId) -> Option<&ConditionalEdge> {
        self.conditionals.get(&id)
    }

    /// Plain-text listing of the topology
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let mut sources: Vec<NodeId> = self.successors.keys().copied().collect();
        sources.extend(self.conditionals.keys().copied());
        sources.sort();
        sources.dedup();

        for source in sources {
            for target in self.static_successors(source) {
                out.push_str(&format!("{source} -> {target}\n"));
            }
            if let Some(edge) = self.conditional(source) {
                let targets: Vec<&str> = edge.targets.iter().map(NodeId::as_str).collect();
                out.push_str(&format!("{source} -?-> {{{}}}\n", targets.join(", ")));
            }
        }
        out
    }
}

impl fmt::Debug for PipelineGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineGraph")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("successors", &self.successors)
            .field("conditionals", &self.conditionals)
            .finish()
    }
}
