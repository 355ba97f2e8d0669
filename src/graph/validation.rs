//! Pure structural checks run once when a graph is built

use super::{ConditionalEdge, NodeId};
use crate::engine::Step;
use crate::error::{ErrorCode, PipelineError, Result};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

pub(super) fn validate(
    nodes: &BTreeMap<NodeId, Arc<dyn Step>>,
    edges: &[(NodeId, NodeId)],
    conditionals: &BTreeMap<NodeId, ConditionalEdge>,
) -> Result<()> {
    let registered: BTreeSet<NodeId> = nodes.keys().copied().collect();

    for &(from, to) in edges {
        check_source(&registered, from)?;
        check_target(&registered, to)?;
    }

    for edge in conditionals.values() {
        if edge.source == NodeId::Start {
            return Err(PipelineError::graph("START cannot branch conditionally"));
        }
        check_source(&registered, edge.source)?;
        if edge.targets.is_empty() {
            return Err(PipelineError::graph(format!(
                "conditional edge on {} declares no targets",
                edge.source
            )));
        }
        for &target in &edge.targets {
            check_target(&registered, target)?;
        }
    }

    let adjacency = adjacency(edges, conditionals);

    if adjacency.get(&NodeId::Start).map_or(true, Vec::is_empty) {
        return Err(PipelineError::graph("START has no outgoing edges"));
    }

    if has_cycles(&adjacency) {
        return Err(PipelineError::graph_with_code(
            ErrorCode::GRAPH_CYCLE,
            "graph contains a cycle",
        ));
    }

    let from_start = reachable(&adjacency, NodeId::Start);
    if let Some(orphan) = registered.iter().find(|id| !from_start.contains(id)) {
        return Err(PipelineError::graph_with_code(
            ErrorCode::GRAPH_UNREACHABLE,
            format!("{orphan} is not reachable from START"),
        ));
    }

    for &id in &registered {
        if !reachable(&adjacency, id).contains(&NodeId::End) {
            return Err(PipelineError::graph_with_code(
                ErrorCode::GRAPH_UNREACHABLE,
                format!("{id} cannot reach END"),
            ));
        }
    }

    Ok(())
}

fn check_source(registered: &BTreeSet<NodeId>, id: NodeId) -> Result<()> {
    if id == NodeId::End {
        return Err(PipelineError::graph("END cannot have outgoing edges"));
    }
    if id != NodeId::Start && !registered.contains(&id) {
        return Err(unknown(id));
    }
    Ok(())
}

fn check_target(registered: &BTreeSet<NodeId>, id: NodeId) -> Result<()> {
    if id == NodeId::Start {
        return Err(PipelineError::graph("START cannot have incoming edges"));
    }
    if id != NodeId::End && !registered.contains(&id) {
        return Err(unknown(id));
    }
    Ok(())
}

fn unknown(id: NodeId) -> PipelineError {
    PipelineError::graph_with_code(
        ErrorCode::GRAPH_UNKNOWN_NODE,
        format!("edge references unregistered node {id}"),
    )
}

/// Static edges plus every declared conditional target
pub(super) fn adjacency(
    edges: &[(NodeId, NodeId)],
    conditionals: &BTreeMap<NodeId, ConditionalEdge>,
) -> BTreeMap<NodeId, Vec<NodeId>> {
    let mut adjacency: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    for &(from, to) in edges {
        adjacency.entry(from).or_default().push(to);
    }
    for edge in conditionals.values() {
        adjacency
            .entry(edge.source)
            .or_default()
            .extend(edge.targets.iter().copied());
    }
    adjacency
}

pub(super) fn has_cycles(adjacency: &BTreeMap<NodeId, Vec<NodeId>>) -> bool {
    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();

    adjacency.keys().any(|&node| {
        !visited.contains(&node) && has_cycle_dfs(adjacency, node, &mut visited, &mut rec_stack)
    })
}

fn has_cycle_dfs(
    adjacency: &BTreeMap<NodeId, Vec<NodeId>>,
    node: NodeId,
    visited: &mut HashSet<NodeId>,
    rec_stack: &mut HashSet<NodeId>,
) -> bool {
    visited.insert(node);
    rec_stack.insert(node);

    for &next in adjacency.get(&node).map(Vec::as_slice).unwrap_or(&[]) {
        if !visited.contains(&next) {
            if has_cycle_dfs(adjacency, next, visited, rec_stack) {
                return true;
            }
        } else if rec_stack.contains(&next) {
            return true;
        }
    }

    rec_stack.remove(&node);
    false
}

pub(super) fn reachable(
    adjacency: &BTreeMap<NodeId, Vec<NodeId>>,
    from: NodeId,
) -> BTreeSet<NodeId> {
    let mut seen = BTreeSet::new();
    let mut stack = vec![from];
    while let Some(node) = stack.pop() {
        if seen.insert(node) {
            stack.extend(adjacency.get(&node).into_iter().flatten().copied());
        }
    }
    seen
}
