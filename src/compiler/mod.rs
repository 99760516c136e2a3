// SPDX-License-Identifier: MIT

//! Graph compiler - lowers a user-drawn flow graph into an ordered plan
//!
//! A plan is a list of phases; every node lands in the earliest phase in
//! which all of its connected predecessors have already run. Node order
//! within a phase is the source graph's insertion order, so compiling the
//! same graph twice yields the same plan.

mod cost;

pub use cost::estimate_credits;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::catalog::Catalog;
use crate::error::CompileError;
use crate::graph::{Edge, FlowGraph, Node};

/// One layer of the plan: steps whose dependencies are all satisfied by
/// earlier phases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    pub index: usize,
    pub nodes: Vec<Node>,
}

/// The compiled, ordered execution plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub phases: Vec<Phase>,
    /// Edge wiring carried alongside the phases so a run snapshot is
    /// self-contained
    pub edges: Vec<Edge>,
}

impl Plan {
    pub fn node_count(&self) -> usize {
        self.phases.iter().map(|p| p.nodes.len()).sum()
    }

    /// Phase index of a node, if the plan contains it
    pub fn phase_of(&self, node_id: &str) -> Option<usize> {
        self.phases
            .iter()
            .find(|p| p.nodes.iter().any(|n| n.id == node_id))
            .map(|p| p.index)
    }
}

/// Compile a flow graph against a catalog
pub fn compile(graph: &FlowGraph, catalog: &Catalog) -> Result<Plan, CompileError> {
    let mut by_id: HashMap<&str, &Node> = HashMap::new();
    for node in &graph.nodes {
        if by_id.insert(node.id.as_str(), node).is_some() {
            return Err(CompileError::DuplicateNode(node.id.clone()));
        }
        if catalog.lookup(node.step).is_none() {
            return Err(CompileError::UnknownStep {
                node: node.id.clone(),
            });
        }
    }

    validate_edges(graph, &by_id, catalog)?;

    // Dependency adjacency over node ids; edge direction = source runs first.
    let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut predecessors: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &graph.edges {
        successors
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
        predecessors
            .entry(edge.target.as_str())
            .or_default()
            .push(edge.source.as_str());
    }

    detect_cycles(graph, &successors)?;
    check_required_inputs(graph, catalog)?;

    // Longest path from the sources, memoized; acyclicity is established.
    let mut memo: HashMap<&str, usize> = HashMap::new();
    let mut grouped: BTreeMap<usize, Vec<Node>> = BTreeMap::new();
    for node in &graph.nodes {
        let index = phase_index(node.id.as_str(), &predecessors, &mut memo);
        grouped.entry(index).or_default().push(node.clone());
    }

    // Re-enumerating collapses any gaps so phase indices are contiguous.
    let phases = grouped
        .into_values()
        .enumerate()
        .map(|(index, nodes)| Phase { index, nodes })
        .collect();

    Ok(Plan {
        phases,
        edges: graph.edges.clone(),
    })
}

fn validate_edges(
    graph: &FlowGraph,
    by_id: &HashMap<&str, &Node>,
    catalog: &Catalog,
) -> Result<(), CompileError> {
    let mut fed: HashSet<(&str, &str)> = HashSet::new();

    for edge in &graph.edges {
        let invalid = |reason: String| CompileError::InvalidConnection {
            edge: edge.id.clone(),
            reason,
        };

        let source = by_id
            .get(edge.source.as_str())
            .ok_or_else(|| invalid(format!("source node '{}' does not exist", edge.source)))?;
        let target = by_id
            .get(edge.target.as_str())
            .ok_or_else(|| invalid(format!("target node '{}' does not exist", edge.target)))?;

        let source_desc = catalog
            .lookup(source.step)
            .ok_or_else(|| CompileError::UnknownStep {
                node: source.id.clone(),
            })?;
        let target_desc = catalog
            .lookup(target.step)
            .ok_or_else(|| CompileError::UnknownStep {
                node: target.id.clone(),
            })?;

        let output = source_desc.output(&edge.source_output).ok_or_else(|| {
            invalid(format!(
                "node '{}' has no output port '{}'",
                edge.source, edge.source_output
            ))
        })?;
        let input = target_desc.input(&edge.target_input).ok_or_else(|| {
            invalid(format!(
                "node '{}' has no input port '{}'",
                edge.target, edge.target_input
            ))
        })?;

        if output.value_type != input.value_type {
            return Err(invalid(format!(
                "port type mismatch: '{}.{}' is {:?} but '{}.{}' is {:?}",
                edge.source,
                edge.source_output,
                output.value_type,
                edge.target,
                edge.target_input,
                input.value_type
            )));
        }

        if !fed.insert((edge.target.as_str(), edge.target_input.as_str())) {
            return Err(invalid(format!(
                "input '{}.{}' is fed by more than one edge",
                edge.target, edge.target_input
            )));
        }
    }

    Ok(())
}

/// Depth-first cycle detection; the first node a back-edge lands on is
/// reported
fn detect_cycles<'a>(
    graph: &'a FlowGraph,
    successors: &HashMap<&'a str, Vec<&'a str>>,
) -> Result<(), CompileError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        InProgress,
        Done,
    }

    fn visit<'a>(
        id: &'a str,
        successors: &HashMap<&'a str, Vec<&'a str>>,
        marks: &mut HashMap<&'a str, Mark>,
    ) -> Result<(), CompileError> {
        marks.insert(id, Mark::InProgress);
        if let Some(next) = successors.get(id) {
            for &succ in next {
                match marks.get(succ) {
                    Some(Mark::InProgress) => {
                        return Err(CompileError::CycleDetected {
                            node: succ.to_string(),
                        })
                    }
                    Some(Mark::Done) => {}
                    None => visit(succ, successors, marks)?,
                }
            }
        }
        marks.insert(id, Mark::Done);
        Ok(())
    }

    let mut marks: HashMap<&str, Mark> = HashMap::new();
    for node in &graph.nodes {
        if !marks.contains_key(node.id.as_str()) {
            visit(node.id.as_str(), successors, &mut marks)?;
        }
    }
    Ok(())
}

fn check_required_inputs(graph: &FlowGraph, catalog: &Catalog) -> Result<(), CompileError> {
    let fed: HashSet<(&str, &str)> = graph
        .edges
        .iter()
        .map(|e| (e.target.as_str(), e.target_input.as_str()))
        .collect();

    for node in &graph.nodes {
        let desc = catalog
            .lookup(node.step)
            .ok_or_else(|| CompileError::UnknownStep {
                node: node.id.clone(),
            })?;
        for port in desc.inputs.iter().filter(|p| p.required) {
            let connected = fed.contains(&(node.id.as_str(), port.name));
            if !connected && node.literal(port.name).is_none() {
                return Err(CompileError::UnresolvedRequiredInput {
                    node: node.id.clone(),
                    port: port.name.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn phase_index<'a>(
    id: &'a str,
    predecessors: &HashMap<&'a str, Vec<&'a str>>,
    memo: &mut HashMap<&'a str, usize>,
) -> usize {
    if let Some(cached) = memo.get(id) {
        return *cached;
    }
    let index = predecessors
        .get(id)
        .map(|preds| {
            preds
                .iter()
                .map(|&p| phase_index(p, predecessors, memo) + 1)
                .max()
                .unwrap_or(0)
        })
        .unwrap_or(0);
    memo.insert(id, index);
    index
}
