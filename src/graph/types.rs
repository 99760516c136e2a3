//! Flow graph type definitions
//!
//! These types mirror what the visual editor authors: nodes with literal
//! input values, and edges wiring output ports to input ports.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::catalog::StepKind;

/// Editor canvas position; carried through snapshots, never interpreted
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A node in the flow graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node
    pub id: String,
    /// Which step this node executes
    pub step: StepKind,
    #[serde(default)]
    pub position: Position,
    /// Literal values authored on input ports; a connected edge overrides
    /// a literal on the same port
    #[serde(default)]
    pub inputs: HashMap<String, Value>,
}

impl Node {
    pub fn new(id: impl Into<String>, step: StepKind) -> Self {
        Self {
            id: id.into(),
            step,
            position: Position::default(),
            inputs: HashMap::new(),
        }
    }

    pub fn with_input(mut self, port: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(port.into(), value.into());
        self
    }

    /// The literal authored on a port, if any; null counts as absent
    pub fn literal(&self, port: &str) -> Option<&Value> {
        self.inputs.get(port).filter(|v| !v.is_null())
    }
}

/// A connection from one node's output port to another node's input port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub source_output: String,
    pub target: String,
    pub target_input: String,
}

impl Edge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        source_output: impl Into<String>,
        target: impl Into<String>,
        target_input: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            source_output: source_output.into(),
            target: target.into(),
            target_input: target_input.into(),
        }
    }
}

/// A complete user-drawn graph: the compiler's input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowGraph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}
