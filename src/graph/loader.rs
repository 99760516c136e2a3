//! Flow loader - YAML/JSON file loading and parsing
//!
//! The CLI and scheduled triggers read flow files through this module.
//! YAML is a JSON superset, so `.json` exports from the editor load
//! through the same path.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::types::FlowGraph;
use crate::error::FlowError;

/// Top-level flow file: a named graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub graph: FlowGraph,
}

/// Loads flow definitions from YAML/JSON files
pub struct FlowLoader;

impl FlowLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a flow definition from a file
    pub fn load_flow<P: AsRef<Path>>(&self, path: P) -> Result<FlowDefinition, FlowError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a flow definition from a YAML/JSON string
    pub fn parse(content: &str) -> Result<FlowDefinition, FlowError> {
        let def: FlowDefinition = serde_yaml::from_str(content)?;
        Ok(def)
    }
}

impl Default for FlowLoader {
    fn default() -> Self {
        Self::new()
    }
}
