// SPDX-License-Identifier: MIT

//! Execution environment - the only surface a step handler sees
//!
//! One instance per (run, node). Input reads fall back from edge-resolved
//! value to the node's literal to the port type's zero value and never
//! fail; a required-but-absent value is the handler's own error to report.
//! Outputs and log lines are buffered here and harvested by the
//! orchestrator after the handler returns.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::session::{SessionHandle, SessionSlot};
use super::LogLine;
use crate::catalog::{StepDescriptor, ValueType};
use crate::error::SessionError;
use crate::graph::Node;

pub struct Environment {
    node: Node,
    input_types: HashMap<String, ValueType>,
    /// Edge-resolved values only; literals stay on the node
    resolved: HashMap<String, Value>,
    outputs: HashMap<String, Value>,
    log: Vec<LogLine>,
    session: Arc<SessionSlot>,
}

impl Environment {
    pub fn new(
        node: Node,
        descriptor: &StepDescriptor,
        resolved: HashMap<String, Value>,
        session: Arc<SessionSlot>,
    ) -> Self {
        let input_types = descriptor
            .inputs
            .iter()
            .map(|p| (p.name.to_string(), p.value_type))
            .collect();
        Self {
            node,
            input_types,
            resolved,
            outputs: HashMap::new(),
            log: Vec::new(),
            session,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node.id
    }

    /// Edge-resolved value, else the node's literal, else the port type's
    /// zero value
    pub fn input(&self, port: &str) -> Value {
        if let Some(value) = self.resolved.get(port) {
            return value.clone();
        }
        if let Some(value) = self.node.literal(port) {
            return value.clone();
        }
        self.input_types
            .get(port)
            .map(|t| t.zero())
            .unwrap_or(Value::Null)
    }

    pub fn string_input(&self, port: &str) -> String {
        match self.input(port) {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn number_input(&self, port: &str) -> f64 {
        self.input(port).as_f64().unwrap_or(0.0)
    }

    pub fn json_input(&self, port: &str) -> Value {
        self.input(port)
    }

    /// Buffer an output value; visible downstream only after the handler
    /// returns true
    pub fn set_output(&mut self, port: impl Into<String>, value: Value) {
        self.outputs.insert(port.into(), value);
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.log.push(LogLine::info(message));
    }

    /// Diagnostic only; the handler's boolean return stays the sole
    /// failure signal
    pub fn log_error(&mut self, message: impl Into<String>) {
        self.log.push(LogLine::error(message));
    }

    /// The run's single page session, opened lazily on first call
    pub async fn acquire_session(&self) -> Result<SessionHandle, SessionError> {
        self.session.acquire().await
    }

    /// Close the run's session early; the orchestrator still releases
    /// unconditionally at the end of the run
    pub async fn release_session(&self) -> Result<(), SessionError> {
        self.session.release().await
    }

    pub(crate) fn into_parts(self) -> (HashMap<String, Value>, Vec<LogLine>) {
        (self.outputs, self.log)
    }
}
