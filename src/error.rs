// SPDX-License-Identifier: MIT

//! Typed error handling for conveyor-rs
//!
//! Compilation errors are their own enum because the editor surfaces them
//! to the user per node/port; everything else folds into [`FlowError`].

use thiserror::Error;

use crate::catalog::StepKind;

/// Top-level error type for conveyor-rs
#[derive(Debug, Error)]
pub enum FlowError {
    /// Graph compilation errors (no run is created)
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Run/phase-execution persistence errors
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Browser session acquisition or teardown errors
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A plan names a step kind with no registered handler
    #[error("no handler registered for step kind '{0}'")]
    MissingHandler(StepKind),

    /// Configuration errors (missing env vars, invalid config)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Generic error wrapper for compatibility
    #[error("{0}")]
    Other(String),
}

/// Errors raised while lowering a flow graph into a plan
#[derive(Debug, Error)]
pub enum CompileError {
    /// A node references a step kind the catalog does not describe
    #[error("node '{node}' has an unknown step kind")]
    UnknownStep { node: String },

    /// Two nodes share one id
    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),

    /// An edge references a missing node/port, mismatched port types, or
    /// feeds a port that already has a feeding edge
    #[error("invalid connection '{edge}': {reason}")]
    InvalidConnection { edge: String, reason: String },

    /// The graph contains a dependency cycle; `node` is the first node a
    /// back-edge was found on
    #[error("cycle detected through node '{node}'")]
    CycleDetected { node: String },

    /// A required input port is neither connected nor given a literal value
    #[error("required input '{port}' of node '{node}' is neither connected nor set")]
    UnresolvedRequiredInput { node: String, port: String },
}

/// Run store errors (infrastructure, never swallowed)
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Browser session errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// The browser process could not be launched or attached
    #[error("failed to open browser session: {0}")]
    Launch(String),

    /// A page action was attempted with no session open
    #[error("no session is open")]
    NotOpen,

    /// A page action (navigation, click, fill, ...) failed
    #[error("page action failed: {0}")]
    Action(String),

    /// Waiting for a selector exceeded the driver's deadline
    #[error("timed out waiting for '{selector}'")]
    WaitTimeout { selector: String },
}

impl FlowError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create from a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<&str> for FlowError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for FlowError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for FlowError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::Other(err.to_string())
    }
}
