// SPDX-License-Identifier: MIT

//! Run execution: durable records, the shared session resource, the
//! per-step environment, and the orchestrator that drives a plan

pub mod environment;
pub mod orchestrator;
pub mod session;
pub mod store;

pub use environment::Environment;
pub use orchestrator::Orchestrator;
pub use session::{PageSession, SessionDriver, SessionHandle, SessionSlot};
pub use store::{MemoryRunStore, RunStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::compiler::Plan;
use crate::graph::Node;

/// What started a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Manual,
    Cron,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Status of a single node's execution within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Created,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
}

/// One timestamped line in a phase execution's audit log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLine {
    pub at: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogLine {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            level: LogLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            level: LogLevel::Error,
            message: message.into(),
        }
    }
}

/// One execution attempt of a plan
///
/// The plan is snapshotted into the record at start time, so later edits
/// to the live graph cannot affect an in-flight or historical run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub workflow_id: String,
    pub trigger: Trigger,
    pub plan: Plan,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub credits_consumed: u32,
}

impl Run {
    pub fn new(workflow_id: impl Into<String>, plan: Plan, trigger: Trigger) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id: workflow_id.into(),
            trigger,
            plan,
            status: RunStatus::Pending,
            started_at: Utc::now(),
            completed_at: None,
            credits_consumed: 0,
        }
    }
}

/// Audit record for one node's execution; created right before the node's
/// handler runs, mutated only by the orchestrator, never deleted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseExecution {
    pub id: Uuid,
    pub run_id: Uuid,
    pub phase_index: usize,
    pub node: Node,
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub inputs: HashMap<String, serde_json::Value>,
    pub outputs: HashMap<String, serde_json::Value>,
    pub credits_consumed: u32,
    pub log: Vec<LogLine>,
}

impl PhaseExecution {
    pub fn new(
        run_id: Uuid,
        phase_index: usize,
        node: Node,
        inputs: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            phase_index,
            node,
            status: StepStatus::Created,
            started_at: None,
            completed_at: None,
            inputs,
            outputs: HashMap::new(),
            credits_consumed: 0,
            log: Vec::new(),
        }
    }
}

/// Final outcome handed back to the trigger source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub credits_consumed: u32,
}

/// Cooperative cancellation flag checked between steps
///
/// The in-flight step always finishes; the run is then marked failed
/// without starting further nodes.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StepKind;

    #[test]
    fn test_new_run_is_pending() {
        let plan = Plan {
            phases: vec![],
            edges: vec![],
        };
        let run = Run::new("wf-1", plan, Trigger::Manual);
        assert_eq!(run.status, RunStatus::Pending);
        assert_eq!(run.credits_consumed, 0);
        assert!(run.completed_at.is_none());
    }

    #[test]
    fn test_new_phase_execution_is_created() {
        let node = Node::new("a", StepKind::Delay);
        let exec = PhaseExecution::new(Uuid::new_v4(), 0, node, HashMap::new());
        assert_eq!(exec.status, StepStatus::Created);
        assert!(exec.started_at.is_none());
        assert!(exec.log.is_empty());
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!flag.is_cancelled());
        clone.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_log_line_levels() {
        assert_eq!(LogLine::info("ok").level, LogLevel::Info);
        assert_eq!(LogLine::error("bad").level, LogLevel::Error);
    }
}
