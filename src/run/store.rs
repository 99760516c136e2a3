// SPDX-License-Identifier: MIT

//! Durable run storage seam
//!
//! The orchestrator only needs atomic single-record creates and updates;
//! it never asks for cross-record transactions. `MemoryRunStore` is the
//! in-process implementation used by the CLI and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{PhaseExecution, Run};
use crate::error::StoreError;

#[async_trait]
pub trait RunStore: Send + Sync {
    async fn create_run(&self, run: &Run) -> Result<(), StoreError>;
    async fn update_run(&self, run: &Run) -> Result<(), StoreError>;
    async fn create_phase_execution(&self, exec: &PhaseExecution) -> Result<(), StoreError>;
    async fn update_phase_execution(&self, exec: &PhaseExecution) -> Result<(), StoreError>;
    async fn run(&self, id: Uuid) -> Result<Run, StoreError>;
    /// Phase executions of a run, in creation order
    async fn phase_executions(&self, run_id: Uuid) -> Result<Vec<PhaseExecution>, StoreError>;
}

#[derive(Clone, Default)]
pub struct MemoryRunStore {
    runs: Arc<RwLock<HashMap<Uuid, Run>>>,
    executions: Arc<RwLock<Vec<PhaseExecution>>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn create_run(&self, run: &Run) -> Result<(), StoreError> {
        let mut runs = self.runs.write().await;
        if runs.contains_key(&run.id) {
            return Err(StoreError::Backend(format!(
                "run {} already exists",
                run.id
            )));
        }
        runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn update_run(&self, run: &Run) -> Result<(), StoreError> {
        let mut runs = self.runs.write().await;
        if !runs.contains_key(&run.id) {
            return Err(StoreError::NotFound(format!("run {}", run.id)));
        }
        runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn create_phase_execution(&self, exec: &PhaseExecution) -> Result<(), StoreError> {
        let mut executions = self.executions.write().await;
        executions.push(exec.clone());
        Ok(())
    }

    async fn update_phase_execution(&self, exec: &PhaseExecution) -> Result<(), StoreError> {
        let mut executions = self.executions.write().await;
        match executions.iter_mut().find(|e| e.id == exec.id) {
            Some(slot) => {
                *slot = exec.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("phase execution {}", exec.id))),
        }
    }

    async fn run(&self, id: Uuid) -> Result<Run, StoreError> {
        let runs = self.runs.read().await;
        runs.get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("run {id}")))
    }

    async fn phase_executions(&self, run_id: Uuid) -> Result<Vec<PhaseExecution>, StoreError> {
        let executions = self.executions.read().await;
        Ok(executions
            .iter()
            .filter(|e| e.run_id == run_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StepKind;
    use crate::compiler::Plan;
    use crate::graph::Node;
    use crate::run::{RunStatus, StepStatus, Trigger};

    fn empty_run() -> Run {
        Run::new(
            "wf",
            Plan {
                phases: vec![],
                edges: vec![],
            },
            Trigger::Manual,
        )
    }

    #[tokio::test]
    async fn test_create_and_read_run() {
        let store = MemoryRunStore::new();
        let run = empty_run();
        store.create_run(&run).await.unwrap();

        let loaded = store.run(run.id).await.unwrap();
        assert_eq!(loaded.status, RunStatus::Pending);
    }

    #[tokio::test]
    async fn test_update_missing_run_fails() {
        let store = MemoryRunStore::new();
        let run = empty_run();
        let err = store.update_run(&run).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_create_fails() {
        let store = MemoryRunStore::new();
        let run = empty_run();
        store.create_run(&run).await.unwrap();
        assert!(store.create_run(&run).await.is_err());
    }

    #[tokio::test]
    async fn test_phase_executions_filtered_by_run_in_order() {
        let store = MemoryRunStore::new();
        let run_a = empty_run();
        let run_b = empty_run();

        for (run, node_id) in [(&run_a, "first"), (&run_a, "second"), (&run_b, "other")] {
            let exec = PhaseExecution::new(
                run.id,
                0,
                Node::new(node_id, StepKind::Delay),
                Default::default(),
            );
            store.create_phase_execution(&exec).await.unwrap();
        }

        let execs = store.phase_executions(run_a.id).await.unwrap();
        assert_eq!(execs.len(), 2);
        assert_eq!(execs[0].node.id, "first");
        assert_eq!(execs[1].node.id, "second");
    }

    #[tokio::test]
    async fn test_update_phase_execution() {
        let store = MemoryRunStore::new();
        let run = empty_run();
        let mut exec = PhaseExecution::new(
            run.id,
            0,
            Node::new("a", StepKind::Delay),
            Default::default(),
        );
        store.create_phase_execution(&exec).await.unwrap();

        exec.status = StepStatus::Completed;
        exec.credits_consumed = 3;
        store.update_phase_execution(&exec).await.unwrap();

        let execs = store.phase_executions(run.id).await.unwrap();
        assert_eq!(execs[0].status, StepStatus::Completed);
        assert_eq!(execs[0].credits_consumed, 3);
    }
}
