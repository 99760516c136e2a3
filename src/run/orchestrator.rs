// SPDX-License-Identifier: MIT

//! Execution orchestrator - drives a compiled plan end to end
//!
//! Phases in order, nodes in phase order, strictly sequential: every node
//! in a run shares the same page session. A step returning false fails
//! the whole run immediately; the session is released no matter how the
//! run ends.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

use super::environment::Environment;
use super::session::{SessionDriver, SessionSlot};
use super::store::RunStore;
use super::{CancelFlag, PhaseExecution, Run, RunResult, RunStatus, StepStatus, Trigger};
use crate::catalog::Catalog;
use crate::compiler::{compile, Plan};
use crate::error::FlowError;
use crate::graph::{Edge, FlowGraph, Node};
use crate::steps::StepRegistry;

pub struct Orchestrator {
    catalog: Catalog,
    store: Arc<dyn RunStore>,
    driver: Arc<dyn SessionDriver>,
    registry: Arc<StepRegistry>,
}

impl Orchestrator {
    pub fn new(
        catalog: Catalog,
        store: Arc<dyn RunStore>,
        driver: Arc<dyn SessionDriver>,
        registry: Arc<StepRegistry>,
    ) -> Self {
        Self {
            catalog,
            store,
            driver,
            registry,
        }
    }

    /// Compile a graph snapshot and execute it
    pub async fn start_run(
        &self,
        workflow_id: &str,
        graph: &FlowGraph,
        trigger: Trigger,
        cancel: &CancelFlag,
    ) -> Result<RunResult, FlowError> {
        let plan = compile(graph, &self.catalog)?;
        self.run(workflow_id, plan, trigger, cancel).await
    }

    /// Execute a prebuilt plan
    pub async fn run(
        &self,
        workflow_id: &str,
        plan: Plan,
        trigger: Trigger,
        cancel: &CancelFlag,
    ) -> Result<RunResult, FlowError> {
        let mut run = Run::new(workflow_id, plan, trigger);
        self.store.create_run(&run).await?;

        run.status = RunStatus::Running;
        run.started_at = Utc::now();
        self.store.update_run(&run).await?;
        log::info!(
            "run {} started: workflow '{}', {} phases, {} nodes",
            run.id,
            run.workflow_id,
            run.plan.phases.len(),
            run.plan.node_count()
        );

        let slot = Arc::new(SessionSlot::new(self.driver.clone()));
        let outcome = self.execute_phases(&mut run, &slot, cancel).await;

        // The one mandatory cleanup action, on every exit path.
        if let Err(e) = slot.release().await {
            log::warn!("run {}: failed to close session: {}", run.id, e);
        }

        run.completed_at = Some(Utc::now());
        match outcome {
            Ok(true) => run.status = RunStatus::Completed,
            Ok(false) => run.status = RunStatus::Failed,
            Err(err) => {
                run.status = RunStatus::Failed;
                if let Err(persist) = self.store.update_run(&run).await {
                    log::error!("run {}: could not persist failure: {}", run.id, persist);
                }
                return Err(err);
            }
        }
        self.store.update_run(&run).await?;
        log::info!(
            "run {} finished: {:?}, {} credits",
            run.id,
            run.status,
            run.credits_consumed
        );

        Ok(RunResult {
            run_id: run.id,
            status: run.status,
            credits_consumed: run.credits_consumed,
        })
    }

    /// Ok(true) = all nodes succeeded, Ok(false) = a step failed or the
    /// run was cancelled, Err = infrastructure error
    async fn execute_phases(
        &self,
        run: &mut Run,
        slot: &Arc<SessionSlot>,
        cancel: &CancelFlag,
    ) -> Result<bool, FlowError> {
        let plan = run.plan.clone();

        let mut edges_in: HashMap<&str, Vec<&Edge>> = HashMap::new();
        for edge in &plan.edges {
            edges_in.entry(edge.target.as_str()).or_default().push(edge);
        }

        // Resolved-output table: (node id, port) -> value, filled only by
        // completed steps.
        let mut table: HashMap<(String, String), serde_json::Value> = HashMap::new();

        for phase in &plan.phases {
            for node in &phase.nodes {
                if cancel.is_cancelled() {
                    log::warn!("run {} cancelled before node '{}'", run.id, node.id);
                    return Ok(false);
                }

                let descriptor = self.catalog.lookup(node.step).ok_or_else(|| {
                    FlowError::other(format!(
                        "plan references step kind '{}' missing from the catalog",
                        node.step
                    ))
                })?;
                let handler = self
                    .registry
                    .get(node.step)
                    .ok_or(FlowError::MissingHandler(node.step))?;

                let resolved = resolve_edge_inputs(node, &edges_in, &table);
                let mut exec =
                    PhaseExecution::new(run.id, phase.index, node.clone(), resolved.clone());
                self.store.create_phase_execution(&exec).await?;

                exec.status = StepStatus::Running;
                exec.started_at = Some(Utc::now());
                self.store.update_phase_execution(&exec).await?;
                log::info!("run {}: executing '{}' ({})", run.id, node.id, node.step);

                let mut env = Environment::new(node.clone(), descriptor, resolved, slot.clone());
                let succeeded = handler.execute(&mut env).await;
                let (outputs, log_lines) = env.into_parts();
                exec.log = log_lines;
                exec.completed_at = Some(Utc::now());

                if succeeded {
                    for (port, value) in &outputs {
                        table.insert((node.id.clone(), port.clone()), value.clone());
                    }
                    exec.outputs = outputs;
                    exec.credits_consumed = descriptor.credits;
                    exec.status = StepStatus::Completed;
                    run.credits_consumed += descriptor.credits;
                    self.store.update_phase_execution(&exec).await?;
                } else {
                    exec.status = StepStatus::Failed;
                    self.store.update_phase_execution(&exec).await?;
                    log::warn!("run {}: node '{}' failed, aborting run", run.id, node.id);
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

/// Values produced by upstream nodes for this node's connected ports
fn resolve_edge_inputs(
    node: &Node,
    edges_in: &HashMap<&str, Vec<&Edge>>,
    table: &HashMap<(String, String), serde_json::Value>,
) -> HashMap<String, serde_json::Value> {
    let mut resolved = HashMap::new();
    if let Some(edges) = edges_in.get(node.id.as_str()) {
        for edge in edges {
            let key = (edge.source.clone(), edge.source_output.clone());
            if let Some(value) = table.get(&key) {
                resolved.insert(edge.target_input.clone(), value.clone());
            }
        }
    }
    resolved
}
