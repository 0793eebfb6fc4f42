//! # Workflow DAG
//!
//! Steps and dependency edges of a workflow. Edges point from a predecessor
//! to the step that depends on it, and the collection must stay acyclic:
//! [`WorkflowDag::add_edge`] refuses any edge whose target can already reach
//! its source.
//!
//! [`WorkflowDag::medal_workflow`] builds the medal workflow itself:
//!
//! ```text
//! create_schema -> create_table -> pick_medal -> pick_medal_task
//! pick_medal_task -> calc_Bronze | calc_Silver | calc_Gold
//! calc_* -> generate_delay (any) -> check_correctness
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

use super::join::JoinCondition;
use crate::constants::steps;
use crate::error::{WorkflowError, WorkflowResult};
use crate::models::Category;

/// What a step does when it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "category", rename_all = "snake_case")]
pub enum StepKind {
    CreateSchema,
    CreateTable,
    /// Emits a category for downstream consumption
    Select,
    /// Branching step: only the selected downstream step runs
    Route,
    Aggregate(Category),
    /// Fixed pause before the freshness check
    Join,
    CheckFreshness,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepNode {
    pub id: String,
    pub kind: StepKind,
    pub join_condition: JoinCondition,
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowDag {
    name: String,
    nodes: Vec<StepNode>,
    index: HashMap<String, usize>,
    upstream: HashMap<String, Vec<String>>,
    downstream: HashMap<String, Vec<String>>,
}

impl WorkflowDag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The medal workflow graph
    pub fn medal_workflow(name: impl Into<String>) -> WorkflowResult<Self> {
        let mut dag = Self::new(name);

        dag.add_step(steps::CREATE_SCHEMA, StepKind::CreateSchema)?;
        dag.add_step(steps::CREATE_TABLE, StepKind::CreateTable)?;
        dag.add_step(steps::PICK_MEDAL, StepKind::Select)?;
        dag.add_step(steps::PICK_MEDAL_TASK, StepKind::Route)?;
        for category in Category::ALL {
            dag.add_step(category.branch_id().as_str(), StepKind::Aggregate(category))?;
        }
        dag.add_step_with_condition(steps::GENERATE_DELAY, StepKind::Join, JoinCondition::Any)?;
        dag.add_step(steps::CHECK_CORRECTNESS, StepKind::CheckFreshness)?;

        dag.chain(&[
            steps::CREATE_SCHEMA,
            steps::CREATE_TABLE,
            steps::PICK_MEDAL,
            steps::PICK_MEDAL_TASK,
        ])?;
        for category in Category::ALL {
            let branch = category.branch_id();
            dag.add_edge(steps::PICK_MEDAL_TASK, branch.as_str())?;
            dag.add_edge(branch.as_str(), steps::GENERATE_DELAY)?;
        }
        dag.add_edge(steps::GENERATE_DELAY, steps::CHECK_CORRECTNESS)?;

        Ok(dag)
    }

    /// Add a step that runs only when all predecessors succeeded
    pub fn add_step(&mut self, id: impl Into<String>, kind: StepKind) -> WorkflowResult<()> {
        self.add_step_with_condition(id, kind, JoinCondition::All)
    }

    pub fn add_step_with_condition(
        &mut self,
        id: impl Into<String>,
        kind: StepKind,
        join_condition: JoinCondition,
    ) -> WorkflowResult<()> {
        let id = id.into();
        if self.index.contains_key(&id) {
            return Err(WorkflowError::ValidationError(format!(
                "Duplicate step id: {id}"
            )));
        }

        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push(StepNode {
            id,
            kind,
            join_condition,
        });
        Ok(())
    }

    /// Declare that `to` depends on `from`
    pub fn add_edge(&mut self, from: &str, to: &str) -> WorkflowResult<()> {
        for id in [from, to] {
            if !self.index.contains_key(id) {
                return Err(WorkflowError::ValidationError(format!(
                    "Unknown step id: {id}"
                )));
            }
        }
        if from == to {
            return Err(WorkflowError::ValidationError(format!(
                "Step {from} cannot depend on itself"
            )));
        }
        if self.upstream_of(to).iter().any(|id| id == from) {
            return Ok(());
        }
        if self.reaches(to, from) {
            return Err(WorkflowError::ValidationError(format!(
                "Edge {from} -> {to} would create a cycle"
            )));
        }

        self.downstream
            .entry(from.to_string())
            .or_default()
            .push(to.to_string());
        self.upstream
            .entry(to.to_string())
            .or_default()
            .push(from.to_string());
        Ok(())
    }

    /// Link consecutive steps: `a >> b >> c`
    pub fn chain(&mut self, ids: &[&str]) -> WorkflowResult<()> {
        for pair in ids.windows(2) {
            self.add_edge(pair[0], pair[1])?;
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn step(&self, id: &str) -> Option<&StepNode> {
        self.index.get(id).map(|&position| &self.nodes[position])
    }

    /// Steps in declaration order
    pub fn steps(&self) -> &[StepNode] {
        &self.nodes
    }

    pub fn upstream_of(&self, id: &str) -> &[String] {
        self.upstream.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn downstream_of(&self, id: &str) -> &[String] {
        self.downstream.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Kahn's algorithm; ties broken by declaration order so runs are reproducible
    pub fn topological_order(&self) -> WorkflowResult<Vec<&StepNode>> {
        let mut in_degree: HashMap<&str, usize> = self
            .nodes
            .iter()
            .map(|node| (node.id.as_str(), self.upstream_of(&node.id).len()))
            .collect();

        let mut ready: VecDeque<&StepNode> = self
            .nodes
            .iter()
            .filter(|node| in_degree[node.id.as_str()] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(node) = ready.pop_front() {
            order.push(node);

            let mut released: Vec<&StepNode> = Vec::new();
            for child in self.downstream_of(&node.id) {
                if let Some(degree) = in_degree.get_mut(child.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        if let Some(child_node) = self.step(child) {
                            released.push(child_node);
                        }
                    }
                }
            }
            released.sort_by_key(|child| self.index[&child.id]);
            ready.extend(released);
        }

        if order.len() != self.nodes.len() {
            return Err(WorkflowError::ValidationError(format!(
                "Workflow {} contains a cycle",
                self.name
            )));
        }
        Ok(order)
    }

    fn reaches(&self, start: &str, target: &str) -> bool {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut stack = vec![start];

        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if seen.insert(current) {
                stack.extend(self.downstream_of(current).iter().map(String::as_str));
            }
        }
        false
    }
}
