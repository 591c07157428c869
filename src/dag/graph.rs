// src/dag/graph.rs

use std::collections::HashMap;

use crate::engine::TaskName;
use crate::pipeline::PipelineGraph;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    deps: Vec<TaskName>,
    dependents: Vec<TaskName>,
}

/// In-memory DAG keyed by task name.
///
/// Acyclicity is already checked when the pipeline is lowered, so this only
/// keeps adjacency for scheduling.
#[derive(Debug, Clone)]
pub struct DagGraph {
    nodes: HashMap<TaskName, DagNode>,
}

impl DagGraph {
    pub fn from_pipeline(graph: &PipelineGraph) -> Self {
        let mut nodes: HashMap<TaskName, DagNode> = graph
            .nodes()
            .map(|spec| {
                (
                    spec.kind.name().to_string(),
                    DagNode {
                        deps: spec.after.iter().map(|k| k.name().to_string()).collect(),
                        dependents: Vec::new(),
                    },
                )
            })
            .collect();

        for spec in graph.nodes() {
            for dep in &spec.after {
                if let Some(dep_node) = nodes.get_mut(dep.name()) {
                    dep_node.dependents.push(spec.kind.name().to_string());
                }
            }
        }

        Self { nodes }
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Tasks without dependencies.
    pub fn roots(&self) -> Vec<TaskName> {
        let mut roots: Vec<TaskName> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.deps.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        roots.sort();
        roots
    }
}
