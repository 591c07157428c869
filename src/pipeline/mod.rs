// src/pipeline/mod.rs

//! Pipeline compositions and their lowering into a task graph.
//!
//! A [`Pipeline`] is a tree of tasks combined with `series` and `parallel`.
//! Lowering walks the tree once and records, for every task, the tasks that
//! must complete before it starts:
//!
//! - `series(a, b)`: every entry task of `b` runs after every exit task of `a`.
//! - `parallel(a, b)`: `a` and `b` share the same predecessors; the exit set is
//!   the union of both exit sets.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{PagesError, Result};
use crate::types::TaskKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pipeline {
    Task(TaskKind),
    Series(Vec<Pipeline>),
    Parallel(Vec<Pipeline>),
}

pub fn task(kind: TaskKind) -> Pipeline {
    Pipeline::Task(kind)
}

pub fn series(children: impl IntoIterator<Item = Pipeline>) -> Pipeline {
    Pipeline::Series(children.into_iter().collect())
}

pub fn parallel(children: impl IntoIterator<Item = Pipeline>) -> Pipeline {
    Pipeline::Parallel(children.into_iter().collect())
}

impl Pipeline {
    /// `clean`
    pub fn clean() -> Self {
        task(TaskKind::Clean)
    }

    /// `parallel(style, script, page)`
    pub fn compile() -> Self {
        parallel([
            task(TaskKind::Style),
            task(TaskKind::Script),
            task(TaskKind::Page),
        ])
    }

    /// `series(clean, parallel(series(compile, useref), image, font, extra))`
    pub fn build() -> Self {
        series([
            Self::clean(),
            parallel([
                series([Self::compile(), task(TaskKind::Useref)]),
                task(TaskKind::Image),
                task(TaskKind::Font),
                task(TaskKind::Extra),
            ]),
        ])
    }

    /// `series(compile, server)`
    pub fn develop() -> Self {
        series([Self::compile(), task(TaskKind::Server)])
    }

    /// Leaf tasks in declaration order.
    pub fn tasks(&self) -> Vec<TaskKind> {
        let mut out = Vec::new();
        self.collect_tasks(&mut out);
        out
    }

    fn collect_tasks(&self, out: &mut Vec<TaskKind>) {
        match self {
            Pipeline::Task(k) => out.push(*k),
            Pipeline::Series(children) | Pipeline::Parallel(children) => {
                for c in children {
                    c.collect_tasks(out);
                }
            }
        }
    }

    /// Lower the tree into a validated [`PipelineGraph`].
    pub fn lower(&self) -> Result<PipelineGraph> {
        let mut edges: BTreeMap<TaskKind, BTreeSet<TaskKind>> = BTreeMap::new();
        self.lower_into(&[], &mut edges)?;
        let graph = PipelineGraph {
            nodes: edges
                .into_iter()
                .map(|(kind, after)| {
                    (
                        kind,
                        NodeSpec {
                            kind,
                            after: after.into_iter().collect(),
                        },
                    )
                })
                .collect(),
        };
        graph.validate()?;
        Ok(graph)
    }

    /// Insert this subtree with `after` as its predecessors and return its exit
    /// tasks.
    fn lower_into(
        &self,
        after: &[TaskKind],
        edges: &mut BTreeMap<TaskKind, BTreeSet<TaskKind>>,
    ) -> Result<Vec<TaskKind>> {
        match self {
            Pipeline::Task(kind) => {
                if edges.contains_key(kind) {
                    return Err(PagesError::Pipeline(format!(
                        "task '{kind}' appears more than once"
                    )));
                }
                edges.insert(*kind, after.iter().copied().collect());
                Ok(vec![*kind])
            }
            Pipeline::Series(children) => {
                let mut current = after.to_vec();
                for child in children {
                    current = child.lower_into(&current, edges)?;
                }
                Ok(current)
            }
            Pipeline::Parallel(children) => {
                if children.is_empty() {
                    return Ok(after.to_vec());
                }
                let mut exits = Vec::new();
                for child in children {
                    for k in child.lower_into(after, edges)? {
                        if !exits.contains(&k) {
                            exits.push(k);
                        }
                    }
                }
                Ok(exits)
            }
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, children) = match self {
            Pipeline::Task(k) => return write!(f, "{k}"),
            Pipeline::Series(c) => ("series", c),
            Pipeline::Parallel(c) => ("parallel", c),
        };
        write!(f, "{name}(")?;
        for (i, c) in children.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{c}")?;
        }
        f.write_str(")")
    }
}

/// One lowered task and its direct predecessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    pub kind: TaskKind,
    pub after: Vec<TaskKind>,
}

/// Task -> direct `after` dependencies. Immutable once lowered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineGraph {
    nodes: BTreeMap<TaskKind, NodeSpec>,
}

impl PipelineGraph {
    pub fn nodes(&self) -> impl Iterator<Item = &NodeSpec> {
        self.nodes.values()
    }

    pub fn get(&self, kind: TaskKind) -> Option<&NodeSpec> {
        self.nodes.get(&kind)
    }

    pub fn contains(&self, kind: TaskKind) -> bool {
        self.nodes.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Tasks with no predecessors; triggering these starts a full run.
    pub fn roots(&self) -> Vec<TaskKind> {
        self.nodes
            .values()
            .filter(|n| n.after.is_empty())
            .map(|n| n.kind)
            .collect()
    }

    /// Whether `later` transitively depends on `earlier`.
    pub fn depends_on(&self, later: TaskKind, earlier: TaskKind) -> bool {
        let mut stack = vec![later];
        let mut seen = BTreeSet::new();
        while let Some(k) = stack.pop() {
            if !seen.insert(k) {
                continue;
            }
            if let Some(node) = self.nodes.get(&k) {
                for dep in &node.after {
                    if *dep == earlier {
                        return true;
                    }
                    stack.push(*dep);
                }
            }
        }
        false
    }

    /// A dependency-respecting order, used for `--dry-run` output.
    pub fn topo_order(&self) -> Result<Vec<TaskKind>> {
        toposort(&self.as_graphmap(), None).map_err(|cycle| {
            PagesError::Cycle(format!(
                "cycle detected in task graph involving task '{}'",
                cycle.node_id()
            ))
        })
    }

    fn validate(&self) -> Result<()> {
        for node in self.nodes.values() {
            for dep in &node.after {
                if !self.nodes.contains_key(dep) {
                    return Err(PagesError::Pipeline(format!(
                        "task '{}' depends on unknown task '{dep}'",
                        node.kind
                    )));
                }
                if *dep == node.kind {
                    return Err(PagesError::Pipeline(format!(
                        "task '{dep}' cannot depend on itself"
                    )));
                }
            }
        }
        self.topo_order().map(|_| ())
    }

    // Edge direction: dep -> task.
    fn as_graphmap(&self) -> DiGraphMap<TaskKind, ()> {
        let mut graph = DiGraphMap::new();
        for kind in self.nodes.keys() {
            graph.add_node(*kind);
        }
        for node in self.nodes.values() {
            for dep in &node.after {
                graph.add_edge(*dep, node.kind, ());
            }
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TaskKind::*;

    fn after(g: &PipelineGraph, k: TaskKind) -> Vec<TaskKind> {
        g.get(k).unwrap().after.clone()
    }

    #[test]
    fn compile_has_three_independent_roots() {
        let g = Pipeline::compile().lower().unwrap();
        assert_eq!(g.len(), 3);
        assert_eq!(g.roots(), vec![Style, Script, Page]);
    }

    #[test]
    fn build_orders_clean_first_and_useref_after_compile() {
        let g = Pipeline::build().lower().unwrap();
        assert_eq!(g.roots(), vec![Clean]);
        for k in [Style, Script, Page, Image, Font, Extra] {
            assert_eq!(after(&g, k), vec![Clean], "{k}");
        }
        assert_eq!(after(&g, Useref), vec![Style, Script, Page]);
        assert!(g.depends_on(Useref, Clean));
        assert!(!g.depends_on(Image, Style));
    }

    #[test]
    fn develop_starts_server_after_compile() {
        let g = Pipeline::develop().lower().unwrap();
        assert_eq!(after(&g, Server), vec![Style, Script, Page]);
    }

    #[test]
    fn duplicate_task_is_rejected() {
        let p = series([task(Style), parallel([task(Style), task(Page)])]);
        assert!(matches!(p.lower(), Err(PagesError::Pipeline(_))));
    }

    #[test]
    fn empty_groups_pass_predecessors_through() {
        let p = series([task(Clean), parallel([]), series([]), task(Extra)]);
        let g = p.lower().unwrap();
        assert_eq!(after(&g, Extra), vec![Clean]);
    }

    #[test]
    fn display_shows_the_tree() {
        assert_eq!(
            Pipeline::develop().to_string(),
            "series(parallel(style, script, page), server)"
        );
    }

    #[test]
    fn topo_order_puts_clean_before_everything() {
        let order = Pipeline::build().lower().unwrap().topo_order().unwrap();
        assert_eq!(order.first(), Some(&Clean));
        let pos = |k| order.iter().position(|x| *x == k).unwrap();
        assert!(pos(Useref) > pos(Style));
        assert!(pos(Useref) > pos(Script));
        assert!(pos(Useref) > pos(Page));
    }
}
