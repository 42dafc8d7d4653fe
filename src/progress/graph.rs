//! Prerequisite dependency graph for a course.
//!
//! The graph is an adjacency mapping from module id to the set of module ids it
//! requires. Building it never fails; [`PrerequisiteGraph::validate`] certifies
//! referential integrity and acyclicity and is the only way to obtain a
//! [`CertifiedGraph`], which eligibility decisions require.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;

use crate::progress::types::PrerequisiteEdge;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GraphError {
    /// `module_ids[i]` requires `module_ids[i + 1]`, and the last requires the first.
    #[error("prerequisite cycle detected: {}", format_cycle(.module_ids))]
    #[serde(rename_all = "camelCase")]
    CycleDetected { module_ids: Vec<String> },
    #[error("prerequisite edge references unknown module {module_id}")]
    #[serde(rename_all = "camelCase")]
    DanglingReference { module_id: String },
}

fn format_cycle(module_ids: &[String]) -> String {
    let mut rendered = module_ids.join(" -> ");
    if let Some(first) = module_ids.first() {
        rendered.push_str(" -> ");
        rendered.push_str(first);
    }
    rendered
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrerequisiteGraph {
    modules: BTreeSet<String>,
    requires: BTreeMap<String, BTreeSet<String>>,
}

impl PrerequisiteGraph {
    pub fn build<I, S>(module_ids: I, edges: &[PrerequisiteEdge]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let modules: BTreeSet<String> = module_ids.into_iter().map(Into::into).collect();
        let mut requires: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for edge in edges {
            requires
                .entry(edge.module_id.clone())
                .or_default()
                .insert(edge.required_module_id.clone());
        }
        Self { modules, requires }
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn edge_count(&self) -> usize {
        self.requires.values().map(BTreeSet::len).sum()
    }

    pub fn validate(self) -> Result<CertifiedGraph, GraphError> {
        self.check_references()?;
        self.check_acyclic()?;
        let order = self.kahn_order();
        Ok(CertifiedGraph { graph: self, order })
    }

    fn check_references(&self) -> Result<(), GraphError> {
        for (module_id, required) in &self.requires {
            if !self.modules.contains(module_id) {
                return Err(GraphError::DanglingReference {
                    module_id: module_id.clone(),
                });
            }
            if let Some(missing) = required.iter().find(|id| !self.modules.contains(*id)) {
                return Err(GraphError::DanglingReference {
                    module_id: missing.clone(),
                });
            }
        }
        Ok(())
    }

    /// Depth-first search with an explicit stack, so chain length is not bounded by the
    /// thread's stack size. `path` mirrors the modules currently marked `Visiting`.
    fn check_acyclic(&self) -> Result<(), GraphError> {
        let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();

        for root in &self.modules {
            if marks.contains_key(root.as_str()) {
                continue;
            }

            let mut path: Vec<&str> = vec![root.as_str()];
            let mut stack = vec![self.required_of(root)];
            marks.insert(root.as_str(), Mark::Visiting);

            while let Some(pending) = stack.last_mut() {
                match pending.next() {
                    Some(next) => match marks.get(next) {
                        Some(Mark::Done) => {}
                        Some(Mark::Visiting) => {
                            let start = path.iter().position(|id| *id == next).unwrap_or_default();
                            return Err(GraphError::CycleDetected {
                                module_ids: path[start..].iter().map(|id| id.to_string()).collect(),
                            });
                        }
                        None => {
                            marks.insert(next, Mark::Visiting);
                            path.push(next);
                            stack.push(self.required_of(next));
                        }
                    },
                    None => {
                        stack.pop();
                        if let Some(finished) = path.pop() {
                            marks.insert(finished, Mark::Done);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn required_of<'a>(&'a self, module_id: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.requires
            .get(module_id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Required modules first; among modules that are ready at the same time, the
    /// smallest id goes first.
    fn kahn_order(&self) -> Vec<String> {
        let mut pending: BTreeMap<&str, usize> = self
            .modules
            .iter()
            .map(|id| (id.as_str(), self.requires.get(id).map_or(0, BTreeSet::len)))
            .collect();

        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (module_id, required) in &self.requires {
            for req in required {
                dependents
                    .entry(req.as_str())
                    .or_default()
                    .push(module_id.as_str());
            }
        }

        let mut ready: BTreeSet<&str> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(self.modules.len());

        while let Some(next) = ready.pop_first() {
            order.push(next.to_string());
            for dependent in dependents.get(next).into_iter().flatten() {
                if let Some(count) = pending.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        order
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// A prerequisite graph that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertifiedGraph {
    #[serde(flatten)]
    graph: PrerequisiteGraph,
    #[serde(rename = "topologicalOrder")]
    order: Vec<String>,
}

impl CertifiedGraph {
    pub fn contains(&self, module_id: &str) -> bool {
        self.graph.modules.contains(module_id)
    }

    pub fn direct_prerequisites(&self, module_id: &str) -> impl Iterator<Item = &str> {
        self.graph
            .requires
            .get(module_id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn topological_order(&self) -> &[String] {
        &self.order
    }

    pub fn module_count(&self) -> usize {
        self.graph.module_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
