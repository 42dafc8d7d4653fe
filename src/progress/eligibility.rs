use std::collections::HashSet;

use serde::Serialize;

use crate::progress::error::ProgressError;
use crate::progress::graph::CertifiedGraph;

pub const EMPTY_COURSE_WARNING: &str = "course has no modules; progress is reported as 0%";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    pub module_id: String,
    pub eligible: bool,
    pub missing_prerequisites: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressCounts {
    pub completed_count: i64,
    pub total_count: i64,
}

impl ProgressCounts {
    pub fn percent_complete(&self) -> f64 {
        if self.total_count <= 0 {
            return 0.0;
        }
        self.completed_count as f64 * 100.0 / self.total_count as f64
    }

    /// An empty course is never complete.
    pub fn is_complete(&self) -> bool {
        self.total_count > 0 && self.completed_count == self.total_count
    }

    pub fn is_empty_course(&self) -> bool {
        self.total_count == 0
    }
}

/// Direct prerequisites of `module_id` absent from `completed`, in id order.
///
/// Checking direct predecessors is enough: the graph is acyclic and completions are
/// only recorded once this list is empty, so every transitive prerequisite is already
/// satisfied by induction.
pub fn missing_prerequisites(
    graph: &CertifiedGraph,
    completed: &HashSet<String>,
    module_id: &str,
) -> Vec<String> {
    graph
        .direct_prerequisites(module_id)
        .filter(|required| !completed.contains(*required))
        .map(str::to_string)
        .collect()
}

pub fn can_complete(
    graph: &CertifiedGraph,
    completed: &HashSet<String>,
    module_id: &str,
) -> Result<Eligibility, ProgressError> {
    if !graph.contains(module_id) {
        return Err(ProgressError::UnknownModule(module_id.to_string()));
    }

    let missing = missing_prerequisites(graph, completed, module_id);
    Ok(Eligibility {
        module_id: module_id.to_string(),
        eligible: missing.is_empty(),
        missing_prerequisites: missing,
    })
}

pub fn compute_progress(course_module_ids: &[String], completed: &HashSet<String>) -> ProgressCounts {
    let total: HashSet<&str> = course_module_ids.iter().map(String::as_str).collect();
    let completed_count = total.iter().filter(|id| completed.contains(**id)).count();

    ProgressCounts {
        completed_count: completed_count as i64,
        total_count: total.len() as i64,
    }
}

pub fn is_course_complete(course_module_ids: &[String], completed: &HashSet<String>) -> bool {
    compute_progress(course_module_ids, completed).is_complete()
}
