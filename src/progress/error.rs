use thiserror::Error;

use crate::progress::graph::GraphError;

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("course {0} not found")]
    UnknownCourse(String),
    #[error("module {0} not found")]
    UnknownModule(String),
    #[error("user {0} not found")]
    UnknownUser(String),
    #[error("prerequisites of module {module_id} are not completed: {}", .missing.join(", "))]
    PrerequisitesUnmet {
        module_id: String,
        missing: Vec<String>,
    },
    #[error("prerequisite graph of course {course_id} is invalid: {source}")]
    GraphInvalid {
        course_id: String,
        #[source]
        source: GraphError,
    },
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("storage unavailable: {0}")]
    Storage(#[from] sqlx::Error),
}

impl ProgressError {
    /// Only infrastructure failures are worth retrying; everything else is a verdict.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}
