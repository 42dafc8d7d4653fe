use crate::db::operations::{catalog as catalog_ops, user as user_ops};
use crate::db::Database;
use crate::progress::eligibility::{self, Eligibility};
use crate::progress::graph::{CertifiedGraph, PrerequisiteGraph};
use crate::progress::ledger::ProgressLedger;
use crate::progress::types::{CompletionResult, Course, CourseProgress, UpdateProgressInput};
use crate::progress::ProgressError;
use crate::services::catalog;

/// Per-request orchestration over the catalog store, graph validator, eligibility
/// engine and progress ledger. Holds no state besides the storage handle; graphs are
/// rebuilt and certified on every call.
#[derive(Clone)]
pub struct ProgressService {
    db: Database,
    ledger: ProgressLedger,
}

impl ProgressService {
    pub fn new(db: Database) -> Self {
        let ledger = ProgressLedger::new(db.clone());
        Self { db, ledger }
    }

    pub fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }

    /// Builds and validates the prerequisite graph of a course. Any validation failure
    /// blocks eligibility decisions for that course.
    pub async fn certified_graph(&self, course_id: &str) -> Result<CertifiedGraph, ProgressError> {
        let (module_ids, edges) = {
            let mut conn = self.db.pool().acquire().await?;
            let module_ids = catalog_ops::fetch_module_ids_by_course(&mut conn, course_id).await?;
            let edges = catalog_ops::fetch_prerequisite_edges(&mut conn, course_id).await?;
            (module_ids, edges)
        };

        PrerequisiteGraph::build(module_ids, &edges)
            .validate()
            .map_err(|source| {
                tracing::error!(course_id, error = %source, "prerequisite graph rejected");
                ProgressError::GraphInvalid {
                    course_id: course_id.to_string(),
                    source,
                }
            })
    }

    pub async fn course_graph(&self, course_id: &str) -> Result<CertifiedGraph, ProgressError> {
        catalog::get_course(&self.db, course_id).await?;
        self.certified_graph(course_id).await
    }

    pub async fn can_complete(
        &self,
        user_id: &str,
        module_id: &str,
    ) -> Result<Eligibility, ProgressError> {
        self.require_user(user_id).await?;
        let module = catalog::get_module(&self.db, module_id).await?;
        let graph = self.certified_graph(&module.course_id).await?;
        let completed = self.ledger.completion_set(user_id).await?;
        eligibility::can_complete(&graph, &completed, &module.id)
    }

    pub async fn is_course_complete(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<bool, ProgressError> {
        self.require_user(user_id).await?;
        let course = catalog::get_course(&self.db, course_id).await?;
        self.certified_graph(&course.id).await?;
        let completed = self.ledger.course_completion_set(user_id, &course.id).await?;
        Ok(eligibility::is_course_complete(&course.module_ids, &completed))
    }

    /// Read-only progress for one course, derived from the current completion set.
    pub async fn compute_progress(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<CourseProgress, ProgressError> {
        self.require_user(user_id).await?;
        let course = catalog::get_course(&self.db, course_id).await?;
        self.certified_graph(&course.id).await?;
        self.ledger.preview_progress(user_id, &course.id).await
    }

    pub async fn complete_module(
        &self,
        user_id: &str,
        module_id: &str,
    ) -> Result<CompletionResult, ProgressError> {
        self.require_user(user_id).await?;
        let module = catalog::get_module(&self.db, module_id).await?;
        let graph = self.certified_graph(&module.course_id).await?;
        let outcome = self.ledger.record_completion(user_id, &module, &graph).await?;

        Ok(CompletionResult {
            module,
            progress: outcome.progress,
            newly_completed: outcome.newly_completed,
        })
    }

    /// Refreshes the persisted projection of one course. Never records completions.
    pub async fn update_user_progress(
        &self,
        user_id: &str,
        input: &UpdateProgressInput,
    ) -> Result<CourseProgress, ProgressError> {
        self.require_user(user_id).await?;
        let course = self.resolve_course(input).await?;
        self.certified_graph(&course.id).await?;
        self.ledger.refresh_progress(user_id, &course.id).await
    }

    pub async fn get_user_progress(
        &self,
        user_id: &str,
    ) -> Result<Vec<CourseProgress>, ProgressError> {
        self.require_user(user_id).await?;
        self.ledger.progress_for_user(user_id).await
    }

    async fn resolve_course(&self, input: &UpdateProgressInput) -> Result<Course, ProgressError> {
        let course_id = non_blank(input.course_id.as_deref());
        let module_id = non_blank(input.module_id.as_deref());

        match (course_id, module_id) {
            (Some(course_id), None) => catalog::get_course(&self.db, course_id).await,
            (None, Some(module_id)) => {
                let module = catalog::get_module(&self.db, module_id).await?;
                catalog::get_course(&self.db, &module.course_id).await
            }
            (Some(course_id), Some(module_id)) => {
                let module = catalog::get_module(&self.db, module_id).await?;
                if module.course_id != course_id {
                    return Err(ProgressError::Validation(format!(
                        "module {module_id} does not belong to course {course_id}"
                    )));
                }
                catalog::get_course(&self.db, course_id).await
            }
            (None, None) => Err(ProgressError::Validation(
                "either courseId or moduleId is required".to_string(),
            )),
        }
    }

    async fn require_user(&self, user_id: &str) -> Result<(), ProgressError> {
        if user_ops::user_exists(&self.db, user_id).await? {
            Ok(())
        } else {
            Err(ProgressError::UnknownUser(user_id.to_string()))
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
