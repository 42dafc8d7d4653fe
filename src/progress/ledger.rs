//! Authoritative write path for module completions.
//!
//! A completion is recorded inside one transaction whose first statement is the
//! conditional insert, so the commit-time eligibility check, the insert and the
//! projection refresh share the store's writer lock. Dropping the future before commit
//! rolls the transaction back.

use std::collections::HashSet;

use chrono::{SecondsFormat, Utc};
use sqlx::SqliteConnection;

use crate::db::operations::{catalog as catalog_ops, progress as progress_ops};
use crate::db::Database;
use crate::progress::eligibility::{self, EMPTY_COURSE_WARNING};
use crate::progress::error::ProgressError;
use crate::progress::graph::CertifiedGraph;
use crate::progress::types::{CourseProgress, Module, ModuleCompletion};

#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub progress: CourseProgress,
    pub newly_completed: bool,
}

#[derive(Clone)]
pub struct ProgressLedger {
    db: Database,
}

impl ProgressLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Records `(user_id, module)` if its prerequisites are met at commit time.
    ///
    /// `graph` must be the certified graph of the module's course. Recording an existing
    /// completion is a successful no-op reported with `newly_completed = false`.
    pub async fn record_completion(
        &self,
        user_id: &str,
        module: &Module,
        graph: &CertifiedGraph,
    ) -> Result<RecordOutcome, ProgressError> {
        if !graph.contains(&module.id) {
            return Err(ProgressError::UnknownModule(module.id.clone()));
        }

        let completion = ModuleCompletion {
            user_id: user_id.to_string(),
            module_id: module.id.clone(),
            course_id: module.course_id.clone(),
            completed_at: now_rfc3339(),
        };

        let mut tx = self.db.pool().begin().await?;
        let inserted = progress_ops::insert_completion_if_eligible(&mut tx, &completion).await?;

        if !inserted {
            if progress_ops::completion_exists(&mut tx, user_id, &module.id).await? {
                let progress = derive_progress(&mut tx, user_id, &module.course_id).await?;
                tx.rollback().await?;
                tracing::debug!(user_id, module_id = %module.id, "completion already recorded");
                return Ok(RecordOutcome {
                    progress,
                    newly_completed: false,
                });
            }

            let completed = progress_ops::completed_module_ids(&mut tx, user_id).await?;
            tx.rollback().await?;
            let missing = eligibility::missing_prerequisites(graph, &completed, &module.id);
            tracing::info!(
                user_id,
                module_id = %module.id,
                missing = ?missing,
                "completion rejected: prerequisites unmet"
            );
            return Err(ProgressError::PrerequisitesUnmet {
                module_id: module.id.clone(),
                missing,
            });
        }

        let progress = derive_progress(&mut tx, user_id, &module.course_id).await?;
        progress_ops::upsert_course_progress(&mut tx, &progress).await?;
        tx.commit().await?;

        tracing::info!(
            user_id,
            module_id = %module.id,
            course_id = %module.course_id,
            completed = progress.completed_count,
            total = progress.total_count,
            "module completion recorded"
        );

        Ok(RecordOutcome {
            progress,
            newly_completed: true,
        })
    }

    /// Re-derives the `(user_id, course_id)` projection from completions and persists it.
    pub async fn refresh_progress(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<CourseProgress, ProgressError> {
        let mut tx = self.db.begin_write().await?;
        let progress = derive_progress(&mut tx, user_id, course_id).await?;
        progress_ops::upsert_course_progress(&mut tx, &progress).await?;
        tx.commit().await?;
        Ok(progress)
    }

    /// Derived progress without persisting anything.
    pub async fn preview_progress(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<CourseProgress, ProgressError> {
        let mut conn = self.db.pool().acquire().await?;
        derive_progress(&mut conn, user_id, course_id).await
    }

    pub async fn completion_set(&self, user_id: &str) -> Result<HashSet<String>, ProgressError> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(progress_ops::completed_module_ids(&mut conn, user_id).await?)
    }

    pub async fn course_completion_set(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<HashSet<String>, ProgressError> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(progress_ops::course_completed_module_ids(&mut conn, user_id, course_id).await?)
    }

    pub async fn completions(&self, user_id: &str) -> Result<Vec<ModuleCompletion>, ProgressError> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(progress_ops::fetch_completions(&mut conn, user_id).await?)
    }

    pub async fn progress_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<CourseProgress>, ProgressError> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(progress_ops::fetch_course_progress(&mut conn, user_id).await?)
    }
}

async fn derive_progress(
    conn: &mut SqliteConnection,
    user_id: &str,
    course_id: &str,
) -> Result<CourseProgress, ProgressError> {
    let module_ids = catalog_ops::fetch_module_ids_by_course(conn, course_id).await?;
    let completed = progress_ops::completed_module_ids(conn, user_id).await?;
    let counts = eligibility::compute_progress(&module_ids, &completed);

    let mut warnings = Vec::new();
    if counts.is_empty_course() {
        tracing::warn!(user_id, course_id, "progress requested for a course without modules");
        warnings.push(EMPTY_COURSE_WARNING.to_string());
    }

    Ok(CourseProgress {
        user_id: user_id.to_string(),
        course_id: course_id.to_string(),
        completed_count: counts.completed_count,
        total_count: counts.total_count,
        percent_complete: counts.percent_complete(),
        is_complete: counts.is_complete(),
        completed_module_ids: module_ids
            .into_iter()
            .filter(|id| completed.contains(id))
            .collect(),
        updated_at: now_rfc3339(),
        warnings,
    })
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
