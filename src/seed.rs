use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::operations::catalog as catalog_ops;
use crate::db::Database;
use crate::progress::graph::PrerequisiteGraph;
use crate::progress::types::{Course, Module, PrerequisiteEdge};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    pub courses: Vec<CatalogCourse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCourse {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub duration_hours: f64,
    /// Listed in curriculum order.
    #[serde(default)]
    pub modules: Vec<CatalogModule>,
    #[serde(default)]
    pub prerequisites: Vec<PrerequisiteEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogModule {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration_minutes: i64,
    #[serde(default)]
    pub exercises: i64,
    #[serde(default)]
    pub videos: i64,
}

fn default_level() -> String {
    "beginner".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub courses: usize,
    pub modules: usize,
    pub prerequisites: usize,
    /// Courses whose prerequisite graph failed validation. They are stored anyway and
    /// refuse eligibility decisions until fixed.
    pub invalid_courses: Vec<String>,
}

#[derive(Debug, Error)]
pub enum CatalogImportError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("duplicate {kind} id {id} in catalog")]
    Duplicate { kind: &'static str, id: String },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub async fn import_catalog_file(
    db: &Database,
    path: &Path,
) -> Result<ImportSummary, CatalogImportError> {
    let shown = path.display().to_string();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CatalogImportError::Read {
            path: shown.clone(),
            source,
        })?;
    let document: CatalogDocument =
        serde_json::from_str(&raw).map_err(|source| CatalogImportError::Parse {
            path: shown.clone(),
            source,
        })?;

    let summary = import_catalog(db, &document).await?;
    tracing::info!(
        path = %shown,
        courses = summary.courses,
        modules = summary.modules,
        prerequisites = summary.prerequisites,
        "catalog imported"
    );
    Ok(summary)
}

/// Imports the document in one transaction. Each listed course is replaced: modules
/// missing from the new list are removed and its prerequisite edges are rewritten.
/// Courses absent from the document are left untouched.
pub async fn import_catalog(
    db: &Database,
    document: &CatalogDocument,
) -> Result<ImportSummary, CatalogImportError> {
    check_unique_ids(document)?;

    let mut summary = ImportSummary::default();
    let mut tx = db.begin_write().await?;

    for entry in &document.courses {
        let course = Course {
            id: entry.id.clone(),
            title: entry.title.clone(),
            description: entry.description.clone(),
            category: entry.category.clone(),
            level: entry.level.clone(),
            duration_hours: entry.duration_hours,
            module_ids: entry.modules.iter().map(|m| m.id.clone()).collect(),
        };
        catalog_ops::upsert_course(&mut tx, &course).await?;
        summary.courses += 1;

        let listed: HashSet<&str> = entry.modules.iter().map(|m| m.id.as_str()).collect();
        let stored = catalog_ops::fetch_module_ids_by_course(&mut tx, &entry.id).await?;
        for module_id in stored.iter().chain(course.module_ids.iter()) {
            catalog_ops::delete_prerequisites_of(&mut tx, module_id).await?;
        }
        for module_id in stored.iter().filter(|id| !listed.contains(id.as_str())) {
            tracing::info!(course_id = %entry.id, %module_id, "removing module dropped from catalog");
            catalog_ops::delete_module(&mut tx, module_id).await?;
        }

        for (index, module) in entry.modules.iter().enumerate() {
            let module = Module {
                id: module.id.clone(),
                course_id: entry.id.clone(),
                position: index as i64 + 1,
                title: module.title.clone(),
                description: module.description.clone(),
                duration_minutes: module.duration_minutes,
                exercises: module.exercises,
                videos: module.videos,
            };
            catalog_ops::upsert_module(&mut tx, &module).await?;
            summary.modules += 1;
        }

        for edge in &entry.prerequisites {
            if catalog_ops::insert_prerequisite(&mut tx, edge).await? {
                summary.prerequisites += 1;
            }
        }
    }

    // Validate what is stored, not what was listed: an edge listed under one course may
    // belong to a module of another.
    for entry in &document.courses {
        let module_ids = catalog_ops::fetch_module_ids_by_course(&mut tx, &entry.id).await?;
        let edges = catalog_ops::fetch_prerequisite_edges(&mut tx, &entry.id).await?;
        if let Err(err) = PrerequisiteGraph::build(module_ids, &edges).validate() {
            tracing::warn!(course_id = %entry.id, error = %err, "imported course has an invalid prerequisite graph");
            summary.invalid_courses.push(entry.id.clone());
        }
    }

    tx.commit().await?;
    Ok(summary)
}

fn check_unique_ids(document: &CatalogDocument) -> Result<(), CatalogImportError> {
    let mut courses = HashSet::new();
    let mut modules = HashSet::new();

    for course in &document.courses {
        if !courses.insert(course.id.as_str()) {
            return Err(CatalogImportError::Duplicate {
                kind: "course",
                id: course.id.clone(),
            });
        }
        for module in &course.modules {
            if !modules.insert(module.id.as_str()) {
                return Err(CatalogImportError::Duplicate {
                    kind: "module",
                    id: module.id.clone(),
                });
            }
        }
    }
    Ok(())
}
