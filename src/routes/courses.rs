use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::progress::types::{Course, Module, PrerequisiteEdge};
use crate::progress::CertifiedGraph;
use crate::response::{ok, AppError};
use crate::services::catalog;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CourseFilter {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseGraphView {
    pub course_id: String,
    pub module_count: usize,
    pub edge_count: usize,
    #[serde(flatten)]
    pub graph: CertifiedGraph,
}

pub async fn list_courses(
    State(state): State<AppState>,
    Query(filter): Query<CourseFilter>,
) -> Result<impl IntoResponse, AppError> {
    let courses: Vec<Course> = catalog::list_courses(state.db(), filter.category.as_deref()).await?;
    Ok(ok(courses))
}

pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(catalog::get_course(state.db(), &course_id).await?))
}

pub async fn list_modules(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let modules: Vec<Module> = catalog::list_modules(state.db(), &course_id).await?;
    Ok(ok(modules))
}

pub async fn get_module(
    State(state): State<AppState>,
    Path(module_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(catalog::get_module(state.db(), &module_id).await?))
}

pub async fn list_prerequisites(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let edges: Vec<PrerequisiteEdge> = catalog::list_prerequisites(state.db()).await?;
    Ok(ok(edges))
}

/// Diagnostics only: the certified adjacency and a topological order.
pub async fn course_graph(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let graph = state.progress().course_graph(&course_id).await?;
    Ok(ok(CourseGraphView {
        module_count: graph.module_count(),
        edge_count: graph.edge_count(),
        course_id,
        graph,
    }))
}
