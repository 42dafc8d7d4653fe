use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::progress::types::{CreateUserInput, UpdateProgressInput};
use crate::response::{ok, AppError};
use crate::services::catalog;
use crate::state::AppState;

pub async fn create_user(
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> Result<impl IntoResponse, AppError> {
    let user = catalog::create_user(state.db(), &input).await?;
    Ok((StatusCode::CREATED, ok(user)))
}

#[derive(Debug, Deserialize)]
pub struct EmailLookup {
    pub email: String,
}

pub async fn find_user(
    State(state): State<AppState>,
    Query(lookup): Query<EmailLookup>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(catalog::find_user_by_email(state.db(), &lookup.email).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(catalog::get_user(state.db(), &user_id).await?))
}

pub async fn get_user_progress(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(state.progress().get_user_progress(&user_id).await?))
}

pub async fn update_user_progress(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(input): Json<UpdateProgressInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(state
        .progress()
        .update_user_progress(&user_id, &input)
        .await?))
}

pub async fn list_completions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    catalog::get_user(state.db(), &user_id).await?;
    Ok(ok(state.progress().ledger().completions(&user_id).await?))
}

pub async fn course_progress(
    State(state): State<AppState>,
    Path((user_id, course_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(state
        .progress()
        .compute_progress(&user_id, &course_id)
        .await?))
}

pub async fn module_eligibility(
    State(state): State<AppState>,
    Path((user_id, module_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(state.progress().can_complete(&user_id, &module_id).await?))
}

pub async fn complete_module(
    State(state): State<AppState>,
    Path((user_id, module_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let result = state.progress().complete_module(&user_id, &module_id).await?;
    let status = if result.newly_completed {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, ok(result)))
}
