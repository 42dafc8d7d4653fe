mod courses;
mod health;
pub mod operations;
mod users;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::response::json_error;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .route("/api/courses", get(courses::list_courses))
        .route("/api/courses/:course_id", get(courses::get_course))
        .route("/api/courses/:course_id/modules", get(courses::list_modules))
        .route("/api/courses/:course_id/graph", get(courses::course_graph))
        .route("/api/modules/:module_id", get(courses::get_module))
        .route("/api/prerequisites", get(courses::list_prerequisites))
        .route("/api/users", get(users::find_user).post(users::create_user))
        .route("/api/users/:user_id", get(users::get_user))
        .route(
            "/api/users/:user_id/progress",
            get(users::get_user_progress).post(users::update_user_progress),
        )
        .route(
            "/api/users/:user_id/completions",
            get(users::list_completions),
        )
        .route(
            "/api/users/:user_id/courses/:course_id/progress",
            get(users::course_progress),
        )
        .route(
            "/api/users/:user_id/modules/:module_id/eligibility",
            get(users::module_eligibility),
        )
        .route(
            "/api/users/:user_id/modules/:module_id/complete",
            post(users::complete_module),
        )
        .route("/api/operations", post(operations::dispatch))
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "route not found").into_response()
}
