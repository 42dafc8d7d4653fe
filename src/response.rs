use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::progress::{GraphError, ProgressError};

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<SuccessResponse<T>> {
    Json(SuccessResponse {
        success: true,
        data,
    })
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    is_operational: bool,
    retryable: bool,
    details: Option<Value>,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::CONFLICT, "CONFLICT", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            retryable: true,
            ..Self::operational(StatusCode::SERVICE_UNAVAILABLE, "STORAGE_UNAVAILABLE", message)
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            is_operational: false,
            retryable: false,
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    fn operational(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            is_operational: true,
            retryable: false,
            details: None,
        }
    }
}

impl From<ProgressError> for AppError {
    fn from(err: ProgressError) -> Self {
        let message = err.to_string();
        match err {
            ProgressError::UnknownCourse(_)
            | ProgressError::UnknownModule(_)
            | ProgressError::UnknownUser(_) => Self::not_found(message),
            ProgressError::PrerequisitesUnmet { module_id, missing } => {
                Self::operational(StatusCode::CONFLICT, "PREREQUISITES_UNMET", message)
                    .with_details(json!({
                        "moduleId": module_id,
                        "missingPrerequisites": missing,
                    }))
            }
            ProgressError::GraphInvalid { course_id, source } => {
                let mut details = json!({ "courseId": course_id });
                match source {
                    GraphError::CycleDetected { module_ids } => {
                        details["cycle"] = json!(module_ids);
                    }
                    GraphError::DanglingReference { module_id } => {
                        details["danglingModuleId"] = json!(module_id);
                    }
                }
                Self::operational(StatusCode::INTERNAL_SERVER_ERROR, "GRAPH_INVALID", message)
                    .with_details(details)
            }
            ProgressError::Validation(_) => Self::validation(message),
            ProgressError::Conflict(_) => Self::conflict(message),
            ProgressError::Storage(source) => {
                tracing::error!(error = %source, "storage failure");
                Self::unavailable("storage temporarily unavailable, retry the request")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_operational {
            self.message
        } else {
            tracing::error!(code = %self.code, error = %self.message, "internal error");
            "internal server error".to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code,
            retryable: self.retryable,
            details: self.details,
        };

        (self.status, Json(body)).into_response()
    }
}

pub fn json_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> AppError {
    AppError::operational(status, code, message)
}
