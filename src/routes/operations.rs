//! Single-endpoint operation dispatch.
//!
//! Requests name an operation from a closed table and carry its input as JSON. Each
//! operation has a typed input contract; anything that does not deserialize into it is
//! rejected before a handler runs.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::progress::types::{CreateUserInput, UpdateProgressInput};
use crate::response::{ok, AppError};
use crate::services::catalog;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OperationRequest {
    pub operation: String,
    #[serde(default)]
    pub input: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationName {
    ListCourses,
    GetCourse,
    ListModules,
    GetModule,
    ListPrerequisites,
    GetUser,
    GetUserProgress,
    CreateUser,
    UpdateUserProgress,
    CompleteModule,
    CanCompleteModule,
    IsCourseComplete,
}

impl OperationName {
    pub const ALL: [OperationName; 12] = [
        Self::ListCourses,
        Self::GetCourse,
        Self::ListModules,
        Self::GetModule,
        Self::ListPrerequisites,
        Self::GetUser,
        Self::GetUserProgress,
        Self::CreateUser,
        Self::UpdateUserProgress,
        Self::CompleteModule,
        Self::CanCompleteModule,
        Self::IsCourseComplete,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ListCourses => "listCourses",
            Self::GetCourse => "getCourse",
            Self::ListModules => "listModules",
            Self::GetModule => "getModule",
            Self::ListPrerequisites => "listPrerequisites",
            Self::GetUser => "getUser",
            Self::GetUserProgress => "getUserProgress",
            Self::CreateUser => "createUser",
            Self::UpdateUserProgress => "updateUserProgress",
            Self::CompleteModule => "completeModule",
            Self::CanCompleteModule => "canCompleteModule",
            Self::IsCourseComplete => "isCourseComplete",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListCoursesInput {
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CourseInput {
    course_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ModuleInput {
    module_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct UserInput {
    user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct UserModuleInput {
    user_id: String,
    module_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct UserCourseInput {
    user_id: String,
    course_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct UpdateUserProgressInput {
    user_id: String,
    course_id: Option<String>,
    module_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CourseCompletion {
    user_id: String,
    course_id: String,
    is_complete: bool,
}

pub async fn dispatch(
    State(state): State<AppState>,
    Json(request): Json<OperationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = OperationName::parse(&request.operation)
        .ok_or_else(|| AppError::validation(format!("unknown operation {}", request.operation)))?;

    tracing::debug!(operation = name.as_str(), "dispatching operation");
    let data = execute(&state, name, request.input).await?;
    Ok(ok(data))
}

pub async fn execute(state: &AppState, name: OperationName, input: Value) -> Result<Value, AppError> {
    let db = state.db();
    let progress = state.progress();

    match name {
        OperationName::ListCourses => {
            let input: ListCoursesInput = parse_input(name, input)?;
            to_value(catalog::list_courses(db, input.category.as_deref()).await?)
        }
        OperationName::GetCourse => {
            let input: CourseInput = parse_input(name, input)?;
            to_value(catalog::get_course(db, &input.course_id).await?)
        }
        OperationName::ListModules => {
            let input: CourseInput = parse_input(name, input)?;
            to_value(catalog::list_modules(db, &input.course_id).await?)
        }
        OperationName::GetModule => {
            let input: ModuleInput = parse_input(name, input)?;
            to_value(catalog::get_module(db, &input.module_id).await?)
        }
        OperationName::ListPrerequisites => {
            let _: ListPrerequisitesInput = parse_input(name, input)?;
            to_value(catalog::list_prerequisites(db).await?)
        }
        OperationName::GetUser => {
            let input: UserInput = parse_input(name, input)?;
            to_value(catalog::get_user(db, &input.user_id).await?)
        }
        OperationName::GetUserProgress => {
            let input: UserInput = parse_input(name, input)?;
            to_value(progress.get_user_progress(&input.user_id).await?)
        }
        OperationName::CreateUser => {
            let input: CreateUserInput = parse_input(name, input)?;
            to_value(catalog::create_user(db, &input).await?)
        }
        OperationName::UpdateUserProgress => {
            let input: UpdateUserProgressInput = parse_input(name, input)?;
            let target = UpdateProgressInput {
                course_id: input.course_id,
                module_id: input.module_id,
            };
            to_value(progress.update_user_progress(&input.user_id, &target).await?)
        }
        OperationName::CompleteModule => {
            let input: UserModuleInput = parse_input(name, input)?;
            to_value(progress.complete_module(&input.user_id, &input.module_id).await?)
        }
        OperationName::CanCompleteModule => {
            let input: UserModuleInput = parse_input(name, input)?;
            to_value(progress.can_complete(&input.user_id, &input.module_id).await?)
        }
        OperationName::IsCourseComplete => {
            let input: UserCourseInput = parse_input(name, input)?;
            let is_complete = progress
                .is_course_complete(&input.user_id, &input.course_id)
                .await?;
            to_value(CourseCompletion {
                user_id: input.user_id,
                course_id: input.course_id,
                is_complete,
            })
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListPrerequisitesInput {}

/// `null` input is read as an empty object so operations without arguments can omit it.
fn parse_input<T: DeserializeOwned>(name: OperationName, input: Value) -> Result<T, AppError> {
    let input = match input {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(input)
        .map_err(|err| AppError::validation(format!("invalid input for {}: {err}", name.as_str())))
}

fn to_value<T: Serialize>(data: T) -> Result<Value, AppError> {
    serde_json::to_value(data).map_err(|err| AppError::internal(err.to_string()))
}
