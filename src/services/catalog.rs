use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

use crate::db::operations::{catalog as catalog_ops, user as user_ops};
use crate::db::Database;
use crate::progress::types::{Course, CreateUserInput, Module, PrerequisiteEdge, User};
use crate::progress::ProgressError;

pub async fn list_courses(
    db: &Database,
    category: Option<&str>,
) -> Result<Vec<Course>, ProgressError> {
    let category = category.map(str::trim).filter(|c| !c.is_empty());
    Ok(catalog_ops::fetch_courses(db, category).await?)
}

pub async fn get_course(db: &Database, course_id: &str) -> Result<Course, ProgressError> {
    catalog_ops::fetch_course(db, course_id)
        .await?
        .ok_or_else(|| ProgressError::UnknownCourse(course_id.to_string()))
}

pub async fn list_modules(db: &Database, course_id: &str) -> Result<Vec<Module>, ProgressError> {
    // An empty list must not hide a missing course.
    get_course(db, course_id).await?;
    Ok(catalog_ops::fetch_modules_by_course(db, course_id).await?)
}

pub async fn get_module(db: &Database, module_id: &str) -> Result<Module, ProgressError> {
    catalog_ops::fetch_module(db, module_id)
        .await?
        .ok_or_else(|| ProgressError::UnknownModule(module_id.to_string()))
}

pub async fn list_prerequisites(db: &Database) -> Result<Vec<PrerequisiteEdge>, ProgressError> {
    Ok(catalog_ops::fetch_all_prerequisites(db).await?)
}

pub async fn get_user(db: &Database, user_id: &str) -> Result<User, ProgressError> {
    user_ops::fetch_user(db, user_id)
        .await?
        .ok_or_else(|| ProgressError::UnknownUser(user_id.to_string()))
}

pub async fn find_user_by_email(db: &Database, email: &str) -> Result<User, ProgressError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ProgressError::Validation("email is required".to_string()));
    }
    let found = user_ops::find_user_by_email(db, &email).await?;
    found.ok_or(ProgressError::UnknownUser(email))
}

pub async fn create_user(db: &Database, input: &CreateUserInput) -> Result<User, ProgressError> {
    let (email, name) = input.normalized().map_err(ProgressError::Validation)?;

    let user = User {
        id: Uuid::new_v4().to_string(),
        email,
        name,
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };

    if !user_ops::insert_user(db, &user).await? {
        return Err(ProgressError::Conflict(format!(
            "a user with email {} already exists",
            user.email
        )));
    }

    tracing::info!(user_id = %user.id, "user created");
    Ok(user)
}
