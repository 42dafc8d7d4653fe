use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub level: String,
    pub duration_hours: f64,
    /// Curriculum order, not dependency order.
    pub module_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: String,
    pub course_id: String,
    pub position: i64,
    pub title: String,
    pub description: String,
    pub duration_minutes: i64,
    pub exercises: i64,
    pub videos: i64,
}

/// `module_id` cannot be completed until `required_module_id` is.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrerequisiteEdge {
    pub module_id: String,
    pub required_module_id: String,
}

impl PrerequisiteEdge {
    pub fn new(module_id: impl Into<String>, required_module_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            required_module_id: required_module_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    pub email: String,
    pub name: String,
}

impl CreateUserInput {
    pub fn normalized(&self) -> Result<(String, String), String> {
        let email = self.email.trim().to_lowercase();
        let name = self.name.trim().to_string();

        if name.is_empty() {
            return Err("name must not be empty".to_string());
        }
        if name.chars().count() > 120 {
            return Err("name must be at most 120 characters".to_string());
        }
        let valid_email = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
                    && !domain.ends_with('.')
            }
            None => false,
        };
        if !valid_email || email.chars().any(char::is_whitespace) {
            return Err(format!("invalid email address: {}", self.email.trim()));
        }

        Ok((email, name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleCompletion {
    pub user_id: String,
    pub module_id: String,
    pub course_id: String,
    pub completed_at: String,
}

/// Cached projection of a user's completions within one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    pub user_id: String,
    pub course_id: String,
    pub completed_count: i64,
    pub total_count: i64,
    pub percent_complete: f64,
    pub is_complete: bool,
    pub completed_module_ids: Vec<String>,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Either a course or a module identifies which projection to refresh.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProgressInput {
    pub course_id: Option<String>,
    pub module_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    pub module: Module,
    pub progress: CourseProgress,
    pub newly_completed: bool,
}
