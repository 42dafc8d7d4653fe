#![allow(dead_code)]

use axum::Router;

use course_progress_backend::config::Config;
use course_progress_backend::create_app;
use course_progress_backend::db::config::DbConfig;
use course_progress_backend::db::Database;
use course_progress_backend::progress::types::{CreateUserInput, PrerequisiteEdge, User};
use course_progress_backend::seed::{self, CatalogCourse, CatalogDocument, CatalogModule};
use course_progress_backend::services::catalog;
use course_progress_backend::state::AppState;

pub fn module(id: &str) -> CatalogModule {
    CatalogModule {
        id: id.to_string(),
        title: format!("Module {id}"),
        description: String::new(),
        duration_minutes: 30,
        exercises: 1,
        videos: 1,
    }
}

pub fn course(id: &str, modules: &[&str], edges: &[(&str, &str)]) -> CatalogCourse {
    CatalogCourse {
        id: id.to_string(),
        title: format!("Course {id}"),
        description: String::new(),
        category: "testing".to_string(),
        level: "beginner".to_string(),
        duration_hours: 1.0,
        modules: modules.iter().map(|id| module(id)).collect(),
        prerequisites: edges
            .iter()
            .map(|(module, required)| PrerequisiteEdge::new(*module, *required))
            .collect(),
    }
}

/// `course-abc`: C requires B, B requires A.
/// `course-diamond`: D requires B2 and C2, both of which require A2.
/// `course-cycle`: X and Y require each other.
/// `course-dangling`: P requires a module that does not exist.
/// `course-empty`: no modules.
pub fn sample_catalog() -> CatalogDocument {
    CatalogDocument {
        courses: vec![
            course("course-abc", &["A", "B", "C"], &[("B", "A"), ("C", "B")]),
            course(
                "course-diamond",
                &["A2", "B2", "C2", "D"],
                &[("B2", "A2"), ("C2", "A2"), ("D", "B2"), ("D", "C2")],
            ),
            course("course-cycle", &["X", "Y"], &[("X", "Y"), ("Y", "X")]),
            course("course-dangling", &["P"], &[("P", "ghost")]),
            course("course-empty", &[], &[]),
        ],
    }
}

pub async fn seeded_db() -> Database {
    let db = Database::in_memory().await.unwrap();
    seed::import_catalog(&db, &sample_catalog()).await.unwrap();
    db
}

/// File-backed database with a multi-connection pool, for tests that need real
/// concurrent writers.
pub async fn seeded_file_db(dir: &tempfile::TempDir) -> Database {
    let db = Database::connect(DbConfig::file(&dir.path().join("progress.db")))
        .await
        .unwrap();
    seed::import_catalog(&db, &sample_catalog()).await.unwrap();
    db
}

pub async fn create_user(db: &Database, email: &str) -> User {
    catalog::create_user(
        db,
        &CreateUserInput {
            email: email.to_string(),
            name: "Test Learner".to_string(),
        },
    )
    .await
    .unwrap()
}

pub async fn create_test_app() -> (Router, AppState) {
    let db = seeded_db().await;
    let state = AppState::new(Config::default(), db);
    (create_app(state.clone()), state)
}
