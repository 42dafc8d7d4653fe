use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use course_progress_backend::config::Config;
use course_progress_backend::create_app;
use course_progress_backend::services::ProgressService;
use course_progress_backend::state::AppState;

mod common;

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn create_user(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        post_json("/api/users", json!({ "email": email, "name": "Api Learner" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_root() {
    let (app, _) = common::create_test_app().await;
    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_health_live_and_info() {
    let (app, _) = common::create_test_app().await;

    let (status, body) = send(&app, get("/health/live")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, get("/health/info")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "course-progress-backend");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let (app, _) = common::create_test_app().await;
    let (status, body) = send(&app, get("/api/nothing-here")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_catalog_routes() {
    let (app, _) = common::create_test_app().await;

    let (status, body) = send(&app, get("/api/courses")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 5);

    let (status, body) = send(&app, get("/api/courses/course-abc")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["moduleIds"], json!(["A", "B", "C"]));

    let (status, body) = send(&app, get("/api/courses/course-abc/modules")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][2]["position"], 3);

    let (status, body) = send(&app, get("/api/courses/course-abc/graph")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["topologicalOrder"], json!(["A", "B", "C"]));

    let (status, body) = send(&app, get("/api/courses/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_invalid_graph_reports_details() {
    let (app, _) = common::create_test_app().await;
    let (status, body) = send(&app, get("/api/courses/course-cycle/graph")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "GRAPH_INVALID");
    assert_eq!(body["details"]["courseId"], "course-cycle");
    assert_eq!(body["details"]["cycle"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_completion_flow() {
    let (app, _) = common::create_test_app().await;
    let user_id = create_user(&app, "flow@example.com").await;

    let (status, body) = send(
        &app,
        get(&format!("/api/users/{user_id}/modules/B/eligibility")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["eligible"], false);
    assert_eq!(body["data"]["missingPrerequisites"], json!(["A"]));

    let (status, body) = send(
        &app,
        post_json(&format!("/api/users/{user_id}/modules/B/complete"), Value::Null),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "PREREQUISITES_UNMET");
    assert_eq!(body["retryable"], false);

    let (status, body) = send(
        &app,
        post_json(&format!("/api/users/{user_id}/modules/A/complete"), Value::Null),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["newlyCompleted"], true);
    assert_eq!(body["data"]["progress"]["completedCount"], 1);

    let (status, body) = send(
        &app,
        post_json(&format!("/api/users/{user_id}/modules/A/complete"), Value::Null),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["newlyCompleted"], false);

    let (status, body) = send(&app, get(&format!("/api/users/{user_id}/completions"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, get(&format!("/api/users/{user_id}/progress"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["courseId"], "course-abc");
}

#[tokio::test]
async fn test_create_user_validation_and_conflict() {
    let (app, _) = common::create_test_app().await;
    create_user(&app, "dup@example.com").await;

    let (status, body) = send(
        &app,
        post_json("/api/users", json!({ "email": "dup@example.com", "name": "Again" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, body) = send(&app, get("/api/users?email=DUP@example.com")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "dup@example.com");

    let (status, body) = send(
        &app,
        post_json("/api/users", json!({ "email": "not-an-email", "name": "Bad" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_operations_endpoint() {
    let (app, _) = common::create_test_app().await;
    let (status, body) = send(
        &app,
        post_json(
            "/api/operations",
            json!({
                "operation": "createUser",
                "input": { "email": "ops@example.com", "name": "Ops" }
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let user_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        post_json(
            "/api/operations",
            json!({ "operation": "completeModule", "input": { "userId": user_id, "moduleId": "A" } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["newlyCompleted"], true);

    let (status, body) = send(
        &app,
        post_json(
            "/api/operations",
            json!({ "operation": "isCourseComplete", "input": { "userId": user_id, "courseId": "course-abc" } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isComplete"], false);

    let (status, body) = send(
        &app,
        post_json("/api/operations", json!({ "operation": "listCourses" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_operations_reject_unknown_names_and_fields() {
    let (app, _) = common::create_test_app().await;

    let (status, body) = send(
        &app,
        post_json("/api/operations", json!({ "operation": "deleteEverything" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        post_json(
            "/api/operations",
            json!({ "operation": "getUser", "input": { "userId": "u", "role": "admin" } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_request_past_deadline_gets_408_and_records_nothing() {
    let db = common::seeded_db().await;
    let user = common::create_user(&db, "slow@example.com").await;
    let config = Config {
        request_timeout: Duration::from_millis(50),
        ..Config::default()
    };
    let app = create_app(AppState::new(config, db.clone()));

    // The in-memory pool has a single connection; holding it stalls the handler.
    let held = db.pool().acquire().await.unwrap();
    let (status, _) = send(
        &app,
        post_json(&format!("/api/users/{}/modules/A/complete", user.id), Value::Null),
    )
    .await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    drop(held);

    let service = ProgressService::new(db);
    assert!(service.ledger().completion_set(&user.id).await.unwrap().is_empty());
}
