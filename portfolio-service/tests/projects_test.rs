mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::TestApp;
use portfolio_service::models::Project;
use portfolio_service::services::store::ProjectStore;
use serde_json::json;

#[tokio::test]
async fn test_pagination_over_twenty_five_projects() {
    let app = TestApp::new().await;
    let base = Utc::now();
    for i in 0..25 {
        let mut project = Project::new(format!("Project {:02}", i), "d".into(), vec![]);
        project.created_at = base + Duration::seconds(i);
        app.store.insert_project(&project).await.unwrap();
    }

    let (status, body) = app.json("GET", "/projects?page=2&limit=10", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["projects"].as_array().unwrap().len(), 10);
    assert_eq!(body["pagination"]["page"], 2);
    assert_eq!(body["pagination"]["limit"], 10);
    assert_eq!(body["pagination"]["total"], 25);
    assert_eq!(body["pagination"]["pages"], 3);
    assert_eq!(body["projects"][0]["title"], "Project 14");

    let (_, last) = app.json("GET", "/projects?page=3&limit=10", None, None).await;
    assert_eq!(last["projects"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_list_defaults_and_clamping() {
    let app = TestApp::new().await;

    let (status, body) = app.json("GET", "/projects", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["limit"], 10);
    assert_eq!(body["pagination"]["pages"], 0);

    let (_, body) = app.json("GET", "/projects?page=-3&limit=500", None, None).await;
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["limit"], 100);
}

#[tokio::test]
async fn test_page_far_past_the_end_is_empty() {
    let app = TestApp::new().await;
    let (token, _) = app.register_admin().await;
    app.create_project(&token, "Only project").await;

    let (status, body) = app
        .json("GET", "/projects?page=9223372036854775807&limit=10", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["projects"].as_array().unwrap().len(), 0);
    assert_eq!(body["pagination"]["page"], i64::MAX);
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_malformed_query_is_json_bad_request() {
    let app = TestApp::new().await;

    let (status, body) = app.json("GET", "/projects?page=abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid query string"));
}

#[tokio::test]
async fn test_crud_flow() {
    let app = TestApp::new().await;
    let (token, _) = app.register_admin().await;

    let (status, created) = app
        .json(
            "POST",
            "/projects",
            Some(&token),
            Some(json!({ "title": "Sales dashboard", "description": "Regional sales" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["tags"], json!([]));
    assert_eq!(created["files"], json!([]));
    let id = created["id"].as_str().unwrap();

    let (status, fetched) = app.json("GET", &format!("/projects/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "Sales dashboard");

    let (status, updated) = app
        .json(
            "PUT",
            &format!("/projects/{}", id),
            Some(&token),
            Some(json!({ "tags": ["sql", "power-bi"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Sales dashboard");
    assert_eq!(updated["tags"], json!(["sql", "power-bi"]));
    let timestamp = |v: &serde_json::Value| {
        chrono::DateTime::parse_from_rfc3339(v.as_str().unwrap()).unwrap()
    };
    assert!(timestamp(&updated["updatedAt"]) >= timestamp(&created["updatedAt"]));

    let (status, _) = app
        .json("DELETE", &format!("/projects/{}", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.json("GET", &format!("/projects/{}", id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Project not found");
}

#[tokio::test]
async fn test_mutations_require_token() {
    let app = TestApp::new().await;
    let (token, _) = app.register_admin().await;
    let id = app.create_project(&token, "Mine").await;

    let (status, _) = app
        .json(
            "POST",
            "/projects",
            None,
            Some(json!({ "title": "t", "description": "d" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .json("PUT", &format!("/projects/{}", id), None, Some(json!({ "title": "x" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .json("DELETE", &format!("/projects/{}", id), Some("garbage"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Reads stay public
    let (status, _) = app.json("GET", &format!("/projects/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_validation_rules() {
    let app = TestApp::new().await;
    let (token, _) = app.register_admin().await;

    let (status, _) = app
        .json(
            "POST",
            "/projects",
            Some(&token),
            Some(json!({ "title": "", "description": "d" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(
            "POST",
            "/projects",
            Some(&token),
            Some(json!({ "title": "x".repeat(201), "description": "d" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let id = app.create_project(&token, "Valid").await;
    let (status, _) = app
        .json(
            "PUT",
            &format!("/projects/{}", id),
            Some(&token),
            Some(json!({ "description": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let app = TestApp::new().await;
    let (token, _) = app.register_admin().await;
    let missing = uuid::Uuid::new_v4();

    let (status, _) = app
        .json("PUT", &format!("/projects/{}", missing), Some(&token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .json("DELETE", &format!("/projects/{}", missing), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.json("GET", "/projects/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
