//! A stand-in portfolio API on an ephemeral port.
//!
//! Login issues `STALE_TOKEN`, which every protected route rejects, so the
//! first authenticated call always goes through the refresh path.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use session_client::{ClientConfig, PortfolioApi, TokenStore};
use uuid::Uuid;

pub const STALE_TOKEN: &str = "stale-access-token";
pub const VALID_TOKEN: &str = "valid-access-token";
pub const REFRESH_TOKEN: &str = "refresh-token-1";
pub const REFRESH_DELAY: Duration = Duration::from_millis(150);

#[derive(Default)]
pub struct MockState {
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub refresh_fails: AtomicBool,
    pub logged_out_tokens: Mutex<Vec<String>>,
}

pub struct MockServer {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockServer {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/register", post(register))
            .route("/auth/verify-2fa", post(verify_two_factor))
            .route("/auth/refresh", post(refresh))
            .route("/auth/logout", post(logout))
            .route("/projects", get(list_projects).post(create_project))
            .route("/projects/:id", get(get_project).delete(delete_project))
            .route("/files/upload", post(upload))
            .route("/always-unauthorized", get(always_unauthorized))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn api(&self, store: Arc<dyn TokenStore>) -> PortfolioApi {
        PortfolioApi::new(
            ClientConfig::new(&self.base_url).with_timeout(Duration::from_secs(5)),
            store,
        )
        .unwrap()
    }

    pub fn refresh_calls(&self) -> usize {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn fail_refresh(&self) {
        self.state.refresh_fails.store(true, Ordering::SeqCst);
    }
}

fn session_body(access_token: &str) -> Value {
    json!({
        "accessToken": access_token,
        "refreshToken": REFRESH_TOKEN,
        "user": { "id": Uuid::nil(), "username": "admin" },
    })
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", VALID_TOKEN))
}

fn project_body(id: Uuid, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": "Mock project",
        "tags": ["sql"],
        "createdAt": "2026-01-01T00:00:00Z",
        "updatedAt": "2026-01-01T00:00:00Z",
        "files": [],
    })
}

async fn login(Json(body): Json<Value>) -> Response {
    match (body["username"].as_str(), body["password"].as_str()) {
        (Some("twofactor"), _) => Json(json!({
            "pending2FA": true,
            "userId": Uuid::nil(),
            "message": "Verification code sent to your email",
        }))
        .into_response(),
        (_, Some("wrong-password")) => error(StatusCode::UNAUTHORIZED, "Invalid credentials"),
        _ => Json(session_body(STALE_TOKEN)).into_response(),
    }
}

async fn register() -> Response {
    (StatusCode::CREATED, Json(session_body(VALID_TOKEN))).into_response()
}

async fn verify_two_factor(Json(body): Json<Value>) -> Response {
    if body["code"] == "123456" {
        Json(session_body(VALID_TOKEN)).into_response()
    } else {
        error(StatusCode::UNAUTHORIZED, "Invalid verification code")
    }
}

async fn refresh(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(REFRESH_DELAY).await;

    if state.refresh_fails.load(Ordering::SeqCst) || body["refreshToken"] != REFRESH_TOKEN {
        return error(StatusCode::UNAUTHORIZED, "Invalid refresh token");
    }
    Json(json!({ "accessToken": VALID_TOKEN })).into_response()
}

async fn logout(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> StatusCode {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(token) = body["refreshToken"].as_str() {
        state.logged_out_tokens.lock().unwrap().push(token.to_string());
    }
    StatusCode::NO_CONTENT
}

async fn list_projects(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Authentication required");
    }
    let page: i64 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let limit: i64 = query.get("limit").and_then(|l| l.parse().ok()).unwrap_or(10);
    Json(json!({
        "projects": [project_body(Uuid::new_v4(), "Dashboard")],
        "pagination": { "page": page, "limit": limit, "total": 1, "pages": 1 },
    }))
    .into_response()
}

async fn create_project(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Authentication required");
    }
    let title = body["title"].as_str().unwrap_or_default();
    (StatusCode::CREATED, Json(project_body(Uuid::new_v4(), title))).into_response()
}

async fn get_project(Path(id): Path<Uuid>) -> Response {
    if id.is_nil() {
        return error(StatusCode::NOT_FOUND, "Project not found");
    }
    Json(project_body(id, "Fetched")).into_response()
}

async fn delete_project(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Authentication required");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn upload(headers: HeaderMap, mut multipart: Multipart) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Authentication required");
    }

    let mut project_id = None;
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("projectId") => project_id = Some(field.text().await.unwrap()),
            Some("files") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let mimetype = field.content_type().unwrap_or_default().to_string();
                let size = field.bytes().await.unwrap().len();
                files.push(json!({
                    "id": Uuid::new_v4(),
                    "filename": filename,
                    "size": size,
                    "mimetype": mimetype,
                }));
            }
            _ => {}
        }
    }

    if project_id.is_none() {
        return error(StatusCode::BAD_REQUEST, "Project ID is required");
    }
    (
        StatusCode::CREATED,
        Json(json!({ "message": "Files uploaded successfully", "files": files })),
    )
        .into_response()
}

async fn always_unauthorized() -> Response {
    error(StatusCode::UNAUTHORIZED, "Authentication required")
}
