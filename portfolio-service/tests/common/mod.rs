//! Test helpers for portfolio-service integration tests.
//!
//! Builds the full router over the in-memory store, local storage in a temp
//! directory and a recording email provider.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use portfolio_service::{
    build_router,
    config::{
        DatabaseConfig, Environment, JwtConfig, PortfolioConfig, RateLimitConfig, SecurityConfig,
        SeedConfig, SmtpConfig, StorageBackend, StorageConfig, TwoFactorConfig, UploadConfig,
    },
    services::{InMemoryStore, LocalStorage, MockEmailService},
    AppState,
};
use secrecy::Secret;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "portfolio-pass";
pub const TWO_FACTOR_EMAIL: &str = "owner@example.com";
pub const MAX_FILE_SIZE: u64 = 64 * 1024;

pub fn test_config(root: &Path) -> PortfolioConfig {
    PortfolioConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "portfolio-service".into(),
        service_version: "test".into(),
        log_level: "debug".into(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "postgres://unused".into(),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: Secret::new("integration-test-secret-0123456789abcdef".into()),
            access_token_expiry_minutes: 60,
            refresh_token_expiry_days: 7,
            verification_code_expiry_minutes: 10,
        },
        two_factor: TwoFactorConfig {
            enabled: false,
            email: Some(TWO_FACTOR_EMAIL.into()),
        },
        storage: StorageConfig {
            backend: StorageBackend::Local,
            local_path: root.join("objects"),
            public_base_url: "http://localhost:8080/storage".into(),
            supabase_url: None,
            supabase_service_role_key: None,
            bucket: "portfolio-assets".into(),
        },
        upload: UploadConfig {
            temp_dir: root.join("uploads"),
            max_file_size: MAX_FILE_SIZE,
            max_files: 5,
        },
        smtp: SmtpConfig {
            host: "localhost".into(),
            port: 2525,
            user: None,
            password: None,
            from: None,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".into()],
        },
        rate_limit: RateLimitConfig {
            login_attempts: 100,
            login_window_seconds: 60,
        },
        seed: SeedConfig {
            admin_username: None,
            admin_password: None,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub email: Arc<MockEmailService>,
    pub dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(customize: impl FnOnce(&mut PortfolioConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        customize(&mut config);

        let store = Arc::new(InMemoryStore::new());
        let storage = Arc::new(
            LocalStorage::new(&config.storage.local_path, &config.storage.public_base_url)
                .await
                .unwrap(),
        );
        let email = Arc::new(MockEmailService::new());

        let state = AppState::new(config, store.clone(), storage, email.clone())
            .await
            .unwrap();
        let router = build_router(state.clone()).unwrap();

        Self {
            router,
            state,
            store,
            email,
            dir,
        }
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.dir.path().join("objects").join("projects")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    pub async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Sends a JSON request and returns the status and parsed body (`Null` when empty).
    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.send(request).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    /// Registers the admin account and returns `(access_token, refresh_token)`.
    pub async fn register_admin(&self) -> (String, String) {
        let (status, body) = self
            .json(
                "POST",
                "/auth/register",
                None,
                Some(serde_json::json!({
                    "username": ADMIN_USERNAME,
                    "password": ADMIN_PASSWORD,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

        (
            body["accessToken"].as_str().unwrap().to_string(),
            body["refreshToken"].as_str().unwrap().to_string(),
        )
    }

    /// Creates a project and returns its id.
    pub async fn create_project(&self, token: &str, title: &str) -> String {
        let (status, body) = self
            .json(
                "POST",
                "/projects",
                Some(token),
                Some(serde_json::json!({
                    "title": title,
                    "description": "Sample project",
                    "tags": ["power-bi"],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }
}

pub async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = body_bytes(response).await;
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}

pub const BOUNDARY: &str = "portfolio-test-boundary";

/// A multipart body with an optional `projectId` and `files` parts of
/// `(filename, content_type, bytes)`.
pub fn multipart_body(project_id: Option<&str>, files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();

    if let Some(project_id) = project_id {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"projectId\"\r\n\r\n{}\r\n",
                BOUNDARY, project_id
            )
            .as_bytes(),
        );
    }

    for (filename, content_type, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, filename, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(token: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/files/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(Result::ok).count())
        .unwrap_or(0)
}
