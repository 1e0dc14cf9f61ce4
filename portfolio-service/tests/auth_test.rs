mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{TestApp, ADMIN_PASSWORD, ADMIN_USERNAME, TWO_FACTOR_EMAIL};
use portfolio_service::config::JwtConfig;
use portfolio_service::services::JwtService;
use secrecy::Secret;
use serde_json::json;

#[tokio::test]
async fn test_register_then_login_subject_matches() {
    let app = TestApp::new().await;
    let (status, registered) = app
        .json(
            "POST",
            "/auth/register",
            None,
            Some(json!({ "username": "analyst", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(registered["user"]["username"], "analyst");
    assert!(registered["user"].get("passwordHash").is_none());
    assert!(registered["user"].get("password_hash").is_none());

    let (status, login) = app
        .json(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "analyst", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let claims = app
        .state
        .tokens
        .jwt()
        .validate_access_token(login["accessToken"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.sub, registered["user"]["id"].as_str().unwrap());
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = TestApp::new().await;
    app.register_admin().await;

    let (status, body) = app
        .json(
            "POST",
            "/auth/register",
            None,
            Some(json!({ "username": ADMIN_USERNAME, "password": "another-pass" })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Username already exists");
    assert_eq!(app.store.user_count(), 1);
}

#[tokio::test]
async fn test_register_validation() {
    let app = TestApp::new().await;
    let (status, body) = app
        .json(
            "POST",
            "/auth/register",
            None,
            Some(json!({ "username": "ab", "password": "123" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(app.store.user_count(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::new().await;
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let app = TestApp::new().await;
    app.register_admin().await;

    let (status, body) = app
        .json(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": ADMIN_USERNAME, "password": "wrong-pass" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn test_refresh_then_logout_revokes() {
    let app = TestApp::new().await;
    let (_, refresh_token) = app.register_admin().await;

    let (status, body) = app
        .json(
            "POST",
            "/auth/refresh",
            None,
            Some(json!({ "refreshToken": refresh_token })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["accessToken"].is_string());

    let (status, _) = app
        .json(
            "POST",
            "/auth/logout",
            None,
            Some(json!({ "refreshToken": refresh_token })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.store.refresh_token_count(), 0);

    let (status, _) = app
        .json(
            "POST",
            "/auth/refresh",
            None,
            Some(json!({ "refreshToken": refresh_token })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_without_token() {
    let app = TestApp::new().await;

    let (status, _) = app.json("POST", "/auth/refresh", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.json("POST", "/auth/refresh", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_body() {
    let app = TestApp::new().await;
    let (status, _) = app.json("POST", "/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_expired_access_token_rejected_while_refresh_valid() {
    let app = TestApp::new().await;
    let (_, refresh_token) = app.register_admin().await;

    // Same secret, negative lifetime
    let expired_signer = JwtService::new(&JwtConfig {
        secret: Secret::new("integration-test-secret-0123456789abcdef".into()),
        access_token_expiry_minutes: -1,
        refresh_token_expiry_days: 7,
        verification_code_expiry_minutes: 10,
    })
    .unwrap();
    let user = app
        .state
        .tokens
        .jwt()
        .validate_refresh_token(&refresh_token)
        .unwrap();
    let expired = expired_signer
        .generate_access_token(user.user_id().unwrap(), &user.username)
        .unwrap();

    let (status, _) = app
        .json(
            "POST",
            "/projects",
            Some(&expired),
            Some(json!({ "title": "t", "description": "d" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .json(
            "POST",
            "/auth/refresh",
            None,
            Some(json!({ "refreshToken": refresh_token })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let app = TestApp::new().await;
    let (_, refresh_token) = app.register_admin().await;

    let (status, _) = app
        .json(
            "POST",
            "/projects",
            Some(&refresh_token),
            Some(json!({ "title": "t", "description": "d" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_two_factor_login() {
    let app = TestApp::with_config(|config| config.two_factor.enabled = true).await;
    app.register_admin().await;

    let (status, pending) = app
        .json(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending["pending2FA"], true);
    assert_eq!(pending["message"], "Verification code sent to your email");
    assert!(pending.get("accessToken").is_none());

    let user_id = pending["userId"].as_str().unwrap();
    let code = app.email.last_code_for(TWO_FACTOR_EMAIL).unwrap();

    let (status, _) = app
        .json(
            "POST",
            "/auth/verify-2fa",
            None,
            Some(json!({ "userId": user_id, "code": "000000" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, session) = app
        .json(
            "POST",
            "/auth/verify-2fa",
            None,
            Some(json!({ "userId": user_id, "code": code })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["user"]["id"], user_id);
    assert!(session["refreshToken"].is_string());

    // The code is spent
    let (status, _) = app
        .json(
            "POST",
            "/auth/verify-2fa",
            None,
            Some(json!({ "userId": user_id, "code": code })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_is_rate_limited_per_ip() {
    let app = TestApp::with_config(|config| {
        config.rate_limit.login_attempts = 2;
        config.rate_limit.login_window_seconds = 3600;
    })
    .await;

    let attempt = || {
        Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::from(
                json!({ "username": "nobody", "password": "whatever" }).to_string(),
            ))
            .unwrap()
    };

    assert_eq!(app.send(attempt()).await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.send(attempt()).await.status(), StatusCode::UNAUTHORIZED);

    let limited = app.send(attempt()).await;
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().contains_key("retry-after"));
}

#[tokio::test]
async fn test_routes_are_served_under_api_prefix() {
    let app = TestApp::new().await;
    let (status, body) = app
        .json(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "username": "prefixed", "password": "secret123" })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["username"], "prefixed");
}
