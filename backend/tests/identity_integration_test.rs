//! Integration tests for the Identity endpoints

mod common;

use axum::http::StatusCode;
use common::{unique_email, TestApp, PASSWORD};
use serde_json::json;

#[tokio::test]
#[ignore = "requires database"]
async fn test_register_returns_tokens() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/v1/identity/register",
            None,
            json!({ "email": unique_email(), "password": PASSWORD }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(!body["access_token"].as_str().unwrap().is_empty());
    assert!(!body["refresh_token"].as_str().unwrap().is_empty());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 3600);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_register_duplicate_email_ignores_case() {
    let app = TestApp::new().await;
    let email = unique_email();

    let (status, _) = app
        .post(
            "/api/v1/identity/register",
            None,
            json!({ "email": email, "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post(
            "/api/v1/identity/register",
            None,
            json!({ "email": email.to_uppercase(), "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_register_rejects_invalid_input() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/v1/identity/register",
            None,
            json!({ "email": "not-an-email", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .post(
            "/api/v1/identity/register",
            None,
            json!({ "email": unique_email(), "password": "short" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_login_and_refresh() {
    let app = TestApp::new().await;
    let user = app.register(&unique_email()).await;

    let (status, tokens) = app
        .post(
            "/api/v1/identity/login",
            None,
            json!({ "email": user.email, "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, refreshed) = app
        .post(
            "/api/v1/identity/refresh",
            None,
            json!({ "refresh_token": tokens["refresh_token"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let access = refreshed["access_token"].as_str().unwrap();
    let (status, me) = app.get("/api/v1/identity/me", Some(access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], user.id.as_str());
    assert_eq!(me["role"], "user");
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::new().await;
    let user = app.register(&unique_email()).await;

    let (wrong_status, wrong_body) = app
        .post(
            "/api/v1/identity/login",
            None,
            json!({ "email": user.email, "password": "WrongPassword123!" }),
        )
        .await;
    let (unknown_status, unknown_body) = app
        .post(
            "/api/v1/identity/login",
            None,
            json!({ "email": unique_email(), "password": PASSWORD }),
        )
        .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body["error"]["message"], unknown_body["error"]["message"]);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_access_token_cannot_refresh() {
    let app = TestApp::new().await;
    let user = app.register(&unique_email()).await;

    let (status, _) = app
        .post(
            "/api/v1/identity/refresh",
            None,
            json!({ "refresh_token": user.token }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_me_requires_token() {
    let app = TestApp::new().await;

    let (status, _) = app.get("/api/v1/identity/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/v1/identity/me", Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_admin_email_gets_admin_role() {
    let app = TestApp::new().await;
    let admin = app.admin().await;

    let (status, me) = app.get("/api/v1/identity/me", Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "admin");
}
