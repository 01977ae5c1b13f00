//! Router tests for account endpoints and bearer authentication.

mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::{json_request, parse_response_body, request_with_auth, TestApp};
use fake::{faker::internet::en::Username, Fake};
use serde_json::json;
use tower::ServiceExt;

fn unique_username() -> String {
    let base: String = Username().fake();
    format!("{}_{}", base, &uuid::Uuid::new_v4().simple().to_string()[..8])
}

async fn sign_up(app: &TestApp, username: &str, user_type: &str) -> axum::response::Response {
    let request = json_request(
        Method::POST,
        "/api/v1/user/signup",
        json!({
            "username": username,
            "password": "correct-horse-battery",
            "user_type": user_type,
            "telegram_user": "@resident_one"
        }),
    );
    app.router.clone().oneshot(request).await.unwrap()
}

#[tokio::test]
async fn test_signup_then_login() {
    let app = TestApp::new();
    let username = unique_username();

    let response = sign_up(&app, &username, "resident").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_response_body(response).await;
    assert_eq!(body["username"], username.as_str());
    assert_eq!(body["user_type"], "resident");
    assert_eq!(body["telegram_user"], "resident_one");
    assert!(body.get("password_hash").is_none());

    let request = json_request(
        Method::POST,
        "/api/v1/user/login",
        json!({ "username": username, "password": "correct-horse-battery" }),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["token_type"], "Bearer");
    let token = body["access_token"].as_str().unwrap();

    // Token works on an authenticated route.
    let response = app
        .router
        .clone()
        .oneshot(request_with_auth(Method::GET, "/api/v1/resident/apartments", token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_signup_duplicate_username_conflicts() {
    let app = TestApp::new();
    let username = unique_username();

    assert_eq!(sign_up(&app, &username, "manager").await.status(), StatusCode::CREATED);
    assert_eq!(sign_up(&app, &username, "manager").await.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_signup_rejects_short_password() {
    let app = TestApp::new();
    let request = json_request(
        Method::POST,
        "/api/v1/user/signup",
        json!({ "username": unique_username(), "password": "short", "user_type": "resident" }),
    );

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = TestApp::new();
    let username = unique_username();
    sign_up(&app, &username, "resident").await;

    let request = json_request(
        Method::POST,
        "/api/v1/user/login",
        json!({ "username": username, "password": "not-the-password" }),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_and_invalid_tokens() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/resident/bills/unpaid")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .router
        .clone()
        .oneshot(request_with_auth(Method::GET, "/api/v1/resident/bills/unpaid", "not.a.jwt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/api/health/live")
        .header("X-Request-ID", "req-123")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-123");
}
