mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::json;
use tokio::task::JoinSet;

use common::TestApp;

#[tokio::test]
async fn register_then_login_issues_a_working_token() {
    let app = TestApp::new().await;

    let registered = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({ "email": "New.Seller@Example.com", "password": "s3cure-pass", "name": "Nia" })),
            None,
        )
        .await;
    assert_eq!(registered.status, StatusCode::CREATED, "{}", registered.body);
    assert_eq!(registered.body["success"], true);
    assert_eq!(registered.data()["email"], "new.seller@example.com");
    assert!(registered.data().get("passwordHash").is_none());

    let login = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": "new.seller@example.com", "password": "s3cure-pass" })),
            None,
        )
        .await;
    assert_eq!(login.status, StatusCode::OK, "{}", login.body);
    let token = login.data()["access_token"]
        .as_str()
        .expect("token")
        .to_string();

    let me = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(&token))
        .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.data()["name"], "Nia");

    let materials = app
        .request(Method::GET, "/api/v1/materials", None, Some(&token))
        .await;
    assert_eq!(materials.status, StatusCode::OK);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({ "email": "MAKER@example.com", "password": "another-pass" })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"], "Conflict");
    assert_eq!(response.body["code"], "AUTH_EMAIL_TAKEN");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_for_one_email_yield_a_single_account() {
    let app = Arc::new(TestApp::new().await);

    let mut attempts = JoinSet::new();
    for _ in 0..6 {
        let app = app.clone();
        attempts.spawn(async move {
            app.request(
                Method::POST,
                "/api/v1/auth/register",
                Some(json!({ "email": "rush@example.com", "password": "same-password" })),
                None,
            )
            .await
            .status
        });
    }

    let mut statuses = Vec::new();
    while let Some(status) = attempts.join_next().await {
        statuses.push(status.expect("registration task panicked"));
    }

    let created = statuses.iter().filter(|s| **s == StatusCode::CREATED).count();
    let conflicts = statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count();
    assert_eq!(created, 1, "{:?}", statuses);
    assert_eq!(conflicts, 5, "{:?}", statuses);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": "maker@example.com", "password": "not-the-password" })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn resource_routes_require_a_valid_bearer_token() {
    let app = TestApp::new().await;

    for uri in [
        "/api/v1/materials",
        "/api/v1/materials/requirements",
        "/api/v1/orders",
        "/api/v1/products",
        "/api/v1/designs",
    ] {
        let anonymous = app.request(Method::GET, uri, None, None).await;
        assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(anonymous.body["error"], "Unauthorized");
        assert_eq!(anonymous.body["code"], "AUTH_MISSING");
        assert!(anonymous.body["timestamp"].is_string());

        let forged = app
            .request(Method::GET, uri, None, Some("not.a.jwt"))
            .await;
        assert_eq!(forged.status, StatusCode::UNAUTHORIZED, "{}", uri);
    }
}

#[tokio::test]
async fn health_and_status_are_public() {
    let app = TestApp::new().await;

    let health = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["data"]["checks"]["database"], "healthy");

    let status = app.request(Method::GET, "/api/v1/status", None, None).await;
    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(status.body["data"]["service"], "tally");
}
