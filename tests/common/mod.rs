#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tally::{
    auth::{AuthService, RegisterRequest},
    build_router,
    config::AppConfig,
    db, AppState,
};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str =
    "integration-test-secret-key-that-is-long-enough-for-hs256-signing-0123";

/// An application backed by a throwaway SQLite file, with one registered account.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub user_id: Uuid,
    token: String,
    _db_dir: TempDir,
}

/// Status plus parsed JSON body (`Value::Null` for an empty body).
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    /// The `data` field of an `ApiResponse` envelope.
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Build with a tweaked configuration, e.g. permissive status transitions.
    pub async fn with_config(customize: impl FnOnce(&mut AppConfig)) -> Self {
        let db_dir = tempfile::tempdir().expect("temp dir for sqlite");
        let db_path = db_dir.path().join("tally_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        customize(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let (user_id, token) = register(&state.auth, "maker@example.com").await;
        let router = build_router(state.clone());

        Self {
            router,
            state,
            user_id,
            token,
            _db_dir: db_dir,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Registers another account and returns its bearer token.
    pub async fn second_account(&self, email: &str) -> String {
        register(&self.state.auth, email).await.1
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request");

        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse { status, body }
    }

    /// Convenience helper for authenticated JSON requests as the default account.
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        self.request(method, uri, body, Some(self.token())).await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::PATCH, uri, Some(body)).await
    }

    /// Creates a material and returns its id.
    pub async fn seed_material(&self, name: &str, color: &str, size: &str, quantity: i32) -> String {
        let response = self
            .post(
                "/api/v1/materials",
                serde_json::json!({
                    "name": name,
                    "color": color,
                    "size": size,
                    "quantity": quantity,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        id_of(response.data())
    }

    /// Creates a PENDING order needing `(material id, quantity)` lines.
    pub async fn seed_order(&self, name: &str, lines: &[(&str, i32)]) -> String {
        let items: Vec<Value> = lines
            .iter()
            .map(|(material_id, quantity)| {
                serde_json::json!({ "materialId": material_id, "quantityNeeded": quantity })
            })
            .collect();
        let response = self
            .post(
                "/api/v1/orders",
                serde_json::json!({ "name": name, "orderItems": items }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        id_of(response.data())
    }
}

pub fn id_of(value: &Value) -> String {
    value["id"]
        .as_str()
        .expect("response should carry an id")
        .to_string()
}

async fn register(auth: &AuthService, email: &str) -> (Uuid, String) {
    let account = auth
        .register(RegisterRequest {
            email: email.to_string(),
            password: "correct horse battery".to_string(),
            name: Some("Test Maker".to_string()),
        })
        .await
        .expect("register test account");
    let token = auth
        .generate_token(&account)
        .expect("issue test token")
        .access_token;
    (account.id, token)
}
