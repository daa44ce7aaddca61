use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::{routes::api_routes, store::MemoryStore, AppState};

/// Router over a fresh in-memory store, driven request by request.
pub struct TestApp {
    router: Router,
}

impl TestApp {
    pub const SECRET: &'static str = "test-secret";
    pub const PASSWORD: &'static str = "password123";

    pub fn new() -> Self {
        let state = AppState {
            store: Arc::new(MemoryStore::new()),
            jwt_secret: Self::SECRET.to_string(),
            jwt_expiry_days: 30,
            bcrypt_cost: 4,
        };
        Self {
            router: api_routes(state),
        }
    }

    pub async fn request(
        &self,
        method: Method,
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
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        self.send(request).await
    }

    /// Sends a request as built by the caller; the body is parsed as JSON
    /// when it is JSON and kept as text otherwise.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }

    async fn register(&self, uri: &str, email: &str) -> String {
        let (status, body) = self
            .post(
                uri,
                None,
                json!({"name": "Test User", "email": email, "password": Self::PASSWORD}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn register_candidate(&self, email: &str) -> String {
        self.register("/api/auth/register", email).await
    }

    pub async fn register_admin(&self, email: &str) -> String {
        self.register("/api/auth/admin/register", email).await
    }

    pub fn job_body(title: &str) -> Value {
        json!({
            "title": title,
            "company": "Acme",
            "location": "Remote",
            "description": "A job worth having",
            "requirements": ["Rust"],
            "salary": "90k"
        })
    }

    /// Posts a job and returns its id.
    pub async fn create_job(&self, token: &str, title: &str) -> String {
        let (status, body) = self.post("/api/jobs", Some(token), Self::job_body(title)).await;
        assert_eq!(status, StatusCode::CREATED, "create job failed: {}", body);
        body["_id"].as_str().unwrap().to_string()
    }

    /// Applies to a job and returns the application id.
    pub async fn apply(&self, token: &str, job_id: &str) -> String {
        let (status, body) = self
            .post(
                "/api/applications",
                Some(token),
                json!({"jobId": job_id, "resume": "https://cv.example.com"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "apply failed: {}", body);
        body["_id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_should_answer_health_probe() {
    let app = TestApp::new();
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn test_should_reject_token_of_deleted_or_unknown_user() {
    let app = TestApp::new();
    let other = TestApp::new();
    // signed with the same secret but the account only exists in the other store
    let token = other.register_candidate("ghost@example.com").await;

    let (status, body) = app.get("/api/applications", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Please authenticate");
}
