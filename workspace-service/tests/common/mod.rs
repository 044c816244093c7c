//! Shared setup for router-level integration tests.
//!
//! Every test gets its own in-memory store and a cheap Argon2 cost, and drives
//! the full middleware stack with `oneshot`.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use secrecy::SecretString;
use serde_json::Value;
use service_core::config::Config;
use tower::ServiceExt;
use workspace_service::{
    build_router,
    config::{
        DatabaseConfig, Environment, JwtConfig, RateLimitConfig, SecurityConfig, ServiceConfig,
        SwaggerConfig, SwaggerMode,
    },
    db::{InMemoryStore, Store},
    utils::Argon2Hasher,
    AppState,
};

pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        common: Config::default(),
        environment: Environment::Dev,
        service_name: "workspace-service".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: None,
            max_connections: 5,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: SecretString::new("integration-test-secret".to_string()),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 7,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        swagger: SwaggerConfig {
            enabled: SwaggerMode::Public,
        },
        rate_limit: RateLimitConfig {
            auth_attempts: 1000,
            auth_window_seconds: 60,
            global_ip_limit: 1000,
            global_ip_window_seconds: 60,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_store(store: Arc<dyn Store>) -> Self {
        Self::build(test_config(), store).await
    }

    pub async fn with_config(config: ServiceConfig) -> Self {
        Self::build(config, Arc::new(InMemoryStore::new())).await
    }

    async fn build(config: ServiceConfig, store: Arc<dyn Store>) -> Self {
        let hasher = Arc::new(Argon2Hasher::with_cost(8, 1, 1).expect("argon2 params"));
        let state = AppState::new(config, store, hasher, None).expect("app state");
        let router = build_router(state.clone()).await.expect("router");
        Self { router, state }
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
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Signs up and logs in, returning the login token pair.
    pub async fn register(&self, name: &str, email: &str) -> Value {
        let (status, _) = self
            .post(
                "/v1/auth/signup",
                None,
                serde_json::json!({ "name": name, "email": email, "password": "pw1" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "signup {}", email);

        let (status, pair) = self
            .post(
                "/v1/auth/login",
                None,
                serde_json::json!({ "email": email, "password": "pw1" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login {}", email);
        pair
    }

    /// Access token for a freshly registered user.
    pub async fn user(&self, name: &str, email: &str) -> String {
        let pair = self.register(name, email).await;
        pair["access_token"].as_str().expect("access token").to_string()
    }

    pub async fn create_workspace(&self, token: &str, name: &str, kind: &str) -> String {
        let (status, body) = self
            .post(
                "/v1/workspaces/create",
                Some(token),
                serde_json::json!({ "name": name, "workspace_type": kind }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create workspace: {}", body);
        body["workspace_id"].as_str().expect("workspace id").to_string()
    }

    pub async fn add_member(&self, ws: &str, token: &str, email: &str, role: &str) -> StatusCode {
        self.post(
            &format!("/v1/workspace/member/{}/add", ws),
            Some(token),
            serde_json::json!({ "email": email, "role": role }),
        )
        .await
        .0
    }

    pub async fn count(&self, ws: &str, token: &str) -> i64 {
        let (status, body) = self
            .get(&format!("/v1/workspace/member/{}/count-members", ws), token)
            .await;
        assert_eq!(status, StatusCode::OK);
        body.as_i64().expect("integer count")
    }

    pub async fn role_in(&self, ws: &str, token: &str) -> Option<String> {
        let (status, body) = self.get(&format!("/v1/workspaces/{}", ws), token).await;
        if status != StatusCode::OK {
            return None;
        }
        body["caller_role"].as_str().map(str::to_string)
    }
}
