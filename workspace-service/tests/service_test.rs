mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::{test_config, TestApp};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_health_reports_store() {
    let app = TestApp::new().await;
    let (status, body) = app.request(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["store"], "up");
    assert_eq!(body["service"], "workspace-service");
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let app = TestApp::new().await;
    let (status, doc) = app
        .request(Method::GET, "/.well-known/openapi.json", None, None)
        .await;

    assert_eq!(status, StatusCode::OK);
    let paths = doc["paths"].as_object().unwrap();
    for path in [
        "/v1/auth/signup",
        "/v1/auth/refresh",
        "/v1/workspaces/{id}",
        "/v1/workspace/member/{id}/transfer-ownership",
    ] {
        assert!(paths.contains_key(path), "missing {}", path);
    }
    assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());
}

#[tokio::test]
async fn test_responses_carry_request_id_and_security_headers() {
    let app = TestApp::new().await;
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-request-id"], "req-123");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
}

#[tokio::test]
async fn test_metrics_unavailable_without_recorder() {
    let app = TestApp::new().await;
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_auth_routes_are_rate_limited_per_ip() {
    let mut config = test_config();
    config.rate_limit.auth_attempts = 2;
    let app = TestApp::with_config(config).await;

    let login = |ip: &str| {
        Request::builder()
            .method(Method::POST)
            .uri("/v1/auth/login")
            .header("content-type", "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(
                json!({ "email": "nobody@x.com", "password": "pw" }).to_string(),
            ))
            .unwrap()
    };

    for _ in 0..2 {
        let res = app.router.clone().oneshot(login("10.1.1.1")).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    let res = app.router.clone().oneshot(login("10.1.1.1")).await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(res.headers().contains_key("retry-after"));

    let res = app.router.clone().oneshot(login("10.1.1.2")).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = TestApp::new().await;
    let (status, _) = app.request(Method::GET, "/v1/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
