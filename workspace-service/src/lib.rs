pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{ServiceConfig, SwaggerMode};
use crate::db::Store;
use crate::services::{CredentialService, JwtService, MembershipService, WorkspaceService};
use crate::utils::SecretHasher;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::signup,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::workspace::create_workspace,
        handlers::workspace::delete_workspace,
        handlers::workspace::list_workspaces,
        handlers::workspace::get_workspace,
        handlers::workspace::update_workspace,
        handlers::member::add_member,
        handlers::member::remove_member,
        handlers::member::change_role,
        handlers::member::leave,
        handlers::member::transfer_ownership,
        handlers::member::count_members,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::MessageResponse,
            dtos::auth::SignupRequest,
            dtos::auth::LoginRequest,
            dtos::auth::RefreshRequest,
            dtos::workspace::WorkspaceRequest,
            dtos::workspace::CreateWorkspaceResponse,
            dtos::member::MemberRoleRequest,
            services::TokenPair,
            models::Role,
            models::WorkspaceType,
            models::WorkspaceDetails,
            models::OwnerInfo,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Signup, login and token rotation"),
        (name = "Workspaces", description = "Workspace lifecycle"),
        (name = "Members", description = "Workspace membership and roles"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: ServiceConfig,
    pub store: Arc<dyn Store>,
    pub jwt: JwtService,
    pub credential_service: CredentialService,
    pub workspace_service: WorkspaceService,
    pub membership_service: MembershipService,
    pub metrics: Option<PrometheusHandle>,
    pub auth_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wires every service around one store.
    pub fn new(
        config: ServiceConfig,
        store: Arc<dyn Store>,
        hasher: Arc<dyn SecretHasher>,
        metrics: Option<PrometheusHandle>,
    ) -> Result<Self, anyhow::Error> {
        let jwt = JwtService::new(&config.jwt)?;

        let auth_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.auth_attempts,
            config.rate_limit.auth_window_seconds,
        );
        let ip_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.global_ip_limit,
            config.rate_limit.global_ip_window_seconds,
        );

        Ok(Self {
            credential_service: CredentialService::new(store.clone(), jwt.clone(), hasher),
            workspace_service: WorkspaceService::new(store.clone()),
            membership_service: MembershipService::new(store.clone()),
            config,
            store,
            jwt,
            metrics,
            auth_rate_limiter,
            ip_rate_limiter,
        })
    }
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    // Always open, but rate limited per IP.
    let auth_routes = Router::new()
        .route("/v1/auth/signup", post(handlers::auth::signup))
        .route("/v1/auth/login", post(handlers::auth::login))
        .route("/v1/auth/refresh", post(handlers::auth::refresh))
        .layer(from_fn_with_state(
            state.auth_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let workspace_routes = Router::new()
        .route("/v1/workspaces/create", post(handlers::workspace::create_workspace))
        .route(
            "/v1/workspaces/delete/:id",
            delete(handlers::workspace::delete_workspace),
        )
        .route("/v1/workspaces/all", get(handlers::workspace::list_workspaces))
        .route("/v1/workspaces/:id", get(handlers::workspace::get_workspace))
        .route(
            "/v1/workspaces/update/:id",
            put(handlers::workspace::update_workspace),
        );

    let member_routes = Router::new()
        .route("/v1/workspace/member/:id/add", post(handlers::member::add_member))
        .route(
            "/v1/workspace/member/:id/remove",
            delete(handlers::member::remove_member),
        )
        .route(
            "/v1/workspace/member/:id/change-role",
            post(handlers::member::change_role),
        )
        .route("/v1/workspace/member/:id/leave", post(handlers::member::leave))
        .route(
            "/v1/workspace/member/:id/transfer-ownership",
            post(handlers::member::transfer_ownership),
        )
        .route(
            "/v1/workspace/member/:id/count-members",
            get(handlers::member::count_members),
        );

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics));

    if state.config.swagger.enabled == SwaggerMode::Public {
        app = app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );
    }

    let origins = &state.config.security.allowed_origins;
    let allowed_origins = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        origins
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>().map_err(|e| {
                    AppError::ConfigError(anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
                })
            })
            .collect::<Result<Vec<HeaderValue>, AppError>>()?
            .into()
    };

    let app = app
        .merge(auth_routes)
        .merge(workspace_routes)
        .merge(member_routes)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::resolve_identity,
        ))
        .with_state(state.clone())
        .layer(from_fn_with_state(
            state.ip_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    user_id = tracing::field::Empty,
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        );

    Ok(app)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Store is unreachable")
    ),
    tag = "Observability"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_up = match state.store.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Store health check failed");
            false
        }
    };

    let (status, health, store) = if store_up {
        (StatusCode::OK, "healthy", "up")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", "down")
    };

    (
        status,
        Json(serde_json::json!({
            "status": health,
            "service": state.config.service_name,
            "version": state.config.service_version,
            "environment": format!("{:?}", state.config.environment),
            "checks": {
                "store": store
            }
        })),
    )
}
