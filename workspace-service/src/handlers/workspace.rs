use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::{workspace::CreateWorkspaceResponse, workspace::WorkspaceRequest, MessageResponse},
    middleware::AuthUser,
    utils::{PathParam, ValidatedJson},
    AppState,
};

/// Create a workspace owned by the caller
#[utoipa::path(
    post,
    path = "/v1/workspaces/create",
    request_body = WorkspaceRequest,
    responses(
        (status = 200, description = "Workspace created", body = CreateWorkspaceResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Workspaces",
    security(("bearer_auth" = []))
)]
pub async fn create_workspace(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ValidatedJson(req): ValidatedJson<WorkspaceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let workspace_id = state
        .workspace_service
        .create(&req.name, req.workspace_type, &identity)
        .await?;

    Ok((
        StatusCode::OK,
        Json(CreateWorkspaceResponse {
            message: "Workspace created successfully".to_string(),
            workspace_id,
        }),
    ))
}

/// Soft delete a workspace (owner only)
#[utoipa::path(
    delete,
    path = "/v1/workspaces/delete/{id}",
    params(("id" = Uuid, Path, description = "Workspace ID")),
    responses(
        (status = 200, description = "Workspace deleted", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Workspace not found", body = ErrorResponse)
    ),
    tag = "Workspaces",
    security(("bearer_auth" = []))
)]
pub async fn delete_workspace(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.workspace_service.soft_delete(id, &identity).await?;
    Ok(Json(MessageResponse::new("Workspace deleted successfully")))
}

/// List every workspace the caller is an active member of
#[utoipa::path(
    get,
    path = "/v1/workspaces/all",
    responses(
        (status = 200, description = "Workspaces", body = [WorkspaceDetails]),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Workspaces",
    security(("bearer_auth" = []))
)]
pub async fn list_workspaces(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let workspaces = state.workspace_service.list_for_user(&identity).await?;
    Ok(Json(workspaces))
}

/// Workspace details as seen by the caller
#[utoipa::path(
    get,
    path = "/v1/workspaces/{id}",
    params(("id" = Uuid, Path, description = "Workspace ID")),
    responses(
        (status = 200, description = "Workspace details", body = WorkspaceDetails),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not a member", body = ErrorResponse)
    ),
    tag = "Workspaces",
    security(("bearer_auth" = []))
)]
pub async fn get_workspace(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let details = state.workspace_service.get_details(id, &identity).await?;
    Ok(Json(details))
}

/// Rename or re-type a workspace (owner or admin)
#[utoipa::path(
    put,
    path = "/v1/workspaces/update/{id}",
    params(("id" = Uuid, Path, description = "Workspace ID")),
    request_body = WorkspaceRequest,
    responses(
        (status = 200, description = "Workspace updated", body = MessageResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Insufficient permission", body = ErrorResponse),
        (status = 404, description = "Workspace not found", body = ErrorResponse)
    ),
    tag = "Workspaces",
    security(("bearer_auth" = []))
)]
pub async fn update_workspace(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    PathParam(id): PathParam<Uuid>,
    ValidatedJson(req): ValidatedJson<WorkspaceRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .workspace_service
        .update(id, &identity, &req.name, req.workspace_type)
        .await?;
    Ok(Json(MessageResponse::new("Workspace updated successfully")))
}
