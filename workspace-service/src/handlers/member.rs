use axum::{
    extract::State,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::{
        member::{MemberRoleRequest, RemoveMemberQuery, TransferOwnershipQuery},
        MessageResponse,
    },
    middleware::AuthUser,
    utils::{PathParam, QueryParams, ValidatedJson},
    AppState,
};

/// Add a user to the workspace, or reactivate a former member
#[utoipa::path(
    post,
    path = "/v1/workspace/member/{id}/add",
    params(("id" = Uuid, Path, description = "Workspace ID")),
    request_body = MemberRoleRequest,
    responses(
        (status = 200, description = "Member added", body = MessageResponse),
        (status = 400, description = "Already an active member, or invalid body", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Insufficient permission", body = ErrorResponse),
        (status = 404, description = "Workspace or user not found", body = ErrorResponse),
        (status = 409, description = "Concurrent modification", body = ErrorResponse)
    ),
    tag = "Members",
    security(("bearer_auth" = []))
)]
pub async fn add_member(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    PathParam(id): PathParam<Uuid>,
    ValidatedJson(req): ValidatedJson<MemberRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .membership_service
        .add_member(id, &identity, &req.email, req.role)
        .await?;
    Ok(Json(MessageResponse::new("Member added successfully")))
}

/// Remove a member (the owner can never be removed)
#[utoipa::path(
    delete,
    path = "/v1/workspace/member/{id}/remove",
    params(("id" = Uuid, Path, description = "Workspace ID"), RemoveMemberQuery),
    responses(
        (status = 200, description = "Member removed", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Insufficient permission or target not a member", body = ErrorResponse),
        (status = 404, description = "Workspace or user not found", body = ErrorResponse)
    ),
    tag = "Members",
    security(("bearer_auth" = []))
)]
pub async fn remove_member(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    PathParam(id): PathParam<Uuid>,
    QueryParams(query): QueryParams<RemoveMemberQuery>,
) -> Result<impl IntoResponse, AppError> {
    state
        .membership_service
        .remove_member(id, &identity, &query.email)
        .await?;
    Ok(Json(MessageResponse::new("Member removed successfully")))
}

/// Change a member's role
#[utoipa::path(
    post,
    path = "/v1/workspace/member/{id}/change-role",
    params(("id" = Uuid, Path, description = "Workspace ID")),
    request_body = MemberRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = MessageResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Insufficient permission or target not a member", body = ErrorResponse),
        (status = 404, description = "Workspace or user not found", body = ErrorResponse)
    ),
    tag = "Members",
    security(("bearer_auth" = []))
)]
pub async fn change_role(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    PathParam(id): PathParam<Uuid>,
    ValidatedJson(req): ValidatedJson<MemberRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .membership_service
        .change_role(id, &identity, &req.email, req.role)
        .await?;
    Ok(Json(MessageResponse::new("Member role updated successfully")))
}

/// Leave the workspace
#[utoipa::path(
    post,
    path = "/v1/workspace/member/{id}/leave",
    params(("id" = Uuid, Path, description = "Workspace ID")),
    responses(
        (status = 200, description = "Left workspace", body = MessageResponse),
        (status = 400, description = "The owner cannot leave", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Workspace not found", body = ErrorResponse)
    ),
    tag = "Members",
    security(("bearer_auth" = []))
)]
pub async fn leave(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.membership_service.leave(id, &identity).await?;
    Ok(Json(MessageResponse::new("Left workspace successfully")))
}

/// Hand ownership to another active member; the caller becomes ADMIN
#[utoipa::path(
    post,
    path = "/v1/workspace/member/{id}/transfer-ownership",
    params(("id" = Uuid, Path, description = "Workspace ID"), TransferOwnershipQuery),
    responses(
        (status = 200, description = "Ownership transferred", body = MessageResponse),
        (status = 400, description = "Cannot transfer to yourself", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not the owner, or new owner not a member", body = ErrorResponse),
        (status = 404, description = "Workspace or user not found", body = ErrorResponse)
    ),
    tag = "Members",
    security(("bearer_auth" = []))
)]
pub async fn transfer_ownership(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    PathParam(id): PathParam<Uuid>,
    QueryParams(query): QueryParams<TransferOwnershipQuery>,
) -> Result<impl IntoResponse, AppError> {
    state
        .membership_service
        .transfer_ownership(id, &identity, &query.new_owner_email)
        .await?;
    Ok(Json(MessageResponse::new("Ownership transferred successfully")))
}

/// Number of active members
#[utoipa::path(
    get,
    path = "/v1/workspace/member/{id}/count-members",
    params(("id" = Uuid, Path, description = "Workspace ID")),
    responses(
        (status = 200, description = "Active member count", body = i64),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Members",
    security(("bearer_auth" = []))
)]
pub async fn count_members(
    State(state): State<AppState>,
    AuthUser(_identity): AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let count = state.membership_service.count_active_members(id).await?;
    Ok(Json(count))
}
