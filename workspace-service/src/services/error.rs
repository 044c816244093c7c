use service_core::error::AppError;
use thiserror::Error;

use crate::db::StoreError;

/// Failures a core operation can report. Every variant is user-facing except
/// `Internal`, whose detail is logged and never returned.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("{0}")]
    InsufficientPermission(String),

    #[error("Workspace not found")]
    WorkspaceNotFound,

    #[error("{0}")]
    NotAMember(String),

    #[error("User not found")]
    UserNotFound,

    #[error("User is already an active member of this workspace")]
    ActiveMemberConflict,

    #[error("Owner cannot leave the workspace; transfer ownership first")]
    OwnerCannotLeave,

    #[error("Email already registered")]
    DuplicateIdentity,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid email or password")]
    InvalidCredential,

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("The resource was modified concurrently, please retry")]
    Conflict,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl DomainError {
    pub fn insufficient(msg: &str) -> Self {
        DomainError::InsufficientPermission(msg.to_string())
    }

    pub fn not_a_member(msg: &str) -> Self {
        DomainError::NotAMember(msg.to_string())
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(detail) => {
                tracing::warn!(detail = %detail, "Concurrent modification detected");
                DomainError::Conflict
            }
            StoreError::Duplicate(_) => DomainError::DuplicateIdentity,
            StoreError::Backend(e) => DomainError::Internal(e),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        let message = anyhow::anyhow!(err.to_string());
        match err {
            DomainError::InsufficientPermission(_) | DomainError::NotAMember(_) => {
                AppError::Forbidden(message)
            }
            DomainError::WorkspaceNotFound | DomainError::UserNotFound => {
                AppError::NotFound(message)
            }
            DomainError::ActiveMemberConflict
            | DomainError::OwnerCannotLeave
            | DomainError::ValidationFailed(_) => AppError::BadRequest(message),
            DomainError::DuplicateIdentity | DomainError::Conflict => AppError::Conflict(message),
            DomainError::InvalidToken | DomainError::InvalidCredential => {
                AppError::Unauthorized(message)
            }
            DomainError::Internal(e) => AppError::InternalError(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn taxonomy_maps_to_fixed_statuses() {
        let cases = [
            (DomainError::insufficient("no"), StatusCode::FORBIDDEN),
            (DomainError::WorkspaceNotFound, StatusCode::NOT_FOUND),
            (DomainError::not_a_member("no"), StatusCode::FORBIDDEN),
            (DomainError::UserNotFound, StatusCode::NOT_FOUND),
            (DomainError::ActiveMemberConflict, StatusCode::BAD_REQUEST),
            (DomainError::OwnerCannotLeave, StatusCode::BAD_REQUEST),
            (DomainError::DuplicateIdentity, StatusCode::CONFLICT),
            (DomainError::InvalidToken, StatusCode::UNAUTHORIZED),
            (DomainError::InvalidCredential, StatusCode::UNAUTHORIZED),
            (DomainError::ValidationFailed("x".into()), StatusCode::BAD_REQUEST),
            (DomainError::Conflict, StatusCode::CONFLICT),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn internal_errors_become_500() {
        let err = DomainError::from(StoreError::Backend(anyhow::anyhow!("pool closed")));
        assert_eq!(
            AppError::from(err).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
