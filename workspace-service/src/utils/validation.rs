use std::borrow::Cow;

use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use validator::{Validate, ValidationError};

use crate::services::DomainError;

const WORKSPACE_NAME_MIN: usize = 3;
const WORKSPACE_NAME_MAX: usize = 50;

/// JSON body extractor that runs `validator` rules before the handler.
///
/// Parse failures and rule violations are both `ValidationFailed` (400).
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| DomainError::ValidationFailed(e.body_text()))?;

        value
            .validate()
            .map_err(|e| DomainError::ValidationFailed(e.to_string()))?;

        Ok(ValidatedJson(value))
    }
}

/// `Path` with rejections reported as `ValidationFailed` JSON.
pub struct PathParam<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| DomainError::ValidationFailed(e.body_text()))?;
        Ok(PathParam(value))
    }
}

/// `Query` with rejections reported as `ValidationFailed` JSON.
pub struct QueryParams<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| DomainError::ValidationFailed(e.body_text()))?;
        Ok(QueryParams(value))
    }
}

fn rule(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Workspace names are measured after trimming, which is how they are stored.
pub fn validate_workspace_name(name: &str) -> Result<(), ValidationError> {
    let len = name.trim().chars().count();
    if !(WORKSPACE_NAME_MIN..=WORKSPACE_NAME_MAX).contains(&len) {
        return Err(rule(
            "workspace_name",
            "Name must be between 3 and 50 characters",
        ));
    }
    Ok(())
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(rule("blank", "Value must not be blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_name_is_measured_trimmed() {
        assert!(validate_workspace_name("Eng").is_ok());
        assert!(validate_workspace_name("  Eng  ").is_ok());
        assert!(validate_workspace_name("     ").is_err());
        assert!(validate_workspace_name("   ab   ").is_err());
        assert!(validate_workspace_name(&"x".repeat(51)).is_err());
    }

    #[test]
    fn blank_values_are_rejected() {
        assert!(validate_not_blank("Aspen").is_ok());
        assert!(validate_not_blank(" \t ").is_err());
        assert!(validate_not_blank("").is_err());
    }
}
