use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use service_core::error::AppError;

use crate::{models::Identity, services::TokenUse, AppState};

/// Attaches the caller's [`Identity`] when a valid access token is presented.
///
/// Never rejects: a missing, malformed or expired token leaves the request
/// anonymous and protected handlers answer 401 through [`AuthUser`].
pub async fn resolve_identity(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(TypedHeader(Authorization(bearer))) = bearer {
        match state.jwt.validate(bearer.token(), TokenUse::Access) {
            Some(claims) => {
                tracing::Span::current().record("user_id", tracing::field::display(claims.sub));
                req.extensions_mut().insert(claims.identity());
            }
            None => tracing::debug!("Bearer token rejected, continuing anonymously"),
        }
    }

    next.run(req).await
}

/// Extractor for handlers that require an authenticated caller.
pub struct AuthUser(pub Identity);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Authentication required")))
    }
}
