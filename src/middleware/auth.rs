//! Bearer-token gate for protected routes.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};

use crate::{dtos::ErrorResponse, services::SessionClaims, AppState};

/// Validate the `Authorization: Bearer <token>` header and stash the claims
/// in request extensions for downstream extractors. Missing, malformed,
/// expired, and badly-signed tokens all fail the same way.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(unauthorized)?;

    let claims = state.jwt.validate(token).map_err(|_| unauthorized())?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Extractor for the authenticated caller's claims. Only populated behind
/// [`require_auth`].
pub struct AuthUser(pub SessionClaims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionClaims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(unauthorized)
    }
}

fn unauthorized() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "Invalid or expired token".to_string(),
        }),
    )
}
