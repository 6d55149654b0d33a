use axum::{extract::State, http::StatusCode, Json};

use crate::{
    dtos::ErrorResponse, middleware::AuthUser, models::UserResponse, services::ServiceError,
    AppState,
};

/// GET /api/v1/users/me
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<UserResponse>, (StatusCode, Json<ErrorResponse>)> {
    let user = state
        .directory
        .find_by_email(&claims.email)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to load user");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Internal server error".to_string(),
                }),
            )
        })?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: ServiceError::UserNotFound.to_string(),
            }),
        ))?;

    Ok(Json(user.sanitized()))
}
