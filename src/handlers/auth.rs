use axum::{extract::State, http::StatusCode, Json};

use crate::{
    dtos::{
        auth::{
            AuthResponse, LoginRequest, MessageResponse, RegisterRequest, ResendOtpRequest,
            VerifyOtpRequest,
        },
        ErrorResponse,
    },
    services::ServiceError,
    utils::ValidatedJson,
    AppState,
};

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, Json<ErrorResponse>)> {
    state
        .auth_service
        .register(req)
        .await
        .map_err(|e| reject(e, StatusCode::BAD_REQUEST))?;

    Ok(Json(MessageResponse {
        message: "Registration successful. Check your email for the verification code".to_string(),
    }))
}

/// POST /api/v1/auth/verify-otp
pub async fn verify_otp(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<VerifyOtpRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, Json<ErrorResponse>)> {
    let response = state
        .auth_service
        .verify_code(req)
        .await
        .map_err(|e| reject(e, StatusCode::BAD_REQUEST))?;

    Ok(Json(response))
}

/// POST /api/v1/auth/resend-otp
pub async fn resend_otp(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ResendOtpRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, Json<ErrorResponse>)> {
    state
        .auth_service
        .resend_code(req)
        .await
        .map_err(|e| reject(e, StatusCode::BAD_REQUEST))?;

    Ok(Json(MessageResponse {
        message: "Verification code sent to your email".to_string(),
    }))
}

/// POST /api/v1/auth/login
///
/// All login failures come back as 401, and credential failures share one
/// message regardless of whether the email exists.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, Json<ErrorResponse>)> {
    let response = state
        .auth_service
        .login(req)
        .await
        .map_err(|e| reject(e, StatusCode::UNAUTHORIZED))?;

    Ok(Json(response))
}

/// Map an engine error to a response. Infrastructure failures are logged in
/// full and replaced with a generic message; domain errors pass through.
fn reject(err: ServiceError, status: StatusCode) -> (StatusCode, Json<ErrorResponse>) {
    match &err {
        ServiceError::Database(_) | ServiceError::Internal(_) => {
            tracing::error!(error = %err, "Request failed");
            (
                status,
                Json(ErrorResponse {
                    error: "Internal server error".to_string(),
                }),
            )
        }
        _ => (
            status,
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        ),
    }
}
