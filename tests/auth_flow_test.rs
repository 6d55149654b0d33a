//! End-to-end HTTP tests for the registration, verification, and login flow.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::spawn_app;

#[tokio::test]
async fn register_verify_login_happy_path() {
    let app = spawn_app();

    let (status, body) = app
        .post_json(
            "/api/v1/auth/register",
            json!({ "name": "Ann", "email": "ann@example.com", "password": "pw123456" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("verification"));

    // Stored unverified, code delivered out of band.
    let user = app.directory.get("ann@example.com").unwrap();
    assert!(!user.is_verified);
    let code = app.email.last_code_for("ann@example.com").unwrap();

    let (status, body) = app
        .post_json(
            "/api/v1/auth/verify-otp",
            json!({ "email": "ann@example.com", "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["user"]["is_verified"].as_bool().unwrap());
    assert!(!body["token"].as_str().unwrap().is_empty());

    let (status, body) = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": "ann@example.com", "password": "pw123456" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();
    let claims = app.jwt.validate(token).unwrap();
    assert_eq!(claims.email, "ann@example.com");

    // Responses never expose the stored hash.
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn register_existing_verified_email_is_rejected() {
    let app = spawn_app();
    app.register_verified("Ann", "ann@example.com", "pw123456")
        .await;
    let creates_before = app.directory.create_calls();

    let (status, body) = app
        .post_json(
            "/api/v1/auth/register",
            json!({ "name": "Ann", "email": "ann@example.com", "password": "pw123456" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email already registered");
    assert_eq!(app.directory.create_calls(), creates_before);
}

#[tokio::test]
async fn register_pending_email_reissues_code_without_new_row() {
    let app = spawn_app();
    app.register("Ann", "ann@example.com", "pw123456").await;

    let (status, _) = app
        .post_json(
            "/api/v1/auth/register",
            json!({ "name": "Ann", "email": "ann@example.com", "password": "pw123456" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.directory.create_calls(), 1);
    assert_eq!(app.email.sent().len(), 2);
}

#[tokio::test]
async fn register_rejects_invalid_payloads() {
    let app = spawn_app();

    for payload in [
        json!({ "name": "A", "email": "ann@example.com", "password": "pw123456" }),
        json!({ "name": "Ann", "email": "not-an-email", "password": "pw123456" }),
        json!({ "name": "Ann", "email": "ann@example.com", "password": "short" }),
        json!({ "email": "ann@example.com" }),
    ] {
        let (status, body) = app.post_json("/api/v1/auth/register", payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    assert_eq!(app.directory.create_calls(), 0);
}

#[tokio::test]
async fn verify_with_wrong_code_fails_and_code_survives() {
    let app = spawn_app();
    let code = app.register("Ann", "ann@example.com", "pw123456").await;
    let wrong = if code == "000000" { "000001" } else { "000000" };

    let (status, body) = app
        .post_json(
            "/api/v1/auth/verify-otp",
            json!({ "email": "ann@example.com", "code": wrong }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid or expired verification code");

    // The real code is still usable after the failed attempt.
    let (status, _) = app
        .post_json(
            "/api/v1/auth/verify-otp",
            json!({ "email": "ann@example.com", "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn verify_code_is_single_use() {
    let app = spawn_app();
    let code = app.register("Ann", "ann@example.com", "pw123456").await;

    let (status, _) = app
        .post_json(
            "/api/v1/auth/verify-otp",
            json!({ "email": "ann@example.com", "code": code.clone() }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post_json(
            "/api/v1/auth/verify-otp",
            json!({ "email": "ann@example.com", "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verify_after_expiry_fails() {
    let app = spawn_app();
    let code = app.register("Ann", "ann@example.com", "pw123456").await;

    app.clock.advance(chrono::Duration::minutes(6));

    let (status, body) = app
        .post_json(
            "/api/v1/auth/verify-otp",
            json!({ "email": "ann@example.com", "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid or expired verification code");
}

#[tokio::test]
async fn resend_issues_fresh_code_for_pending_account() {
    let app = spawn_app();
    app.register("Ann", "ann@example.com", "pw123456").await;

    let (status, _) = app
        .post_json(
            "/api/v1/auth/resend-otp",
            json!({ "email": "ann@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // The latest code verifies.
    let code = app.email.last_code_for("ann@example.com").unwrap();
    let (status, _) = app
        .post_json(
            "/api/v1/auth/verify-otp",
            json!({ "email": "ann@example.com", "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn resend_fails_for_unknown_and_verified_accounts() {
    let app = spawn_app();

    let (status, body) = app
        .post_json(
            "/api/v1/auth/resend-otp",
            json!({ "email": "ghost@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User not found");

    app.register_verified("Ann", "ann@example.com", "pw123456")
        .await;
    let (status, body) = app
        .post_json(
            "/api/v1/auth/resend-otp",
            json!({ "email": "ann@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Account already verified");
}

#[tokio::test]
async fn login_failures_do_not_reveal_which_part_was_wrong() {
    let app = spawn_app();
    app.register_verified("Ann", "ann@example.com", "pw123456")
        .await;

    let (missing_status, missing_body) = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": "ghost@example.com", "password": "pw123456" }),
        )
        .await;
    let (wrong_status, wrong_body) = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": "ann@example.com", "password": "wrong-password" }),
        )
        .await;

    assert_eq!(missing_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing_body["error"], wrong_body["error"]);
    assert_eq!(missing_body["error"], "Invalid email or password");
}

#[tokio::test]
async fn login_before_verification_fails_with_distinct_error() {
    let app = spawn_app();
    app.register("Ann", "ann@example.com", "pw123456").await;

    let (status, body) = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": "ann@example.com", "password": "pw123456" }),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_ne!(body["error"], "Invalid email or password");
    assert!(body["error"].as_str().unwrap().contains("not verified"));
}

#[tokio::test]
async fn delivery_failure_leaves_account_recoverable_via_resend() {
    let app = spawn_app();
    app.email.set_failing(true);

    let (status, _) = app
        .post_json(
            "/api/v1/auth/register",
            json!({ "name": "Ann", "email": "ann@example.com", "password": "pw123456" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The account was committed before delivery failed.
    assert!(app.directory.get("ann@example.com").is_some());

    app.email.set_failing(false);
    let (status, _) = app
        .post_json(
            "/api/v1/auth/resend-otp",
            json!({ "email": "ann@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let code = app.email.last_code_for("ann@example.com").unwrap();
    let (status, _) = app
        .post_json(
            "/api/v1/auth/verify-otp",
            json!({ "email": "ann@example.com", "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn protected_route_requires_valid_bearer_token() {
    let app = spawn_app();
    let token = app
        .register_verified("Ann", "ann@example.com", "pw123456")
        .await;

    // No header.
    let (status, _) = app.get("/api/v1/users/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Garbage token.
    let (status, _) = app.get("/api/v1/users/me", Some("not-a-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Valid token.
    let (status, body) = app.get("/api/v1/users/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ann@example.com");
    assert!(body["is_verified"].as_bool().unwrap());
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn expired_session_token_is_rejected() {
    let app = spawn_app();
    let token = app
        .register_verified("Ann", "ann@example.com", "pw123456")
        .await;

    let (status, _) = app.get("/api/v1/users/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    // Past the 24h session lifetime the same token stops working.
    app.clock.advance(chrono::Duration::hours(25));
    let (status, _) = app.get("/api/v1/users/me", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_check_reports_service_identity() {
    let app = spawn_app();
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "fintrack-auth-test");
}
