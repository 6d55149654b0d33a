//! Common test utilities for integration tests. The HTTP stack is exercised
//! end to end against in-memory collaborators; no Postgres or SMTP needed.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use std::sync::{Arc, Once};
use std::time::Duration;
use tower::util::ServiceExt;

use fintrack_auth::{
    config::{
        AppConfig, DatabaseConfig, Environment, JwtConfig, OtpConfig, SecurityConfig, SmtpConfig,
    },
    services::{AuthService, InMemoryDirectory, JwtService, ManualClock, MockEmailService, OtpStore},
    AppState,
};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("error")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

const TEST_JWT_SECRET: &str = "test-signing-secret-0123456789abcdef";

pub struct TestApp {
    pub router: Router,
    pub directory: Arc<InMemoryDirectory>,
    pub email: Arc<MockEmailService>,
    pub clock: Arc<ManualClock>,
    pub jwt: JwtService,
}

pub fn spawn_app() -> TestApp {
    init_tracing();

    let config = AppConfig {
        environment: Environment::Dev,
        service_name: "fintrack-auth-test".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        port: 0,
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
        },
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
        },
        otp: OtpConfig {
            expiry_minutes: 5,
            sweep_interval_seconds: 3600,
        },
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            user: "test".to_string(),
            password: "test".to_string(),
            from: "test@localhost".to_string(),
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
    };

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let directory = Arc::new(InMemoryDirectory::new());
    let email = Arc::new(MockEmailService::new());
    let jwt = JwtService::new(TEST_JWT_SECRET, clock.clone());
    let otp_store = Arc::new(OtpStore::new(clock.clone(), Duration::from_secs(3600)));

    let auth_service = AuthService::new(
        directory.clone(),
        email.clone(),
        jwt.clone(),
        otp_store,
        chrono::Duration::minutes(config.otp.expiry_minutes),
    );

    let state = AppState {
        config: Arc::new(config),
        directory: directory.clone(),
        auth_service,
        jwt: jwt.clone(),
    };

    TestApp {
        router: fintrack_auth::build_router(state),
        directory,
        email,
        clock,
        jwt,
    }
}

impl TestApp {
    pub async fn post_json(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("failed to build request");

        self.send(request).await
    }

    pub async fn get(&self, path: &str, bearer: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder
            .body(Body::empty())
            .expect("failed to build request");

        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to read body")
            .to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body is not JSON")
        };

        (status, json)
    }

    /// Drive a full registration through the API, returning the delivered code.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> String {
        let (status, _) = self
            .post_json(
                "/api/v1/auth/register",
                serde_json::json!({ "name": name, "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        self.email
            .last_code_for(email)
            .expect("no verification code delivered")
    }

    /// Register and verify, returning the session token.
    pub async fn register_verified(&self, name: &str, email: &str, password: &str) -> String {
        let code = self.register(name, email, password).await;
        let (status, body) = self
            .post_json(
                "/api/v1/auth/verify-otp",
                serde_json::json!({ "email": email, "code": code }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["token"]
            .as_str()
            .expect("no token in verify response")
            .to_string()
    }
}
