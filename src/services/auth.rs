//! The authentication engine: registration gated by a one-time code,
//! resend, verification, and login.
//!
//! Per identity the flow is `unregistered -> pending_verification ->
//! verified`, with no backward transition. All collaborators are injected so
//! the engine can be driven with fakes.

use std::sync::Arc;

use crate::{
    dtos::auth::{AuthResponse, LoginRequest, RegisterRequest, ResendOtpRequest, VerifyOtpRequest},
    models::User,
    services::{
        otp::{generate_code, OtpStore},
        EmailProvider, JwtService, ServiceError, UserDirectory,
    },
    utils::{hash_password, verify_password, Password, PasswordHashString},
};

#[derive(Clone)]
pub struct AuthService {
    directory: Arc<dyn UserDirectory>,
    email: Arc<dyn EmailProvider>,
    jwt: JwtService,
    otp_store: Arc<OtpStore>,
    otp_ttl: chrono::Duration,
}

impl AuthService {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        email: Arc<dyn EmailProvider>,
        jwt: JwtService,
        otp_store: Arc<OtpStore>,
        otp_ttl: chrono::Duration,
    ) -> Self {
        Self {
            directory,
            email,
            jwt,
            otp_store,
            otp_ttl,
        }
    }

    /// Register a new account and dispatch a verification code.
    ///
    /// Re-registering an email that is pending verification never creates a
    /// second row; it re-issues the code instead. A verified email is
    /// rejected outright, before any create.
    pub async fn register(&self, req: RegisterRequest) -> Result<(), ServiceError> {
        if let Some(existing) = self.directory.find_by_email(&req.email).await? {
            if existing.is_verified {
                return Err(ServiceError::AlreadyRegistered);
            }
            // Pending verification: refresh the code, keep the existing row.
            return self.send_code(&existing.name, &existing.email).await;
        }

        let password_hash = hash_password(&Password::new(req.password)).map_err(|e| {
            ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e))
        })?;

        let user = User::new(req.name, req.email, password_hash.into_string());
        self.directory.create(&user).await?;

        tracing::info!(user_id = %user.id, "User registered, pending verification");

        // The user row is committed at this point. If delivery fails the
        // caller sees the error but the account stays registered-unnotified;
        // resend is the recovery path.
        self.send_code(&user.name, &user.email).await
    }

    /// Re-issue the verification code for a pending account.
    pub async fn resend_code(&self, req: ResendOtpRequest) -> Result<(), ServiceError> {
        let user = self
            .directory
            .find_by_email(&req.email)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        if user.is_verified {
            return Err(ServiceError::AlreadyVerified);
        }

        self.send_code(&user.name, &user.email).await
    }

    /// Consume a verification code, flip the account to verified, and issue
    /// a session token.
    pub async fn verify_code(&self, req: VerifyOtpRequest) -> Result<AuthResponse, ServiceError> {
        if !self.otp_store.verify(&req.email, &req.code) {
            return Err(ServiceError::InvalidOrExpiredCode);
        }

        // The code matched but the account may have vanished since issuance;
        // that is a distinct, later-stage failure.
        let mut user = self
            .directory
            .find_by_email(&req.email)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        self.directory.set_verified(user.id, true).await?;
        user.is_verified = true;

        let token = self
            .jwt
            .issue(user.id, &user.email)
            .map_err(ServiceError::Internal)?;

        tracing::info!(user_id = %user.id, "Email verified");

        Ok(AuthResponse {
            token,
            user: user.sanitized(),
        })
    }

    /// Authenticate with email and password.
    ///
    /// A missing account and a wrong password fail with the same error value
    /// so callers cannot enumerate registered emails.
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, ServiceError> {
        let user = self
            .directory
            .find_by_email(&req.email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        if !user.is_verified {
            return Err(ServiceError::NotVerified);
        }

        verify_password(
            &Password::new(req.password),
            &PasswordHashString::new(user.password_hash.clone()),
        )
        .map_err(|_| ServiceError::InvalidCredentials)?;

        let token = self
            .jwt
            .issue(user.id, &user.email)
            .map_err(ServiceError::Internal)?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(AuthResponse {
            token,
            user: user.sanitized(),
        })
    }

    /// Generate a fresh code, store it (superseding any live one for this
    /// email) and hand it to delivery.
    async fn send_code(&self, name: &str, email: &str) -> Result<(), ServiceError> {
        let code = generate_code();
        self.otp_store.put(email, &code, self.otp_ttl);
        self.email.send_code(email, name, &code).await
    }
}
