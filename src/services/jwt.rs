use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::services::clock::Clock;
use crate::services::ServiceError;

/// Session lifetime. Tokens are stateless: validity is computed from the
/// embedded expiry, never looked up.
const SESSION_TTL_HOURS: i64 = 24;

/// JWT service for session token issuance and validation
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    clock: Arc<dyn Clock>,
}

/// Claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Email
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl SessionClaims {
    pub fn user_id(&self) -> Result<Uuid, ServiceError> {
        Uuid::parse_str(&self.sub).map_err(|_| ServiceError::InvalidToken)
    }
}

impl JwtService {
    /// Create a new JWT service from the process-wide signing secret.
    pub fn new(secret: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            clock,
        }
    }

    /// Issue a signed session token for a user, expiring 24 hours out.
    pub fn issue(&self, user_id: Uuid, email: &str) -> Result<String, anyhow::Error> {
        let now = self.clock.now();
        let exp = now + Duration::hours(SESSION_TTL_HOURS);

        let claims = SessionClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        let header = Header::new(Algorithm::HS256);
        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode session token: {}", e))?;

        Ok(token)
    }

    /// Validate and decode a session token.
    ///
    /// The signing algorithm is pinned to HS256; tokens declaring any other
    /// algorithm are rejected along with bad signatures and malformed
    /// structure. Expiry is checked against the injected clock, with no
    /// leeway, so issuance and validation share one notion of time.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp must still be present; it is enforced below, not by the lib.
        validation.validate_exp = false;

        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| ServiceError::InvalidToken)?;

        if token_data.claims.exp <= self.clock.now().timestamp() {
            return Err(ServiceError::InvalidToken);
        }

        Ok(token_data.claims)
    }
}
