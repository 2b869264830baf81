use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{config::AppConfig, models::Role};

/// Claims
///
/// The payload of an access token. Signed with the server secret (HS256) and
/// checked on every authenticated request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: Uuid,
    /// The role the token was issued for.
    pub role: Role,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiration (unix seconds). Verification fails once the clock is past it.
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token is invalid")]
    Invalid,
    #[error("token could not be signed: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),
}

/// TokenIssuer
///
/// Creates and verifies access tokens with a single symmetric key. Built once
/// at start-up and shared through the application state.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
}

/// Shared handle stored in `AppState`.
pub type TokenState = Arc<TokenIssuer>;

impl TokenIssuer {
    pub fn new(secret: &str, access_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // Expired means expired; no grace period.
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            Duration::minutes(config.access_token_ttl_minutes),
        )
    }

    /// Signs a token for `user_id`/`role` that expires at `expires_at`.
    pub fn issue(
        &self,
        user_id: Uuid,
        role: Role,
        expires_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user_id,
            role,
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Encoding)
    }

    /// Signs a token with the configured access-token lifetime.
    pub fn issue_access(&self, user_id: Uuid, role: Role) -> Result<String, TokenError> {
        self.issue(user_id, role, Utc::now() + self.access_ttl)
    }

    /// Verifies signature and expiry and returns the claims. Fails closed.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

/// An opaque refresh token: 32 random bytes as 64 lowercase hex chars. It
/// carries no claims; its meaning lives in the session table.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
