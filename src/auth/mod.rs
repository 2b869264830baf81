use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::{error::ApiError, models::Role, repository::RepositoryState};

// --- Module Structure ---

pub mod guard;
pub mod middleware;
pub mod password;
pub mod token;

pub use guard::{has_role, require_any_role};
pub use middleware::auth_middleware;
pub use password::{PasswordError, hash_password, verify_dummy_password, verify_password};
pub use token::{Claims, TokenError, TokenIssuer, TokenState, generate_refresh_token};

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. Once attached by
/// [`auth_middleware`] it is read-only: handlers receive a clone as an explicit
/// argument and use it for creator ids and role checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// The user id carried in the token's `sub` claim.
    pub id: Uuid,
    /// The role the token was issued for. Drives every Role Guard decision.
    pub role: Role,
}

impl AuthUser {
    pub fn has_role(&self, required: Role) -> bool {
        self.role == required
    }
}

/// AuthUser Extractor Implementation
///
/// Usable as an argument of any handler behind [`auth_middleware`]. The steps:
/// 1. Reuse: if the middleware already attached an identity, return it.
/// 2. Token Extraction: `Authorization: Bearer <token>` is required.
/// 3. Token Validation: signature and expiry via the shared [`TokenIssuer`].
/// 4. DB Lookup: the user must still exist and not be archived.
///
/// Rejection: `401 Unauthorized` on any failure, `500` if the lookup itself fails.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    TokenState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 1. Reuse
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        // 2. Token Extraction
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::unauthorized("missing or invalid token"))?;

        // 3. Token Validation
        let tokens = TokenState::from_ref(state);
        let claims = tokens.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "bearer token rejected");
            ApiError::unauthorized("unauthorized")
        })?;

        // 4. DB Lookup
        let repo = RepositoryState::from_ref(state);
        match repo.find_active_user(claims.sub).await {
            Ok(Some(_)) => Ok(AuthUser {
                id: claims.sub,
                role: claims.role,
            }),
            Ok(None) => {
                tracing::debug!(user_id = %claims.sub, "token subject is unknown or archived");
                Err(ApiError::unauthorized("unauthorized"))
            }
            Err(e) => Err(ApiError::internal("failed to resolve user", e)),
        }
    }
}
