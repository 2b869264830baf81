//! Role Guard.
//!
//! 401 means "who are you?" and is produced by the middleware; this module only
//! ever answers 403 "you may not".

use axum::http::Extensions;

use super::AuthUser;
use crate::{error::ApiError, models::Role};

/// True only when an identity is attached and its role is exactly `required`.
pub fn has_role(extensions: &Extensions, required: Role) -> bool {
    extensions
        .get::<AuthUser>()
        .is_some_and(|user| user.has_role(required))
}

/// Allows the request when the caller's role is in `allowed`, otherwise
/// `403 Forbidden` with `message`.
pub fn require_any_role(user: &AuthUser, allowed: &[Role], message: &str) -> Result<(), ApiError> {
    if allowed.iter().any(|role| user.has_role(*role)) {
        Ok(())
    } else {
        tracing::debug!(user_id = %user.id, role = %user.role, "role guard denied request");
        Err(ApiError::forbidden(message))
    }
}
