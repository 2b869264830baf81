use axum::{Json, extract::State};
use chrono::{Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use super::normalize_email;
use crate::{
    AppState,
    auth::{generate_refresh_token, verify_dummy_password, verify_password},
    error::{ApiError, ErrorBody},
    extract::AppJson,
    models::{
        LoginRequest, LoginResponse, MessageResponse, RefreshTokenRequest, Role, Session,
        TokenResponse,
    },
};

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("invalid email or password")
}

/// login
///
/// [Public Route] Exchanges email and password for an access token and a
/// refresh token. `role` picks which held role the access token carries;
/// without it the most privileged held role is used. Requesting a role the
/// user does not hold is treated like bad credentials (401).
///
/// A session row is stored for the refresh token so it can be revoked.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Malformed body", body = ErrorBody),
        (status = 401, description = "Wrong credentials or role", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    payload.validate()?;
    let email = normalize_email(&payload.email);

    let Some(user) = state.repo.find_user_by_email(&email).await? else {
        verify_dummy_password(&payload.password);
        return Err(invalid_credentials());
    };

    if !verify_password(&payload.password, &user.password_hash) {
        tracing::debug!(user_id = %user.id, "login rejected: wrong password");
        return Err(invalid_credentials());
    }

    let roles = state.repo.find_user_roles(user.id).await?;
    let role = match payload.role {
        Some(requested) if roles.contains(&requested) => requested,
        Some(requested) => {
            tracing::debug!(user_id = %user.id, role = %requested, "login rejected: role not held");
            return Err(ApiError::unauthorized("user does not have the requested role"));
        }
        None => Role::highest(&roles).ok_or_else(|| {
            tracing::warn!(user_id = %user.id, "login rejected: user holds no role");
            invalid_credentials()
        })?,
    };

    let token = state
        .tokens
        .issue_access(user.id, role)
        .map_err(|e| ApiError::internal("failed to generate token", e))?;

    let session = Session {
        id: Uuid::new_v4(),
        user_id: user.id,
        refresh_token: generate_refresh_token(),
        role,
        created_at: Utc::now(),
        archived_at: None,
    };
    let refresh_token = session.refresh_token.clone();
    state.repo.create_session(session).await?;

    tracing::info!(user_id = %user.id, role = %role, "user logged in");
    Ok(Json(LoginResponse {
        token,
        refresh_token,
    }))
}

/// refresh
///
/// [Public Route] Issues a new access token for an active, unexpired session.
/// The token carries the role the session was opened for. A session older
/// than the refresh lifetime is revoked on sight.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New access token", body = TokenResponse),
        (status = 400, description = "Missing refresh token", body = ErrorBody),
        (status = 401, description = "Unknown, revoked or expired session", body = ErrorBody)
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshTokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.validate()?;

    let session = state
        .repo
        .find_active_session(&payload.refresh_token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("invalid refresh token"))?;

    let lifetime = Duration::days(state.config.refresh_token_ttl_days);
    if Utc::now() - session.created_at > lifetime {
        state.repo.revoke_session(&session.refresh_token).await?;
        tracing::debug!(session_id = %session.id, "refresh rejected: session expired");
        return Err(ApiError::unauthorized("refresh token expired"));
    }

    if state.repo.find_active_user(session.user_id).await?.is_none() {
        return Err(ApiError::unauthorized("invalid refresh token"));
    }

    let token = state
        .tokens
        .issue_access(session.user_id, session.role)
        .map_err(|e| ApiError::internal("failed to generate token", e))?;

    Ok(Json(TokenResponse { token }))
}

/// logout
///
/// [Public Route] Revokes the session behind a refresh token. Idempotent:
/// unknown or already revoked tokens still answer 200.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 400, description = "Missing refresh token", body = ErrorBody)
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshTokenRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate()?;

    if !state.repo.revoke_session(&payload.refresh_token).await? {
        tracing::debug!("logout for unknown or revoked refresh token");
    }

    Ok(Json(MessageResponse::new("logged out successfully")))
}
