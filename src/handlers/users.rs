use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::normalize_email;
use crate::{
    AppState,
    auth::{AuthUser, hash_password, require_any_role},
    error::{ApiError, ErrorBody},
    extract::{AppJson, AppPath, AppQuery},
    models::{
        AddressListResponse, CreateAddressRequest, CreateUserRequest, CreateUserResponse,
        MeResponse, MessageResponse, NewUser, Role, SubAdminListResponse, UserAddress,
        UserListResponse,
    },
    repository::RepositoryError,
    validation::PageParams,
};

/// get_me
///
/// [Authenticated Route] Echoes the identity resolved from the bearer token.
#[utoipa::path(
    get,
    path = "/api/v1/me",
    responses(
        (status = 200, description = "Current identity", body = MeResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    )
)]
pub async fn get_me(AuthUser { id, role }: AuthUser) -> Json<MeResponse> {
    Json(MeResponse { id, role })
}

/// create_user
///
/// [Admin Route] Creates a user and all of its roles in one transaction.
/// The password is hashed before it reaches the repository.
#[utoipa::path(
    post,
    path = "/api/v1/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = CreateUserResponse),
        (status = 400, description = "Invalid body or email already registered", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody)
    )
)]
pub async fn create_user(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreateUserResponse>), ApiError> {
    require_any_role(&auth, &[Role::Admin], "only admins can create users")?;
    payload.validate()?;

    let email = normalize_email(&payload.email);
    if state.repo.user_exists_by_email(&email).await? {
        return Err(ApiError::validation("user already exists"));
    }

    let password_hash = hash_password(&payload.password)
        .map_err(|e| ApiError::internal("failed to create user", e))?;

    let user = NewUser {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_string(),
        email,
        password_hash,
        created_at: Utc::now(),
    };
    let user_id = user.id;

    match state.repo.create_user_with_roles(user, &payload.roles).await {
        Ok(()) => {
            tracing::info!(%user_id, roles = ?payload.roles, created_by = %auth.id, "user created");
            Ok((StatusCode::CREATED, Json(CreateUserResponse { user_id })))
        }
        // Lost a race with a concurrent create for the same email.
        Err(RepositoryError::Conflict(_)) => Err(ApiError::validation("user already exists")),
        Err(e) => Err(ApiError::internal("failed to create user", e)),
    }
}

/// list_users
///
/// [Admin Route] Lists active users with their roles.
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    params(PageParams),
    responses(
        (status = 200, description = "Users", body = UserListResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorBody)
    )
)]
pub async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<UserListResponse>, ApiError> {
    require_any_role(&auth, &[Role::Admin], "only admins can list users")?;
    let users = state.repo.list_users(params.into_page()?).await?;
    Ok(Json(UserListResponse { users }))
}

/// list_sub_admins
///
/// [Admin Route] Lists active users holding the `sub_admin` role.
#[utoipa::path(
    get,
    path = "/api/v1/admin/sub-admins",
    params(PageParams),
    responses(
        (status = 200, description = "Sub-admins", body = SubAdminListResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorBody)
    )
)]
pub async fn list_sub_admins(
    auth: AuthUser,
    State(state): State<AppState>,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<SubAdminListResponse>, ApiError> {
    require_any_role(&auth, &[Role::Admin], "only admins can list sub-admins")?;
    let subadmins = state
        .repo
        .list_users_with_role(Role::SubAdmin, params.into_page()?)
        .await?;
    Ok(Json(SubAdminListResponse { subadmins }))
}

/// archive_user
///
/// [Admin Route] Soft-deletes a user. Its roles, sessions and addresses are
/// archived with it, so outstanding tokens stop working immediately.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User archived", body = MessageResponse),
        (status = 400, description = "Invalid id or self-deletion", body = ErrorBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    )
)]
pub async fn archive_user(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_any_role(&auth, &[Role::Admin], "only admins can delete users")?;
    if id == auth.id {
        return Err(ApiError::validation("admins cannot delete themselves"));
    }

    if state.repo.archive_user(id).await? {
        tracing::info!(user_id = %id, archived_by = %auth.id, "user archived");
        Ok(Json(MessageResponse::new("user deleted successfully")))
    } else {
        Err(ApiError::not_found("user not found"))
    }
}

/// create_address
///
/// [Authenticated Route] Adds an address for the caller. The first address a
/// user adds becomes primary; `is_primary = true` moves the primary flag to
/// the new address.
#[utoipa::path(
    post,
    path = "/api/v1/users/address",
    request_body = CreateAddressRequest,
    responses(
        (status = 200, description = "Address created", body = MessageResponse),
        (status = 400, description = "Invalid body", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    )
)]
pub async fn create_address(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateAddressRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate()?;

    let address = UserAddress {
        id: Uuid::new_v4(),
        user_id: auth.id,
        address: payload.address.trim().to_string(),
        latitude: payload.latitude,
        longitude: payload.longitude,
        is_primary: payload.is_primary,
        created_at: Utc::now(),
        archived_at: None,
    };

    let stored = state
        .repo
        .create_address(address)
        .await
        .map_err(|e| ApiError::internal("failed to create address", e))?;

    tracing::debug!(address_id = %stored.id, is_primary = stored.is_primary, "address created");
    Ok(Json(MessageResponse::new("User address created successfully")))
}

/// list_addresses
///
/// [Authenticated Route] Lists the caller's active addresses.
#[utoipa::path(
    get,
    path = "/api/v1/users/address",
    responses(
        (status = 200, description = "Addresses", body = AddressListResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    )
)]
pub async fn list_addresses(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AddressListResponse>, ApiError> {
    let addresses = state.repo.list_addresses(auth.id).await?;
    Ok(Json(AddressListResponse { addresses }))
}
