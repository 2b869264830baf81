use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- Roles ---

/// Role
///
/// The closed set of roles a user can hold. Every authorization decision is made
/// against this enum; unknown role strings are rejected at the boundary (serde,
/// the Postgres `role_type` enum, or [`Role::from_str`]).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "role_type", rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    Admin,
    SubAdmin,
    User,
}

impl Role {
    /// Roles ordered from most to least privileged. Used to pick a default role at login.
    pub const BY_PRIVILEGE: [Role; 3] = [Role::Admin, Role::SubAdmin, Role::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::SubAdmin => "sub_admin",
            Role::User => "user",
        }
    }

    /// The most privileged role in `roles`, if any.
    pub fn highest(roles: &[Role]) -> Option<Role> {
        Role::BY_PRIVILEGE
            .into_iter()
            .find(|candidate| roles.contains(candidate))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "sub_admin" => Ok(Role::SubAdmin),
            "user" => Ok(Role::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

// --- Core Records (Mapped to Database) ---

/// User
///
/// The stored account row. The password hash never leaves the server: it is
/// skipped on serialization.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
}

/// UserSummary
///
/// A user as listed to administrators, with every active role aggregated.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub roles: Vec<Role>,
}

/// UserRole
///
/// Association of a user with one role. `(user_id, role)` is unique among
/// active rows.
#[derive(Debug, Clone, FromRow)]
pub struct UserRole {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "role_type")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

/// Session
///
/// A persisted refresh token. Archiving the row revokes the token.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub refresh_token: String,
    // The role the session was opened for; refreshed access tokens carry it.
    #[sqlx(rename = "role_type")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

/// Restaurant
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct Restaurant {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_by: Uuid,
    // Always within [0, 5]; enforced when the request is validated.
    pub rating: f64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[ts(optional)]
    pub archived_at: Option<DateTime<Utc>>,
}

/// Dish
///
/// Belongs to exactly one restaurant.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct Dish {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub price: Option<f64>,
    pub created_by: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[ts(optional)]
    pub archived_at: Option<DateTime<Utc>>,
}

/// UserAddress
///
/// At most one active address per user has `is_primary = true`; the distance
/// endpoint measures from that one.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct UserAddress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub longitude: Option<f64>,
    pub is_primary: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[ts(optional)]
    pub archived_at: Option<DateTime<Utc>>,
}

/// NewUser
///
/// Everything needed to insert an account. Built by the handler with a
/// server-generated id and an already hashed password.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// `role` selects which of the user's roles the token is issued for. When
/// omitted, the most privileged role held is used.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct LoginRequest {
    #[validate(custom(function = "crate::validation::non_blank"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    #[serde(default)]
    #[ts(optional)]
    pub role: Option<Role>,
}

/// RefreshTokenRequest
///
/// Body of both `/auth/refresh` and `/auth/logout`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct RefreshTokenRequest {
    #[validate(custom(function = "crate::validation::non_blank"))]
    pub refresh_token: String,
}

/// CreateUserRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct CreateUserRequest {
    #[validate(custom(function = "crate::validation::non_blank"))]
    pub name: String,
    #[validate(email(message = "email is invalid"))]
    pub email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    #[validate(
        length(min = 1, message = "at least one role is required"),
        custom(function = "crate::validation::unique_roles")
    )]
    pub roles: Vec<Role>,
}

/// CreateRestaurantRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, Validate)]
#[validate(schema(function = "crate::validation::restaurant_coordinates"))]
#[ts(export)]
pub struct CreateRestaurantRequest {
    #[validate(custom(function = "crate::validation::non_blank"))]
    pub name: String,
    #[validate(custom(function = "crate::validation::non_blank"))]
    pub address: String,
    #[serde(default)]
    #[validate(range(min = -90.0, max = 90.0, message = "latitude must be between -90 and 90"))]
    pub latitude: Option<f64>,
    #[serde(default)]
    #[validate(range(min = -180.0, max = 180.0, message = "longitude must be between -180 and 180"))]
    pub longitude: Option<f64>,
    #[validate(range(min = 0.0, max = 5.0, message = "rating must be between 0 and 5"))]
    pub rating: f64,
}

/// CreateDishRequest
///
/// `restaurant_id` must be a UUID; anything else is rejected while decoding.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct CreateDishRequest {
    pub restaurant_id: Uuid,
    #[validate(custom(function = "crate::validation::non_blank"))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "price must not be negative"))]
    pub price: Option<f64>,
}

/// CreateAddressRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, Validate)]
#[validate(schema(function = "crate::validation::address_coordinates"))]
#[ts(export)]
pub struct CreateAddressRequest {
    #[validate(custom(function = "crate::validation::non_blank"))]
    pub address: String,
    #[serde(default)]
    #[validate(range(min = -90.0, max = 90.0, message = "latitude must be between -90 and 90"))]
    pub latitude: Option<f64>,
    #[serde(default)]
    #[validate(range(min = -180.0, max = 180.0, message = "longitude must be between -180 and 180"))]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub is_primary: bool,
}

// --- Response Envelopes (Output Schemas) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct HealthResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateUserResponse {
    pub user_id: Uuid,
}

/// Identity resolved from the caller's bearer token (GET /me).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MeResponse {
    pub id: Uuid,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserListResponse {
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SubAdminListResponse {
    pub subadmins: Vec<UserSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RestaurantListResponse {
    pub restaurants: Vec<Restaurant>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RestaurantResponse {
    pub restaurant: Restaurant,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DishListResponse {
    pub dishes: Vec<Dish>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DishResponse {
    pub dish: Dish,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AddressListResponse {
    pub addresses: Vec<UserAddress>,
}

/// DistanceResponse
///
/// Great-circle distance between the caller's primary address and a restaurant.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DistanceResponse {
    pub distance_km: f64,
    pub message: String,
}
