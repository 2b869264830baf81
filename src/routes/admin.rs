use crate::{
    AppState,
    handlers::{restaurants, users},
};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Admin Router Module
///
/// Management endpoints. The router sits behind `auth_middleware` (401 for
/// anonymous callers); each handler then applies the Role Guard (403 for a
/// valid identity with the wrong role):
/// - admin only: user management, the full restaurant listing, restaurant deletion
/// - admin or sub_admin: restaurant and dish creation, dish deletion, the
///   sub-admin restaurant listing
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- Users ---
        .route(
            "/admin/users",
            post(users::create_user).get(users::list_users),
        )
        .route("/admin/users/{id}", delete(users::archive_user))
        .route("/admin/sub-admins", get(users::list_sub_admins))
        // --- Restaurants ---
        .route(
            "/admin/restaurants",
            post(restaurants::create_restaurant).get(restaurants::list_all_restaurants),
        )
        .route(
            "/admin/restaurants/{id}",
            delete(restaurants::archive_restaurant),
        )
        .route(
            "/sub-admin/restaurants",
            get(restaurants::list_sub_admin_restaurants),
        )
        // --- Dishes ---
        .route("/admin/dishes", post(restaurants::create_dish))
        .route("/admin/dishes/{id}", delete(restaurants::archive_dish))
}
