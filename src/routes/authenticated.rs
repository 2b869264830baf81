use crate::{
    AppState,
    handlers::{restaurants, users},
};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes for any signed-in user. The router is wrapped in `auth_middleware`,
/// so every handler here receives a verified `AuthUser`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(users::get_me))
        // POST/GET /users/address
        // Adds an address for the caller or lists the caller's addresses.
        .route(
            "/users/address",
            get(users::list_addresses).post(users::create_address),
        )
        // GET /restaurants/{id}/distance
        // Distance from the caller's primary address to the restaurant.
        .route(
            "/restaurants/{id}/distance",
            get(restaurants::restaurant_distance),
        )
}
