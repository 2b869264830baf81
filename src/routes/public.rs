use crate::{
    AppState,
    handlers::{auth, restaurants},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a bearer token: the login/refresh/logout flow
/// and the restaurant catalogue. Reads only ever return active rows.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // POST /auth/login
        // Email + password (+ optional role) for an access token and a refresh token.
        .route("/auth/login", post(auth::login))
        // POST /auth/refresh
        // New access token for an active session.
        .route("/auth/refresh", post(auth::refresh))
        // POST /auth/logout
        // Revokes the session behind a refresh token.
        .route("/auth/logout", post(auth::logout))
        // GET /restaurants?limit=&offset=
        .route("/restaurants", get(restaurants::list_restaurants))
        // GET /restaurants/{id}/dishes
        .route("/restaurants/{id}/dishes", get(restaurants::list_dishes))
}
