use axum::{extract::Request, middleware::Next, response::Response};

use super::AuthUser;

/// auth_middleware
///
/// Guards the authenticated and admin routers. Extracting [`AuthUser`] performs
/// the whole verification; a failure rejects with 401 before any handler runs.
/// On success the identity is attached to the request extensions so the
/// handler's own `AuthUser` argument and [`super::has_role`] read it without
/// verifying again.
pub async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}
