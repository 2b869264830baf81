use chrono::Utc;
use uuid::Uuid;

use crate::{
    auth::{PasswordError, hash_password},
    config::BootstrapAdmin,
    models::{NewUser, Role},
    repository::{Repository, RepositoryError},
};

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// ensure_admin
///
/// Creates the configured admin account unless a user with that email already
/// exists. Without it a fresh database has no one allowed to create users.
/// Returns true when an account was created.
pub async fn ensure_admin(
    repo: &dyn Repository,
    admin: &BootstrapAdmin,
) -> Result<bool, BootstrapError> {
    let email = admin.email.trim().to_lowercase();
    if repo.user_exists_by_email(&email).await? {
        tracing::debug!(%email, "bootstrap admin already present");
        return Ok(false);
    }

    let user = NewUser {
        id: Uuid::new_v4(),
        name: admin.name.clone(),
        email,
        password_hash: hash_password(&admin.password)?,
        created_at: Utc::now(),
    };
    let user_id = user.id;
    repo.create_user_with_roles(user, &[Role::Admin]).await?;

    tracing::info!(%user_id, "bootstrap admin created");
    Ok(true)
}
