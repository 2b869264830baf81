use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Dish, NewUser, Restaurant, Role, Session, User, UserAddress, UserSummary};

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// RepositoryError
///
/// Failures surfaced by a store. Handlers never show the details to clients:
/// a `RepositoryError` always becomes a 500 unless the handler maps a
/// `Conflict` to something more specific.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A uniqueness rule was violated (duplicate email, role, token or primary address).
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// The store cannot be used at all (e.g. a poisoned in-memory lock).
    #[error("repository unavailable")]
    Unavailable,
}

/// Page
///
/// A validated window into a list. Built by [`crate::validation::PageParams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Repository Trait
///
/// The persistence contract used by every handler. All reads skip archived
/// rows; all deletes are soft (`archived_at` is set, nothing is removed).
/// Lists are ordered by `created_at` then `id`, so paging is stable.
///
/// Implemented by [`PostgresRepository`] for production and by
/// [`MemoryRepository`] for tests and local runs without a database.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users & Roles ---

    /// True if an active user already uses `email`.
    async fn user_exists_by_email(&self, email: &str) -> Result<bool, RepositoryError>;
    /// Inserts the user and one role row per entry of `roles` as a single unit:
    /// either all rows are stored or none are.
    async fn create_user_with_roles(
        &self,
        user: NewUser,
        roles: &[Role],
    ) -> Result<(), RepositoryError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    async fn find_active_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;
    /// Active roles of `user_id`, most privileged first.
    async fn find_user_roles(&self, user_id: Uuid) -> Result<Vec<Role>, RepositoryError>;
    async fn list_users(&self, page: Page) -> Result<Vec<UserSummary>, RepositoryError>;
    /// Users holding `role`; each summary still lists all of the user's roles.
    async fn list_users_with_role(
        &self,
        role: Role,
        page: Page,
    ) -> Result<Vec<UserSummary>, RepositoryError>;
    /// Archives the user together with its roles and open sessions. Returns
    /// false when no active user has this id.
    async fn archive_user(&self, id: Uuid) -> Result<bool, RepositoryError>;

    // --- Sessions ---

    async fn create_session(&self, session: Session) -> Result<(), RepositoryError>;
    async fn find_active_session(
        &self,
        refresh_token: &str,
    ) -> Result<Option<Session>, RepositoryError>;
    /// Archives the session; false if the token is unknown or already revoked.
    async fn revoke_session(&self, refresh_token: &str) -> Result<bool, RepositoryError>;

    // --- Restaurants ---

    async fn create_restaurant(&self, restaurant: Restaurant) -> Result<(), RepositoryError>;
    async fn list_restaurants(&self, page: Page) -> Result<Vec<Restaurant>, RepositoryError>;
    /// Restaurants whose creator currently holds `role`.
    async fn list_restaurants_created_by_role(
        &self,
        role: Role,
        page: Page,
    ) -> Result<Vec<Restaurant>, RepositoryError>;
    async fn find_restaurant(&self, id: Uuid) -> Result<Option<Restaurant>, RepositoryError>;
    /// Archives the restaurant and its dishes.
    async fn archive_restaurant(&self, id: Uuid) -> Result<bool, RepositoryError>;

    // --- Dishes ---

    async fn create_dish(&self, dish: Dish) -> Result<(), RepositoryError>;
    async fn list_dishes(&self, restaurant_id: Uuid) -> Result<Vec<Dish>, RepositoryError>;
    async fn archive_dish(&self, id: Uuid) -> Result<bool, RepositoryError>;

    // --- Addresses ---

    /// Stores an address and returns it as persisted. The address becomes
    /// primary when requested or when the user has no primary address yet; any
    /// previous primary is demoted in the same unit of work.
    async fn create_address(&self, address: UserAddress) -> Result<UserAddress, RepositoryError>;
    async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<UserAddress>, RepositoryError>;
    async fn find_primary_address(
        &self,
        user_id: Uuid,
    ) -> Result<Option<UserAddress>, RepositoryError>;
}

/// RepositoryState
///
/// The shared handle stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;
