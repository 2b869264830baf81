use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Page, Repository, RepositoryError};
use crate::models::{Dish, NewUser, Restaurant, Role, Session, User, UserAddress, UserSummary};

/// PostgresRepository
///
/// The production [`Repository`], backed by a `PgPool`. Queries are checked at
/// runtime so the crate builds without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Logs the failure with its operation name and classifies unique violations.
fn db_error(operation: &'static str, e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            let constraint = db.constraint().unwrap_or("unique").to_string();
            tracing::warn!(operation, constraint = %constraint, "unique constraint violated");
            return RepositoryError::Conflict(constraint);
        }
    }
    // Reported once, where the handler turns it into a response.
    tracing::debug!(operation, error = ?e, "database query failed");
    RepositoryError::Database(e)
}

const USER_COLUMNS: &str = "id, name, email, password, created_at, archived_at";
const RESTAURANT_COLUMNS: &str =
    "id, name, address, latitude, longitude, created_by, rating, created_at, archived_at";
const DISH_COLUMNS: &str =
    "id, restaurant_id, name, description, price, created_by, created_at, archived_at";
const ADDRESS_COLUMNS: &str =
    "id, user_id, address, latitude, longitude, is_primary, created_at, archived_at";

#[async_trait]
impl Repository for PostgresRepository {
    async fn user_exists_by_email(&self, email: &str) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND archived_at IS NULL)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("user_exists_by_email", e))
    }

    /// create_user_with_roles
    ///
    /// One transaction: the user row, then one `user_role` row per role. Any
    /// failed insert returns early, dropping `tx` and rolling everything back.
    async fn create_user_with_roles(
        &self,
        user: NewUser,
        roles: &[Role],
    ) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("create_user_with_roles.begin", e))?;

        sqlx::query(
            "INSERT INTO users (id, name, email, password, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("create_user_with_roles.user", e))?;

        for role in roles {
            sqlx::query(
                "INSERT INTO user_role (id, user_id, role_type, created_at) VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::new_v4())
            .bind(user.id)
            .bind(*role)
            .bind(user.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("create_user_with_roles.role", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("create_user_with_roles.commit", e))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND archived_at IS NULL"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find_user_by_email", e))
    }

    async fn find_active_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND archived_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find_active_user", e))
    }

    async fn find_user_roles(&self, user_id: Uuid) -> Result<Vec<Role>, RepositoryError> {
        // Enum order is declaration order: admin, sub_admin, user.
        sqlx::query_scalar::<_, Role>(
            "SELECT role_type FROM user_role WHERE user_id = $1 AND archived_at IS NULL ORDER BY role_type",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("find_user_roles", e))
    }

    async fn list_users(&self, page: Page) -> Result<Vec<UserSummary>, RepositoryError> {
        sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.name, u.email,
                   array_agg(ur.role_type ORDER BY ur.role_type) AS roles
            FROM users u
            JOIN user_role ur ON ur.user_id = u.id AND ur.archived_at IS NULL
            WHERE u.archived_at IS NULL
            GROUP BY u.id
            ORDER BY u.created_at, u.id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list_users", e))
    }

    async fn list_users_with_role(
        &self,
        role: Role,
        page: Page,
    ) -> Result<Vec<UserSummary>, RepositoryError> {
        sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.name, u.email,
                   array_agg(ur.role_type ORDER BY ur.role_type) AS roles
            FROM users u
            JOIN user_role ur ON ur.user_id = u.id AND ur.archived_at IS NULL
            WHERE u.archived_at IS NULL
            GROUP BY u.id
            HAVING bool_or(ur.role_type = $1)
            ORDER BY u.created_at, u.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(role)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list_users_with_role", e))
    }

    async fn archive_user(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("archive_user.begin", e))?;

        let archived = sqlx::query(
            "UPDATE users SET archived_at = $2 WHERE id = $1 AND archived_at IS NULL",
        )
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("archive_user.user", e))?
        .rows_affected();

        if archived == 0 {
            return Ok(false);
        }

        for table in ["user_role", "sessions", "user_address"] {
            sqlx::query(&format!(
                "UPDATE {table} SET archived_at = $2 WHERE user_id = $1 AND archived_at IS NULL"
            ))
            .bind(id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("archive_user.cascade", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("archive_user.commit", e))?;
        Ok(true)
    }

    async fn create_session(&self, session: Session) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, refresh_token, role_type, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.refresh_token)
        .bind(session.role)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(|e| db_error("create_session", e))
    }

    async fn find_active_session(
        &self,
        refresh_token: &str,
    ) -> Result<Option<Session>, RepositoryError> {
        sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, refresh_token, role_type, created_at, archived_at
            FROM sessions
            WHERE refresh_token = $1 AND archived_at IS NULL
            "#,
        )
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find_active_session", e))
    }

    async fn revoke_session(&self, refresh_token: &str) -> Result<bool, RepositoryError> {
        sqlx::query(
            "UPDATE sessions SET archived_at = now() WHERE refresh_token = $1 AND archived_at IS NULL",
        )
        .bind(refresh_token)
        .execute(&self.pool)
        .await
        .map(|result| result.rows_affected() > 0)
        .map_err(|e| db_error("revoke_session", e))
    }

    async fn create_restaurant(&self, restaurant: Restaurant) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO restaurant (id, name, address, latitude, longitude, created_by, rating, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(restaurant.id)
        .bind(&restaurant.name)
        .bind(&restaurant.address)
        .bind(restaurant.latitude)
        .bind(restaurant.longitude)
        .bind(restaurant.created_by)
        .bind(restaurant.rating)
        .bind(restaurant.created_at)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(|e| db_error("create_restaurant", e))
    }

    async fn list_restaurants(&self, page: Page) -> Result<Vec<Restaurant>, RepositoryError> {
        sqlx::query_as::<_, Restaurant>(&format!(
            "SELECT {RESTAURANT_COLUMNS} FROM restaurant WHERE archived_at IS NULL \
             ORDER BY created_at, id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list_restaurants", e))
    }

    async fn list_restaurants_created_by_role(
        &self,
        role: Role,
        page: Page,
    ) -> Result<Vec<Restaurant>, RepositoryError> {
        sqlx::query_as::<_, Restaurant>(
            r#"
            SELECT r.id, r.name, r.address, r.latitude, r.longitude,
                   r.created_by, r.rating, r.created_at, r.archived_at
            FROM restaurant r
            WHERE r.archived_at IS NULL
              AND EXISTS (
                  SELECT 1 FROM user_role ur
                  WHERE ur.user_id = r.created_by
                    AND ur.role_type = $1
                    AND ur.archived_at IS NULL
              )
            ORDER BY r.created_at, r.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(role)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list_restaurants_created_by_role", e))
    }

    async fn find_restaurant(&self, id: Uuid) -> Result<Option<Restaurant>, RepositoryError> {
        sqlx::query_as::<_, Restaurant>(&format!(
            "SELECT {RESTAURANT_COLUMNS} FROM restaurant WHERE id = $1 AND archived_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find_restaurant", e))
    }

    async fn archive_restaurant(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("archive_restaurant.begin", e))?;

        let archived = sqlx::query(
            "UPDATE restaurant SET archived_at = $2 WHERE id = $1 AND archived_at IS NULL",
        )
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("archive_restaurant", e))?
        .rows_affected();

        if archived == 0 {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE dishes SET archived_at = $2 WHERE restaurant_id = $1 AND archived_at IS NULL",
        )
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("archive_restaurant.dishes", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("archive_restaurant.commit", e))?;
        Ok(true)
    }

    async fn create_dish(&self, dish: Dish) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO dishes (id, restaurant_id, name, description, price, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(dish.id)
        .bind(dish.restaurant_id)
        .bind(&dish.name)
        .bind(&dish.description)
        .bind(dish.price)
        .bind(dish.created_by)
        .bind(dish.created_at)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(|e| db_error("create_dish", e))
    }

    async fn list_dishes(&self, restaurant_id: Uuid) -> Result<Vec<Dish>, RepositoryError> {
        sqlx::query_as::<_, Dish>(&format!(
            "SELECT {DISH_COLUMNS} FROM dishes WHERE restaurant_id = $1 AND archived_at IS NULL \
             ORDER BY created_at, id"
        ))
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list_dishes", e))
    }

    async fn archive_dish(&self, id: Uuid) -> Result<bool, RepositoryError> {
        sqlx::query("UPDATE dishes SET archived_at = now() WHERE id = $1 AND archived_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|result| result.rows_affected() > 0)
            .map_err(|e| db_error("archive_dish", e))
    }

    /// create_address
    ///
    /// Looks up the current primary, demotes it if the new address takes over,
    /// then inserts, all inside one transaction. The partial unique index on
    /// `(user_id) WHERE is_primary AND archived_at IS NULL` turns a concurrent
    /// double-primary into a `Conflict`.
    async fn create_address(&self, address: UserAddress) -> Result<UserAddress, RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("create_address.begin", e))?;

        // Concurrent inserts for one user queue here until the first commits,
        // so the primary lookup below sees the winner's row.
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(address.user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error("create_address.lock", e))?;

        let has_primary = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_address
                WHERE user_id = $1 AND is_primary AND archived_at IS NULL
            )
            "#,
        )
        .bind(address.user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("create_address.lookup", e))?;

        let is_primary = address.is_primary || !has_primary;
        if is_primary && has_primary {
            sqlx::query(
                "UPDATE user_address SET is_primary = false \
                 WHERE user_id = $1 AND is_primary AND archived_at IS NULL",
            )
            .bind(address.user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("create_address.demote", e))?;
        }

        let stored = sqlx::query_as::<_, UserAddress>(&format!(
            "INSERT INTO user_address (id, user_id, address, latitude, longitude, is_primary, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(address.id)
        .bind(address.user_id)
        .bind(&address.address)
        .bind(address.latitude)
        .bind(address.longitude)
        .bind(is_primary)
        .bind(address.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("create_address.insert", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("create_address.commit", e))?;
        Ok(stored)
    }

    async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<UserAddress>, RepositoryError> {
        sqlx::query_as::<_, UserAddress>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM user_address WHERE user_id = $1 AND archived_at IS NULL \
             ORDER BY created_at, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list_addresses", e))
    }

    async fn find_primary_address(
        &self,
        user_id: Uuid,
    ) -> Result<Option<UserAddress>, RepositoryError> {
        sqlx::query_as::<_, UserAddress>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM user_address \
             WHERE user_id = $1 AND is_primary AND archived_at IS NULL"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find_primary_address", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::{
        Layer, Registry,
        layer::{Context, SubscriberExt},
    };

    struct ErrorCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for ErrorCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::ERROR {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn database_failure_is_logged_once_on_its_way_to_a_response() {
        let errors = Arc::new(AtomicUsize::new(0));
        let subscriber = Registry::default().with(ErrorCounter(errors.clone()));

        let api_error = tracing::subscriber::with_default(subscriber, || {
            ApiError::from(db_error("find_user_by_email", sqlx::Error::RowNotFound))
        });

        assert_eq!(
            api_error,
            ApiError::Internal("internal server error".to_string())
        );
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }
}
