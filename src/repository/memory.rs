use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{Page, Repository, RepositoryError};
use crate::models::{
    Dish, NewUser, Restaurant, Role, Session, User, UserAddress, UserRole, UserSummary,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: Vec<User>,
    user_roles: Vec<UserRole>,
    sessions: Vec<Session>,
    restaurants: Vec<Restaurant>,
    dishes: Vec<Dish>,
    addresses: Vec<UserAddress>,
}

impl Tables {
    fn insert_user(&mut self, user: NewUser) -> Result<(), RepositoryError> {
        if self
            .users
            .iter()
            .any(|u| u.archived_at.is_none() && u.email == user.email)
        {
            return Err(RepositoryError::Conflict("users_email_active_key".into()));
        }
        self.users.push(User {
            id: user.id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: user.created_at,
            archived_at: None,
        });
        Ok(())
    }

    fn insert_role(&mut self, user_id: Uuid, role: Role) -> Result<(), RepositoryError> {
        if self.active_roles(user_id).any(|r| r == role) {
            return Err(RepositoryError::Conflict("user_role_active_key".into()));
        }
        self.user_roles.push(UserRole {
            id: Uuid::new_v4(),
            user_id,
            role,
            created_at: Utc::now(),
            archived_at: None,
        });
        Ok(())
    }

    fn active_roles(&self, user_id: Uuid) -> impl Iterator<Item = Role> + '_ {
        self.user_roles
            .iter()
            .filter(move |r| r.user_id == user_id && r.archived_at.is_none())
            .map(|r| r.role)
    }

    fn summarize(&self, user: &User) -> UserSummary {
        let held: Vec<Role> = self.active_roles(user.id).collect();
        UserSummary {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            roles: Role::BY_PRIVILEGE
                .into_iter()
                .filter(|role| held.contains(role))
                .collect(),
        }
    }

    fn active_users(&self) -> Vec<&User> {
        let mut users: Vec<&User> = self
            .users
            .iter()
            .filter(|u| u.archived_at.is_none())
            .collect();
        users.sort_by_key(|u| (u.created_at, u.id));
        users
    }
}

fn paginate<T>(items: Vec<T>, page: Page) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset.max(0) as usize)
        .take(page.limit.max(0) as usize)
        .collect()
}

/// MemoryRepository
///
/// A [`Repository`] held entirely in memory behind one mutex. It enforces the
/// same uniqueness rules as the Postgres schema and gives multi-step writes
/// all-or-nothing semantics by working on a copy of the tables and swapping it
/// in only when every step succeeded. Used by the test suites.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables.lock().map_err(|_| {
            tracing::debug!("memory repository lock poisoned");
            RepositoryError::Unavailable
        })
    }

    /// Runs `f` against a copy of the tables and commits the copy only on `Ok`.
    fn transaction<T>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut tables = self.lock()?;
        let mut staged = tables.clone();
        let value = f(&mut staged)?;
        *tables = staged;
        Ok(value)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn user_exists_by_email(&self, email: &str) -> Result<bool, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .users
            .iter()
            .any(|u| u.archived_at.is_none() && u.email == email))
    }

    async fn create_user_with_roles(
        &self,
        user: NewUser,
        roles: &[Role],
    ) -> Result<(), RepositoryError> {
        self.transaction(|tables| {
            let user_id = user.id;
            tables.insert_user(user)?;
            for role in roles {
                tables.insert_role(user_id, *role)?;
            }
            Ok(())
        })
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .users
            .iter()
            .find(|u| u.archived_at.is_none() && u.email == email)
            .cloned())
    }

    async fn find_active_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .users
            .iter()
            .find(|u| u.archived_at.is_none() && u.id == id)
            .cloned())
    }

    async fn find_user_roles(&self, user_id: Uuid) -> Result<Vec<Role>, RepositoryError> {
        let tables = self.lock()?;
        let held: Vec<Role> = tables.active_roles(user_id).collect();
        Ok(Role::BY_PRIVILEGE
            .into_iter()
            .filter(|role| held.contains(role))
            .collect())
    }

    async fn list_users(&self, page: Page) -> Result<Vec<UserSummary>, RepositoryError> {
        let tables = self.lock()?;
        let summaries: Vec<UserSummary> = tables
            .active_users()
            .into_iter()
            .map(|u| tables.summarize(u))
            .filter(|s| !s.roles.is_empty())
            .collect();
        Ok(paginate(summaries, page))
    }

    async fn list_users_with_role(
        &self,
        role: Role,
        page: Page,
    ) -> Result<Vec<UserSummary>, RepositoryError> {
        let tables = self.lock()?;
        let summaries: Vec<UserSummary> = tables
            .active_users()
            .into_iter()
            .map(|u| tables.summarize(u))
            .filter(|s| s.roles.contains(&role))
            .collect();
        Ok(paginate(summaries, page))
    }

    async fn archive_user(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let now = Utc::now();
        self.transaction(|tables| {
            let Some(user) = tables
                .users
                .iter_mut()
                .find(|u| u.id == id && u.archived_at.is_none())
            else {
                return Ok(false);
            };
            user.archived_at = Some(now);

            for role in tables.user_roles.iter_mut().filter(|r| r.user_id == id) {
                role.archived_at.get_or_insert(now);
            }
            for session in tables.sessions.iter_mut().filter(|s| s.user_id == id) {
                session.archived_at.get_or_insert(now);
            }
            for address in tables.addresses.iter_mut().filter(|a| a.user_id == id) {
                address.archived_at.get_or_insert(now);
            }
            Ok(true)
        })
    }

    async fn create_session(&self, session: Session) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if tables
            .sessions
            .iter()
            .any(|s| s.refresh_token == session.refresh_token)
        {
            return Err(RepositoryError::Conflict("sessions_refresh_token_key".into()));
        }
        tables.sessions.push(session);
        Ok(())
    }

    async fn find_active_session(
        &self,
        refresh_token: &str,
    ) -> Result<Option<Session>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .sessions
            .iter()
            .find(|s| s.archived_at.is_none() && s.refresh_token == refresh_token)
            .cloned())
    }

    async fn revoke_session(&self, refresh_token: &str) -> Result<bool, RepositoryError> {
        let mut tables = self.lock()?;
        match tables
            .sessions
            .iter_mut()
            .find(|s| s.archived_at.is_none() && s.refresh_token == refresh_token)
        {
            Some(session) => {
                session.archived_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_restaurant(&self, restaurant: Restaurant) -> Result<(), RepositoryError> {
        self.lock()?.restaurants.push(restaurant);
        Ok(())
    }

    async fn list_restaurants(&self, page: Page) -> Result<Vec<Restaurant>, RepositoryError> {
        let tables = self.lock()?;
        let mut active: Vec<Restaurant> = tables
            .restaurants
            .iter()
            .filter(|r| r.archived_at.is_none())
            .cloned()
            .collect();
        active.sort_by_key(|r| (r.created_at, r.id));
        Ok(paginate(active, page))
    }

    async fn list_restaurants_created_by_role(
        &self,
        role: Role,
        page: Page,
    ) -> Result<Vec<Restaurant>, RepositoryError> {
        let tables = self.lock()?;
        let mut matching: Vec<Restaurant> = tables
            .restaurants
            .iter()
            .filter(|r| r.archived_at.is_none())
            .filter(|r| tables.active_roles(r.created_by).any(|held| held == role))
            .cloned()
            .collect();
        matching.sort_by_key(|r| (r.created_at, r.id));
        Ok(paginate(matching, page))
    }

    async fn find_restaurant(&self, id: Uuid) -> Result<Option<Restaurant>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .restaurants
            .iter()
            .find(|r| r.archived_at.is_none() && r.id == id)
            .cloned())
    }

    async fn archive_restaurant(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let now = Utc::now();
        self.transaction(|tables| {
            let Some(restaurant) = tables
                .restaurants
                .iter_mut()
                .find(|r| r.id == id && r.archived_at.is_none())
            else {
                return Ok(false);
            };
            restaurant.archived_at = Some(now);
            for dish in tables.dishes.iter_mut().filter(|d| d.restaurant_id == id) {
                dish.archived_at.get_or_insert(now);
            }
            Ok(true)
        })
    }

    async fn create_dish(&self, dish: Dish) -> Result<(), RepositoryError> {
        self.lock()?.dishes.push(dish);
        Ok(())
    }

    async fn list_dishes(&self, restaurant_id: Uuid) -> Result<Vec<Dish>, RepositoryError> {
        let tables = self.lock()?;
        let mut dishes: Vec<Dish> = tables
            .dishes
            .iter()
            .filter(|d| d.archived_at.is_none() && d.restaurant_id == restaurant_id)
            .cloned()
            .collect();
        dishes.sort_by_key(|d| (d.created_at, d.id));
        Ok(dishes)
    }

    async fn archive_dish(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut tables = self.lock()?;
        match tables
            .dishes
            .iter_mut()
            .find(|d| d.id == id && d.archived_at.is_none())
        {
            Some(dish) => {
                dish.archived_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_address(&self, address: UserAddress) -> Result<UserAddress, RepositoryError> {
        self.transaction(|tables| {
            let user_id = address.user_id;
            let mut current = tables
                .addresses
                .iter_mut()
                .filter(|a| a.user_id == user_id && a.is_primary && a.archived_at.is_none());

            let mut stored = address;
            match current.next() {
                Some(previous) if stored.is_primary => previous.is_primary = false,
                Some(_) => {}
                None => stored.is_primary = true,
            }

            tables.addresses.push(stored.clone());
            Ok(stored)
        })
    }

    async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<UserAddress>, RepositoryError> {
        let tables = self.lock()?;
        let mut addresses: Vec<UserAddress> = tables
            .addresses
            .iter()
            .filter(|a| a.archived_at.is_none() && a.user_id == user_id)
            .cloned()
            .collect();
        addresses.sort_by_key(|a| (a.created_at, a.id));
        Ok(addresses)
    }

    async fn find_primary_address(
        &self,
        user_id: Uuid,
    ) -> Result<Option<UserAddress>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .addresses
            .iter()
            .find(|a| a.archived_at.is_none() && a.user_id == user_id && a.is_primary)
            .cloned())
    }
}
