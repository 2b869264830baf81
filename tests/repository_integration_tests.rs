use chrono::{Duration, Utc};
use restaurant_api::{
    auth::hash_password,
    models::{NewUser, Restaurant, Role, Session, UserAddress},
    repository::{MemoryRepository, Page, PostgresRepository, Repository, RepositoryError},
};
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Data Helpers ---

fn new_user(email: &str) -> NewUser {
    NewUser {
        id: Uuid::new_v4(),
        name: "Repo Test".to_string(),
        email: email.to_string(),
        password_hash: hash_password("password1").unwrap(),
        created_at: Utc::now(),
    }
}

fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

fn restaurant(created_by: Uuid, name: &str) -> Restaurant {
    Restaurant {
        id: Uuid::new_v4(),
        name: name.to_string(),
        address: "1 Test Road".to_string(),
        latitude: None,
        longitude: None,
        created_by,
        rating: 3.5,
        created_at: Utc::now(),
        archived_at: None,
    }
}

fn address(user_id: Uuid, label: &str, is_primary: bool) -> UserAddress {
    UserAddress {
        id: Uuid::new_v4(),
        user_id,
        address: label.to_string(),
        latitude: None,
        longitude: None,
        is_primary,
        created_at: Utc::now(),
        archived_at: None,
    }
}

// --- Shared Behaviour ---
// The same assertions run against both implementations.

async fn assert_user_creation_is_atomic(repo: &dyn Repository) {
    let email = unique_email("atomic");
    let user = new_user(&email);
    let user_id = user.id;

    // The second role row violates the (user, role) uniqueness rule.
    let result = repo
        .create_user_with_roles(user, &[Role::SubAdmin, Role::SubAdmin])
        .await;

    assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    assert!(!repo.user_exists_by_email(&email).await.unwrap());
    assert!(repo.find_active_user(user_id).await.unwrap().is_none());
    assert!(repo.find_user_roles(user_id).await.unwrap().is_empty());
}

async fn assert_single_primary_address(repo: &dyn Repository) {
    let user = new_user(&unique_email("primary"));
    let user_id = user.id;
    repo.create_user_with_roles(user, &[Role::User]).await.unwrap();

    let first = repo.create_address(address(user_id, "first", false)).await.unwrap();
    assert!(first.is_primary, "first address becomes primary");

    let second = repo.create_address(address(user_id, "second", false)).await.unwrap();
    assert!(!second.is_primary);

    let third = repo.create_address(address(user_id, "third", true)).await.unwrap();
    assert!(third.is_primary);

    let all = repo.list_addresses(user_id).await.unwrap();
    assert_eq!(all.iter().filter(|a| a.is_primary).count(), 1);
    let primary = repo.find_primary_address(user_id).await.unwrap().unwrap();
    assert_eq!(primary.id, third.id);
}

async fn assert_concurrent_first_addresses_share_one_primary(repo: &dyn Repository) {
    let user = new_user(&unique_email("race"));
    let user_id = user.id;
    repo.create_user_with_roles(user, &[Role::User]).await.unwrap();

    let (left, right) = tokio::join!(
        repo.create_address(address(user_id, "left", false)),
        repo.create_address(address(user_id, "right", false)),
    );
    let (left, right) = (left.unwrap(), right.unwrap());

    assert!(left.is_primary != right.is_primary, "exactly one becomes primary");
    let all = repo.list_addresses(user_id).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all.iter().filter(|a| a.is_primary).count(), 1);
}

async fn assert_session_lifecycle(repo: &dyn Repository) {
    let user = new_user(&unique_email("session"));
    let user_id = user.id;
    repo.create_user_with_roles(user, &[Role::User]).await.unwrap();

    let token = Uuid::new_v4().simple().to_string();
    repo.create_session(Session {
        id: Uuid::new_v4(),
        user_id,
        refresh_token: token.clone(),
        role: Role::User,
        created_at: Utc::now(),
        archived_at: None,
    })
    .await
    .unwrap();

    let found = repo.find_active_session(&token).await.unwrap().unwrap();
    assert_eq!((found.user_id, found.role), (user_id, Role::User));

    assert!(repo.revoke_session(&token).await.unwrap());
    assert!(!repo.revoke_session(&token).await.unwrap());
    assert!(repo.find_active_session(&token).await.unwrap().is_none());
}

// --- MemoryRepository ---

#[tokio::test]
async fn test_memory_user_creation_is_atomic() {
    assert_user_creation_is_atomic(&MemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_single_primary_address() {
    assert_single_primary_address(&MemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_concurrent_first_addresses() {
    assert_concurrent_first_addresses_share_one_primary(&MemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_session_lifecycle() {
    assert_session_lifecycle(&MemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_email_is_unique_among_active_users() {
    let repo = MemoryRepository::new();
    let first = new_user("taken@example.com");
    let first_id = first.id;
    repo.create_user_with_roles(first, &[Role::User]).await.unwrap();

    let clash = repo
        .create_user_with_roles(new_user("taken@example.com"), &[Role::User])
        .await;
    assert!(matches!(clash, Err(RepositoryError::Conflict(_))));

    // Archiving frees the address for a new account.
    assert!(repo.archive_user(first_id).await.unwrap());
    repo.create_user_with_roles(new_user("taken@example.com"), &[Role::Admin])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_memory_archive_user_cascades() {
    let repo = MemoryRepository::new();
    let user = new_user("leaving@example.com");
    let user_id = user.id;
    repo.create_user_with_roles(user, &[Role::User]).await.unwrap();
    repo.create_address(address(user_id, "home", true)).await.unwrap();

    assert!(repo.archive_user(user_id).await.unwrap());

    assert!(repo.find_user_roles(user_id).await.unwrap().is_empty());
    assert!(repo.list_addresses(user_id).await.unwrap().is_empty());
    assert!(repo.list_users(Page::default()).await.unwrap().is_empty());
    assert!(!repo.archive_user(user_id).await.unwrap());
}

#[tokio::test]
async fn test_memory_listing_is_ordered_and_paged() {
    let repo = MemoryRepository::new();
    let owner = Uuid::new_v4();
    let base = Utc::now();

    for i in 0..5 {
        let mut r = restaurant(owner, &format!("R{i}"));
        r.created_at = base + Duration::seconds(i);
        repo.create_restaurant(r).await.unwrap();
    }

    let page = repo
        .list_restaurants(Page {
            limit: 2,
            offset: 1,
        })
        .await
        .unwrap();
    let names: Vec<&str> = page.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["R1", "R2"]);
}

#[tokio::test]
async fn test_memory_list_users_with_role_keeps_all_roles() {
    let repo = MemoryRepository::new();
    let both = new_user("both@example.com");
    let both_id = both.id;
    repo.create_user_with_roles(both, &[Role::User, Role::SubAdmin])
        .await
        .unwrap();
    repo.create_user_with_roles(new_user("plain@example.com"), &[Role::User])
        .await
        .unwrap();

    let subadmins = repo
        .list_users_with_role(Role::SubAdmin, Page::default())
        .await
        .unwrap();

    assert_eq!(subadmins.len(), 1);
    assert_eq!(subadmins[0].id, both_id);
    assert_eq!(subadmins[0].roles, vec![Role::SubAdmin, Role::User]);
}

// --- PostgresRepository ---

/// Connects to `DATABASE_URL` and applies the embedded migrations.
async fn postgres() -> PostgresRepository {
    dotenv::dotenv().ok();
    let db_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set to run integration tests");
    let pool = PgPool::connect(&db_url)
        .await
        .expect("Failed to connect to database for integration tests.");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations.");
    PostgresRepository::new(pool)
}

#[tokio::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_postgres_user_creation_is_atomic() {
    assert_user_creation_is_atomic(&postgres().await).await;
}

#[tokio::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_postgres_single_primary_address() {
    assert_single_primary_address(&postgres().await).await;
}

#[tokio::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_postgres_concurrent_first_addresses() {
    let repo = postgres().await;
    for _ in 0..10 {
        assert_concurrent_first_addresses_share_one_primary(&repo).await;
    }
}

#[tokio::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_postgres_user_roles_decode_as_array() {
    let repo = postgres().await;
    let both = new_user(&unique_email("both"));
    let both_id = both.id;
    repo.create_user_with_roles(both, &[Role::User, Role::SubAdmin])
        .await
        .unwrap();

    let subadmins = repo
        .list_users_with_role(Role::SubAdmin, Page { limit: 100, offset: 0 })
        .await
        .unwrap();
    let listed = subadmins.iter().find(|u| u.id == both_id).unwrap();
    let mut roles = listed.roles.clone();
    roles.sort_by_key(|r| r.as_str());
    assert_eq!(roles, vec![Role::SubAdmin, Role::User]);
}

#[tokio::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_postgres_session_lifecycle() {
    assert_session_lifecycle(&postgres().await).await;
}

#[tokio::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_postgres_restaurants_created_by_sub_admins() {
    let repo = postgres().await;
    let sub_admin = new_user(&unique_email("owner"));
    let sub_admin_id = sub_admin.id;
    repo.create_user_with_roles(sub_admin, &[Role::SubAdmin])
        .await
        .unwrap();

    let created = restaurant(sub_admin_id, "Postgres Palace");
    repo.create_restaurant(created.clone()).await.unwrap();

    let listed = repo
        .list_restaurants_created_by_role(Role::SubAdmin, Page { limit: 100, offset: 0 })
        .await
        .unwrap();
    assert!(listed.iter().any(|r| r.id == created.id));

    assert!(repo.archive_restaurant(created.id).await.unwrap());
    assert!(repo.find_restaurant(created.id).await.unwrap().is_none());
}
