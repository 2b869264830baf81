use restaurant_api::{
    AppConfig, AppState, MemoryRepository, RepositoryState,
    bootstrap::ensure_admin,
    config::BootstrapAdmin,
    create_router,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "admin-password";

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn login(&self, email: &str, password: &str, role: Option<&str>) -> reqwest::Response {
        let mut body = json!({ "email": email, "password": password });
        if let Some(role) = role {
            body["role"] = json!(role);
        }
        self.client
            .post(self.url("/api/v1/auth/login"))
            .json(&body)
            .send()
            .await
            .expect("login request failed")
    }

    async fn token_for(&self, email: &str, password: &str) -> String {
        let response = self.login(email, password, None).await;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_user(&self, token: Option<&str>, body: Value) -> reqwest::Response {
        let mut request = self.client.post(self.url("/api/v1/admin/users")).json(&body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("create user request failed")
    }
}

/// Serves the full router on an ephemeral port, backed by the in-memory
/// repository and seeded with one admin account.
async fn spawn_app() -> TestApp {
    let repo = Arc::new(MemoryRepository::new());
    let admin = BootstrapAdmin {
        name: "Root".to_string(),
        email: ADMIN_EMAIL.to_string(),
        password: ADMIN_PASSWORD.to_string(),
    };
    assert!(ensure_admin(repo.as_ref(), &admin).await.unwrap());
    // Seeding is idempotent.
    assert!(!ensure_admin(repo.as_ref(), &admin).await.unwrap());

    let state = AppState::new(repo as RepositoryState, AppConfig::default());
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        client: reqwest::Client::new(),
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;

    let response = app.client.get(app.url("/health")).send().await.expect("req fail");

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn test_login_outcomes() {
    let app = spawn_app().await;

    let ok = app.login(ADMIN_EMAIL, ADMIN_PASSWORD, Some("admin")).await;
    assert_eq!(ok.status(), 200);
    let body: Value = ok.json().await.unwrap();
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["refresh_token"].as_str().is_some_and(|t| !t.is_empty()));

    let wrong_password = app.login(ADMIN_EMAIL, "not-the-password", None).await;
    assert_eq!(wrong_password.status(), 401);

    let wrong_role = app.login(ADMIN_EMAIL, ADMIN_PASSWORD, Some("user")).await;
    assert_eq!(wrong_role.status(), 401);

    let unknown_role = app.login(ADMIN_EMAIL, ADMIN_PASSWORD, Some("superuser")).await;
    assert_eq!(unknown_role.status(), 400);
}

#[tokio::test]
async fn test_admin_create_user_authorization() {
    let app = spawn_app().await;
    let new_user = json!({
        "name": "Plain User",
        "email": "plain@example.com",
        "password": "plain-password",
        "roles": ["user"]
    });

    let anonymous = app.create_user(None, new_user.clone()).await;
    assert_eq!(anonymous.status(), 401);

    let admin_token = app.token_for(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let created = app.create_user(Some(&admin_token), new_user).await;
    assert_eq!(created.status(), 201);
    let body: Value = created.json().await.unwrap();
    assert!(body["user_id"].as_str().is_some());

    let user_token = app.token_for("plain@example.com", "plain-password").await;
    let forbidden = app
        .create_user(
            Some(&user_token),
            json!({
                "name": "Another",
                "email": "another@example.com",
                "password": "another-password",
                "roles": ["user"]
            }),
        )
        .await;
    assert_eq!(forbidden.status(), 403);
    let body: Value = forbidden.json().await.unwrap();
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_restaurant_flow_over_http() {
    let app = spawn_app().await;
    let token = app.token_for(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let created = app
        .client
        .post(app.url("/api/v1/admin/restaurants"))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Harbour Fish",
            "address": "Pier 3",
            "latitude": 0.0,
            "longitude": 1.0,
            "rating": 4.2
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);
    let body: Value = created.json().await.unwrap();
    let restaurant_id = body["restaurant"]["id"].as_str().unwrap().to_string();

    let listed: Value = app
        .client
        .get(app.url("/api/v1/restaurants?limit=10&offset=0"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["restaurants"].as_array().unwrap().len(), 1);

    let address = app
        .client
        .post(app.url("/api/v1/users/address"))
        .bearer_auth(&token)
        .json(&json!({ "address": "Lighthouse", "latitude": 0.0, "longitude": 0.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(address.status(), 200);

    let distance: Value = app
        .client
        .get(app.url(&format!("/api/v1/restaurants/{restaurant_id}/distance")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let km = distance["distance_km"].as_f64().unwrap();
    assert!((km - 111.19).abs() < 0.5, "got {km}");
}

#[tokio::test]
async fn test_bad_input_is_a_json_400() {
    let app = spawn_app().await;

    let malformed = app
        .client
        .post(app.url("/api/v1/auth/login"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), 400);
    let body: Value = malformed.json().await.unwrap();
    assert!(body["error"].as_str().is_some());

    let bad_uuid = app
        .client
        .get(app.url("/api/v1/restaurants/abc/dishes"))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_uuid.status(), 400);

    let bad_page = app
        .client
        .get(app.url("/api/v1/restaurants?limit=0"))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_page.status(), 400);
}

#[tokio::test]
async fn test_unknown_route_and_openapi_document() {
    let app = spawn_app().await;

    let missing = app.client.get(app.url("/api/v1/nope")).send().await.unwrap();
    assert_eq!(missing.status(), 404);

    let docs = app
        .client
        .get(app.url("/api-docs/openapi.json"))
        .send()
        .await
        .unwrap();
    assert_eq!(docs.status(), 200);
    let doc: Value = docs.json().await.unwrap();
    assert!(doc["paths"]["/api/v1/auth/login"].is_object());
}
