use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::env;

const LOCAL_JWT_SECRET: &str = "restaurant-api-local-development-secret";

/// AppConfig
///
/// Holds the application's entire configuration state. It is read once at start-up,
/// never mutated afterwards, and pulled into handlers through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls logging format and fail-fast rules.
    pub env: Env,
    // Postgres connection parameters.
    pub database: DatabaseConfig,
    // Symmetric secret used to sign and verify access tokens.
    pub jwt_secret: String,
    // Lifetime of a signed access token.
    pub access_token_ttl_minutes: i64,
    // Lifetime of a persisted refresh token (session).
    pub refresh_token_ttl_days: i64,
    // Address the HTTP listener binds to.
    pub server_addr: String,
    // Optional first admin account created at start-up when absent.
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Env
///
/// Defines the runtime context: pretty logs and development defaults locally,
/// JSON logs and mandatory secrets in production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// DatabaseConfig
///
/// The individual Postgres connection parameters (`DB_HOST`, `DB_PORT`, ...).
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Builds sqlx connection options. TLS is disabled, matching the local Docker setup.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.name)
            .username(&self.user)
            .password(&self.password)
            .ssl_mode(PgSslMode::Disable)
    }
}

/// Credentials of the admin seeded by [`crate::bootstrap::ensure_admin`].
#[derive(Clone, Debug)]
pub struct BootstrapAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Default for AppConfig {
    /// default
    ///
    /// Safe, non-panicking configuration for test scaffolding. No environment
    /// variables are read.
    fn default() -> Self {
        Self {
            env: Env::Local,
            database: DatabaseConfig {
                host: "localhost".to_string(),
                port: 5432,
                name: "restaurant_test".to_string(),
                user: "postgres".to_string(),
                password: "postgres".to_string(),
                max_connections: 5,
            },
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            access_token_ttl_minutes: 60,
            refresh_token_ttl_days: 7,
            server_addr: "127.0.0.1:8005".to_string(),
            bootstrap_admin: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from the environment. Call `dotenv::dotenv()` first
    /// if a `.env` file should be honoured.
    ///
    /// # Panics
    /// In production, panics when `JWT_SECRET` or any database credential is
    /// missing, or when a numeric variable cannot be parsed. The process must not
    /// start with an incomplete or insecure configuration.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match env {
            Env::Production => {
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production.")
            }
            Env::Local => env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
        };

        let database = match env {
            Env::Production => DatabaseConfig {
                host: env::var("DB_HOST").expect("FATAL: DB_HOST required in prod"),
                port: parse_var("DB_PORT").expect("FATAL: DB_PORT required in prod"),
                name: env::var("DB_NAME").expect("FATAL: DB_NAME required in prod"),
                user: env::var("DB_USER").expect("FATAL: DB_USER required in prod"),
                password: env::var("DB_PASS").expect("FATAL: DB_PASS required in prod"),
                max_connections: parse_var("DB_MAX_CONNECTIONS").unwrap_or(10),
            },
            Env::Local => DatabaseConfig {
                host: env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
                port: parse_var("DB_PORT").unwrap_or(5432),
                name: env::var("DB_NAME").unwrap_or_else(|_| "restaurant".to_string()),
                user: env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string()),
                password: env::var("DB_PASS").unwrap_or_else(|_| "postgres".to_string()),
                max_connections: parse_var("DB_MAX_CONNECTIONS").unwrap_or(5),
            },
        };

        let bootstrap_admin = match (
            env::var("BOOTSTRAP_ADMIN_EMAIL"),
            env::var("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) => Some(BootstrapAdmin {
                name: env::var("BOOTSTRAP_ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string()),
                email,
                password,
            }),
            _ => None,
        };

        Self {
            env,
            database,
            jwt_secret,
            access_token_ttl_minutes: parse_var("ACCESS_TOKEN_TTL_MINUTES").unwrap_or(60),
            refresh_token_ttl_days: parse_var("REFRESH_TOKEN_TTL_DAYS").unwrap_or(7),
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8005".to_string()),
            bootstrap_admin,
        }
    }
}

/// Reads and parses an optional variable. A present but unparsable value is fatal.
fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => panic!("FATAL: {key} has an invalid value: {raw:?}"),
    }
}
