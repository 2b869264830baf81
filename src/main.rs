use restaurant_api::{
    AppState,
    bootstrap::ensure_admin,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::{error::Error, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initializes logging, connects to Postgres and applies
/// migrations, seeds the bootstrap admin, then serves HTTP until killed.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // 1. Configuration (fails fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: pretty locally, JSON in production
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "restaurant_api=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Database
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(config.database.connect_options())
        .await
        .inspect_err(|e| {
            tracing::error!(
                error = %e,
                host = %config.database.host,
                database = %config.database.name,
                "failed to connect to Postgres"
            )
        })?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "database migration failed"))?;

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 4. First admin account
    if let Some(admin) = &config.bootstrap_admin {
        ensure_admin(repo.as_ref(), admin)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "failed to seed bootstrap admin"))?;
    }

    // 5. Router and server
    let server_addr = config.server_addr.clone();
    let app = create_router(AppState::new(repo, config));

    let listener = TcpListener::bind(&server_addr).await?;

    tracing::info!("Listening on {server_addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://{server_addr}/swagger-ui");

    axum::serve(listener, app).await?;
    Ok(())
}
