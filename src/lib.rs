use axum::{Router, extract::FromRef, http::HeaderName, middleware, routing::get};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extract;
pub mod geo;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod validation;

// Routers segregated by access level (public, authenticated, admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use auth::{AuthUser, TokenIssuer, TokenState, auth_middleware};
pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{MemoryRepository, PostgresRepository, Repository, RepositoryState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::auth::login, handlers::auth::refresh, handlers::auth::logout,
        handlers::users::get_me, handlers::users::create_user, handlers::users::list_users,
        handlers::users::list_sub_admins, handlers::users::archive_user,
        handlers::users::create_address, handlers::users::list_addresses,
        handlers::restaurants::list_restaurants, handlers::restaurants::list_all_restaurants,
        handlers::restaurants::list_sub_admin_restaurants, handlers::restaurants::create_restaurant,
        handlers::restaurants::archive_restaurant, handlers::restaurants::list_dishes,
        handlers::restaurants::create_dish, handlers::restaurants::archive_dish,
        handlers::restaurants::restaurant_distance,
    ),
    components(
        schemas(
            models::Role, models::UserSummary, models::Restaurant, models::Dish,
            models::UserAddress, models::LoginRequest, models::RefreshTokenRequest,
            models::CreateUserRequest, models::CreateRestaurantRequest, models::CreateDishRequest,
            models::CreateAddressRequest, models::HealthResponse, models::MessageResponse,
            models::LoginResponse, models::TokenResponse, models::CreateUserResponse,
            models::MeResponse, models::UserListResponse, models::SubAdminListResponse,
            models::RestaurantListResponse, models::RestaurantResponse, models::DishListResponse,
            models::DishResponse, models::AddressListResponse, models::DistanceResponse,
            error::ErrorBody,
        )
    ),
    tags(
        (name = "restaurant-api", description = "Restaurant directory API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single immutable container shared by every request: persistence, token
/// signing and configuration. Handlers take `State<AppState>`; extractors pull
/// single parts through the `FromRef` impls below.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub tokens: TokenState,
    pub config: AppConfig,
}

impl AppState {
    /// Builds the state with a token issuer derived from `config`.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        let tokens = TokenState::new(TokenIssuer::from_config(&config));
        Self {
            repo,
            tokens,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for TokenState {
    fn from_ref(app_state: &AppState) -> TokenState {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles every route under `/api/v1`, puts the authenticated and admin
/// routers behind [`auth_middleware`], and wraps the whole app in the
/// request-id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let api = Router::new()
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .merge(
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        );

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health))
        .nest("/api/v1", api)
        .fallback(|| async { ApiError::not_found("route not found") })
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the `http_request` span for `TraceLayer`, tagging every log line of a
/// request with its method, URI and `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

