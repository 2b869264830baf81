use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::{AuthUser, require_any_role},
    error::{ApiError, ErrorBody},
    extract::{AppJson, AppPath, AppQuery},
    geo,
    models::{
        CreateDishRequest, CreateRestaurantRequest, Dish, DishListResponse, DishResponse,
        DistanceResponse, MessageResponse, Restaurant, RestaurantListResponse, RestaurantResponse,
        Role,
    },
    validation::PageParams,
};

const MANAGERS: &[Role] = &[Role::Admin, Role::SubAdmin];

/// list_restaurants
///
/// [Public Route] Lists active restaurants, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/restaurants",
    params(PageParams),
    responses(
        (status = 200, description = "Restaurants", body = RestaurantListResponse),
        (status = 400, description = "Invalid pagination", body = ErrorBody)
    )
)]
pub async fn list_restaurants(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<RestaurantListResponse>, ApiError> {
    let restaurants = state.repo.list_restaurants(params.into_page()?).await?;
    Ok(Json(RestaurantListResponse { restaurants }))
}

/// list_all_restaurants
///
/// [Admin Route] Same listing as the public one, behind the admin guard.
#[utoipa::path(
    get,
    path = "/api/v1/admin/restaurants",
    params(PageParams),
    responses(
        (status = 200, description = "Restaurants", body = RestaurantListResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorBody)
    )
)]
pub async fn list_all_restaurants(
    auth: AuthUser,
    State(state): State<AppState>,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<RestaurantListResponse>, ApiError> {
    require_any_role(&auth, &[Role::Admin], "only admins can list all restaurants")?;
    let restaurants = state.repo.list_restaurants(params.into_page()?).await?;
    Ok(Json(RestaurantListResponse { restaurants }))
}

/// list_sub_admin_restaurants
///
/// [Sub-Admin Route] Restaurants created by users who hold the `sub_admin` role.
#[utoipa::path(
    get,
    path = "/api/v1/sub-admin/restaurants",
    params(PageParams),
    responses(
        (status = 200, description = "Restaurants created by sub-admins", body = RestaurantListResponse),
        (status = 403, description = "Caller is neither admin nor sub-admin", body = ErrorBody)
    )
)]
pub async fn list_sub_admin_restaurants(
    auth: AuthUser,
    State(state): State<AppState>,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<RestaurantListResponse>, ApiError> {
    require_any_role(&auth, MANAGERS, "only admins and sub-admins can list these restaurants")?;
    let restaurants = state
        .repo
        .list_restaurants_created_by_role(Role::SubAdmin, params.into_page()?)
        .await?;
    Ok(Json(RestaurantListResponse { restaurants }))
}

/// create_restaurant
///
/// [Sub-Admin Route] Creates a restaurant owned by the caller.
#[utoipa::path(
    post,
    path = "/api/v1/admin/restaurants",
    request_body = CreateRestaurantRequest,
    responses(
        (status = 201, description = "Restaurant created", body = RestaurantResponse),
        (status = 400, description = "Invalid body", body = ErrorBody),
        (status = 403, description = "Caller is neither admin nor sub-admin", body = ErrorBody)
    )
)]
pub async fn create_restaurant(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateRestaurantRequest>,
) -> Result<(StatusCode, Json<RestaurantResponse>), ApiError> {
    require_any_role(&auth, MANAGERS, "only admins and sub-admins can create restaurants")?;
    payload.validate()?;

    let restaurant = Restaurant {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_string(),
        address: payload.address.trim().to_string(),
        latitude: payload.latitude,
        longitude: payload.longitude,
        created_by: auth.id,
        rating: payload.rating,
        created_at: Utc::now(),
        archived_at: None,
    };

    state
        .repo
        .create_restaurant(restaurant.clone())
        .await
        .map_err(|e| ApiError::internal("failed to create restaurant", e))?;

    tracing::info!(restaurant_id = %restaurant.id, created_by = %auth.id, "restaurant created successfully");
    Ok((StatusCode::CREATED, Json(RestaurantResponse { restaurant })))
}

/// archive_restaurant
///
/// [Admin Route] Soft-deletes a restaurant together with its dishes.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/restaurants/{id}",
    params(("id" = Uuid, Path, description = "Restaurant ID")),
    responses(
        (status = 200, description = "Restaurant archived", body = MessageResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 404, description = "No such restaurant", body = ErrorBody)
    )
)]
pub async fn archive_restaurant(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_any_role(&auth, &[Role::Admin], "only admins can delete restaurants")?;

    if state.repo.archive_restaurant(id).await? {
        tracing::info!(restaurant_id = %id, archived_by = %auth.id, "restaurant archived");
        Ok(Json(MessageResponse::new("restaurant deleted successfully")))
    } else {
        Err(ApiError::not_found("restaurant not found"))
    }
}

/// list_dishes
///
/// [Public Route] Dishes of one restaurant. 404 when the restaurant itself is
/// unknown or archived; an existing restaurant without dishes gives an empty list.
#[utoipa::path(
    get,
    path = "/api/v1/restaurants/{id}/dishes",
    params(("id" = Uuid, Path, description = "Restaurant ID")),
    responses(
        (status = 200, description = "Dishes", body = DishListResponse),
        (status = 400, description = "Invalid id", body = ErrorBody),
        (status = 404, description = "No such restaurant", body = ErrorBody)
    )
)]
pub async fn list_dishes(
    State(state): State<AppState>,
    AppPath(restaurant_id): AppPath<Uuid>,
) -> Result<Json<DishListResponse>, ApiError> {
    if state.repo.find_restaurant(restaurant_id).await?.is_none() {
        return Err(ApiError::not_found("restaurant not found"));
    }
    let dishes = state.repo.list_dishes(restaurant_id).await?;
    Ok(Json(DishListResponse { dishes }))
}

/// create_dish
///
/// [Sub-Admin Route] Adds a dish to an existing restaurant.
#[utoipa::path(
    post,
    path = "/api/v1/admin/dishes",
    request_body = CreateDishRequest,
    responses(
        (status = 201, description = "Dish created", body = DishResponse),
        (status = 400, description = "Invalid body", body = ErrorBody),
        (status = 403, description = "Caller is neither admin nor sub-admin", body = ErrorBody),
        (status = 404, description = "No such restaurant", body = ErrorBody)
    )
)]
pub async fn create_dish(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateDishRequest>,
) -> Result<(StatusCode, Json<DishResponse>), ApiError> {
    require_any_role(&auth, MANAGERS, "only admins and sub-admins can create dishes")?;
    payload.validate()?;

    if state.repo.find_restaurant(payload.restaurant_id).await?.is_none() {
        return Err(ApiError::not_found("restaurant not found"));
    }

    let dish = Dish {
        id: Uuid::new_v4(),
        restaurant_id: payload.restaurant_id,
        name: payload.name.trim().to_string(),
        description: payload.description,
        price: payload.price,
        created_by: auth.id,
        created_at: Utc::now(),
        archived_at: None,
    };

    state
        .repo
        .create_dish(dish.clone())
        .await
        .map_err(|e| ApiError::internal("failed to create dish", e))?;

    tracing::info!(dish_id = %dish.id, restaurant_id = %dish.restaurant_id, "dish created");
    Ok((StatusCode::CREATED, Json(DishResponse { dish })))
}

/// archive_dish
///
/// [Sub-Admin Route] Soft-deletes a dish.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/dishes/{id}",
    params(("id" = Uuid, Path, description = "Dish ID")),
    responses(
        (status = 200, description = "Dish archived", body = MessageResponse),
        (status = 403, description = "Caller is neither admin nor sub-admin", body = ErrorBody),
        (status = 404, description = "No such dish", body = ErrorBody)
    )
)]
pub async fn archive_dish(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_any_role(&auth, MANAGERS, "only admins and sub-admins can delete dishes")?;

    if state.repo.archive_dish(id).await? {
        Ok(Json(MessageResponse::new("dish deleted successfully")))
    } else {
        Err(ApiError::not_found("dish not found"))
    }
}

/// restaurant_distance
///
/// [Authenticated Route] Great-circle distance in km from the caller's primary
/// address to a restaurant.
#[utoipa::path(
    get,
    path = "/api/v1/restaurants/{id}/distance",
    params(("id" = Uuid, Path, description = "Restaurant ID")),
    responses(
        (status = 200, description = "Distance computed", body = DistanceResponse),
        (status = 400, description = "Invalid id or missing coordinates", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 404, description = "No primary address or no such restaurant", body = ErrorBody)
    )
)]
pub async fn restaurant_distance(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(restaurant_id): AppPath<Uuid>,
) -> Result<Json<DistanceResponse>, ApiError> {
    let address = state
        .repo
        .find_primary_address(auth.id)
        .await?
        .ok_or_else(|| ApiError::not_found("user address not found"))?;

    let restaurant = state
        .repo
        .find_restaurant(restaurant_id)
        .await?
        .ok_or_else(|| ApiError::not_found("restaurant not found"))?;

    let (Some(from_lat), Some(from_lon), Some(to_lat), Some(to_lon)) = (
        address.latitude,
        address.longitude,
        restaurant.latitude,
        restaurant.longitude,
    ) else {
        return Err(ApiError::validation(
            "missing coordinates for distance calculation",
        ));
    };

    Ok(Json(DistanceResponse {
        distance_km: geo::distance_km(from_lat, from_lon, to_lat, to_lon),
        message: "Distance calculated successfully".to_string(),
    }))
}
