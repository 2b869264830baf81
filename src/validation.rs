use serde::Deserialize;
use std::collections::HashSet;
use utoipa::IntoParams;
use validator::ValidationError;

use crate::{
    error::ApiError,
    models::{CreateAddressRequest, CreateRestaurantRequest, Role},
    repository::Page,
};

// Rules referenced from `#[validate(custom(...))]` and `#[validate(schema(...))]`
// on the request payloads in `models`.

/// Whitespace-only input counts as missing.
pub fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

pub fn unique_roles(roles: &[Role]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    match roles.iter().find(|role| !seen.insert(**role)) {
        Some(duplicate) => Err(ValidationError::new("duplicate_role")
            .with_message(format!("duplicate role: {duplicate}").into())),
        None => Ok(()),
    }
}

pub fn restaurant_coordinates(request: &CreateRestaurantRequest) -> Result<(), ValidationError> {
    coordinate_pair(request.latitude, request.longitude)
}

pub fn address_coordinates(request: &CreateAddressRequest) -> Result<(), ValidationError> {
    coordinate_pair(request.latitude, request.longitude)
}

// Ranges are checked per field; this only rejects a half-given pair.
fn coordinate_pair(latitude: Option<f64>, longitude: Option<f64>) -> Result<(), ValidationError> {
    if latitude.is_some() != longitude.is_some() {
        return Err(ValidationError::new("coordinates_pair")
            .with_message("latitude and longitude must be provided together".into()));
    }
    Ok(())
}

/// PageParams
///
/// `?limit=&offset=` on every list endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Page size, 1 to 100. Defaults to 20.
    pub limit: Option<i64>,
    /// Rows to skip. Defaults to 0.
    pub offset: Option<i64>,
}

impl PageParams {
    pub fn into_page(self) -> Result<Page, ApiError> {
        let limit = self.limit.unwrap_or(Page::DEFAULT_LIMIT);
        let offset = self.offset.unwrap_or(0);
        if !(1..=Page::MAX_LIMIT).contains(&limit) {
            return Err(ApiError::validation(format!(
                "limit must be between 1 and {}",
                Page::MAX_LIMIT
            )));
        }
        if offset < 0 {
            return Err(ApiError::validation("offset must not be negative"));
        }
        Ok(Page { limit, offset })
    }
}
