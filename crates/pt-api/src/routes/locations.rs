//! Location management endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dto::LocationResponse;
use crate::error::ApiError;
use crate::state::AppState;
use pt_core::db::{create_location_repository, LocationUpdate};
use pt_core::Location;

/// Creates location routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_locations).post(create_location))
        .route(
            "/:id",
            get(get_location).put(update_location).delete(delete_location),
        )
}

// ============================================================================
// DTOs
// ============================================================================

/// Request body for creating a location.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLocationRequest {
    /// Display name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

/// Request body for updating a location.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateLocationRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List all locations in creation order.
#[utoipa::path(
    get,
    path = "/api/v1/locations",
    responses(
        (status = 200, description = "All locations", body = Vec<LocationResponse>)
    ),
    tag = "Locations"
)]
async fn list_locations(
    State(state): State<AppState>,
) -> Result<Json<Vec<LocationResponse>>, ApiError> {
    let repo = create_location_repository(&state.db);
    let locations = repo.list().await?;
    Ok(Json(locations.into_iter().map(Into::into).collect()))
}

/// Create a location.
#[utoipa::path(
    post,
    path = "/api/v1/locations",
    request_body = CreateLocationRequest,
    responses(
        (status = 201, description = "Location created", body = LocationResponse),
        (status = 422, description = "Invalid request")
    ),
    tag = "Locations"
)]
async fn create_location(
    State(state): State<AppState>,
    Json(request): Json<CreateLocationRequest>,
) -> Result<(StatusCode, Json<LocationResponse>), ApiError> {
    request.validate()?;

    let repo = create_location_repository(&state.db);
    let location = repo.create(&Location::new(request.name)).await?;

    Ok((StatusCode::CREATED, Json(location.into())))
}

/// Get a location by id.
#[utoipa::path(
    get,
    path = "/api/v1/locations/{id}",
    params(("id" = Uuid, Path, description = "Location ID")),
    responses(
        (status = 200, description = "Location details", body = LocationResponse),
        (status = 404, description = "Location not found")
    ),
    tag = "Locations"
)]
async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LocationResponse>, ApiError> {
    let repo = create_location_repository(&state.db);
    let location = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Location {} not found", id)))?;

    Ok(Json(location.into()))
}

/// Rename a location.
#[utoipa::path(
    put,
    path = "/api/v1/locations/{id}",
    params(("id" = Uuid, Path, description = "Location ID")),
    request_body = UpdateLocationRequest,
    responses(
        (status = 200, description = "Location updated", body = LocationResponse),
        (status = 404, description = "Location not found")
    ),
    tag = "Locations"
)]
async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateLocationRequest>,
) -> Result<Json<LocationResponse>, ApiError> {
    request.validate()?;

    let repo = create_location_repository(&state.db);
    let location = repo
        .update(id, &LocationUpdate { name: request.name })
        .await?;

    Ok(Json(location.into()))
}

/// Delete a location. Fails with 409 while assets, sensors or movements
/// still reference it.
#[utoipa::path(
    delete,
    path = "/api/v1/locations/{id}",
    params(("id" = Uuid, Path, description = "Location ID")),
    responses(
        (status = 204, description = "Location deleted"),
        (status = 404, description = "Location not found"),
        (status = 409, description = "Location is still referenced")
    ),
    tag = "Locations"
)]
async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = create_location_repository(&state.db);
    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Location {} not found", id)))
    }
}
