//! Sensor management endpoints.

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

use crate::dto::SensorResponse;
use crate::error::ApiError;
use crate::state::AppState;
use pt_core::db::{create_location_repository, create_sensor_repository, DbPool, SensorUpdate};
use pt_core::Sensor;

/// Creates sensor routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sensors).post(create_sensor))
        .route(
            "/:id",
            get(get_sensor).put(update_sensor).delete(delete_sensor),
        )
}

// ============================================================================
// DTOs
// ============================================================================

/// Request body for installing a sensor between two locations.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSensorRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Location an asset leaves when passing in the forward direction.
    pub exit_location_id: Uuid,
    /// Location an asset arrives at when passing in the forward direction.
    pub entry_location_id: Uuid,
}

/// Request body for updating a sensor. Omitted fields keep their value.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSensorRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub exit_location_id: Option<Uuid>,
    pub entry_location_id: Option<Uuid>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List all sensors in installation order.
#[utoipa::path(
    get,
    path = "/api/v1/sensors",
    responses(
        (status = 200, description = "All sensors", body = Vec<SensorResponse>)
    ),
    tag = "Sensors"
)]
async fn list_sensors(
    State(state): State<AppState>,
) -> Result<Json<Vec<SensorResponse>>, ApiError> {
    let repo = create_sensor_repository(&state.db);
    let sensors = repo.list().await?;
    Ok(Json(sensors.into_iter().map(Into::into).collect()))
}

/// Install a sensor.
#[utoipa::path(
    post,
    path = "/api/v1/sensors",
    request_body = CreateSensorRequest,
    responses(
        (status = 201, description = "Sensor created", body = SensorResponse),
        (status = 404, description = "Location not found"),
        (status = 422, description = "Exit and entry locations are the same")
    ),
    tag = "Sensors"
)]
async fn create_sensor(
    State(state): State<AppState>,
    Json(request): Json<CreateSensorRequest>,
) -> Result<(StatusCode, Json<SensorResponse>), ApiError> {
    request.validate()?;

    let sensor = Sensor::new(
        request.name,
        request.exit_location_id,
        request.entry_location_id,
    );
    check_sides(&state.db, &sensor).await?;

    let repo = create_sensor_repository(&state.db);
    let created = repo.create(&sensor).await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Get a sensor by id.
#[utoipa::path(
    get,
    path = "/api/v1/sensors/{id}",
    params(("id" = Uuid, Path, description = "Sensor ID")),
    responses(
        (status = 200, description = "Sensor details", body = SensorResponse),
        (status = 404, description = "Sensor not found")
    ),
    tag = "Sensors"
)]
async fn get_sensor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SensorResponse>, ApiError> {
    let repo = create_sensor_repository(&state.db);
    let sensor = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Sensor {} not found", id)))?;

    Ok(Json(sensor.into()))
}

/// Rename a sensor or change the locations it separates.
#[utoipa::path(
    put,
    path = "/api/v1/sensors/{id}",
    params(("id" = Uuid, Path, description = "Sensor ID")),
    request_body = UpdateSensorRequest,
    responses(
        (status = 200, description = "Sensor updated", body = SensorResponse),
        (status = 404, description = "Sensor or location not found"),
        (status = 422, description = "Exit and entry locations would be the same")
    ),
    tag = "Sensors"
)]
async fn update_sensor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateSensorRequest>,
) -> Result<Json<SensorResponse>, ApiError> {
    request.validate()?;

    let repo = create_sensor_repository(&state.db);
    let current = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Sensor {} not found", id)))?;

    let update = SensorUpdate {
        name: request.name,
        exit_location_id: request.exit_location_id,
        entry_location_id: request.entry_location_id,
    };
    check_sides(&state.db, &update.apply_to(&current)).await?;

    let sensor = repo.update(id, &update).await?;
    Ok(Json(sensor.into()))
}

/// Remove a sensor. Fails with 409 while movements reference it.
#[utoipa::path(
    delete,
    path = "/api/v1/sensors/{id}",
    params(("id" = Uuid, Path, description = "Sensor ID")),
    responses(
        (status = 204, description = "Sensor deleted"),
        (status = 404, description = "Sensor not found"),
        (status = 409, description = "Sensor has recorded movements")
    ),
    tag = "Sensors"
)]
async fn delete_sensor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = create_sensor_repository(&state.db);
    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Sensor {} not found", id)))
    }
}

/// Both sides must exist and differ.
async fn check_sides(db: &DbPool, sensor: &Sensor) -> Result<(), ApiError> {
    if !sensor.has_distinct_sides() {
        return Err(ApiError::validation_field(
            "entry_location_id",
            "distinct_locations",
            "Exit and entry locations must be different",
        ));
    }

    let locations = create_location_repository(db);
    for location_id in [sensor.exit_location_id, sensor.entry_location_id] {
        if locations.get(location_id).await?.is_none() {
            return Err(ApiError::NotFound(format!(
                "Location {} not found",
                location_id
            )));
        }
    }

    Ok(())
}
