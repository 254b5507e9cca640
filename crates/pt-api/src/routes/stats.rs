//! Dashboard counters.

use axum::{extract::State, routing::get, Json, Router};
use chrono::{Duration, Utc};

use crate::dto::StatsResponse;
use crate::error::ApiError;
use crate::state::AppState;
use pt_core::db::{
    create_asset_repository, create_location_repository, create_movement_repository,
    create_sensor_repository,
};

/// Creates stats routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(get_stats))
}

/// Totals per entity plus movements in the last 24 hours.
#[utoipa::path(
    get,
    path = "/api/v1/stats",
    responses(
        (status = 200, description = "Dashboard counters", body = StatsResponse)
    ),
    tag = "Stats"
)]
async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let movements = create_movement_repository(&state.db);
    let since = Utc::now() - Duration::hours(24);

    Ok(Json(StatsResponse {
        total_assets: create_asset_repository(&state.db).count().await?,
        total_locations: create_location_repository(&state.db).count().await?,
        total_sensors: create_sensor_repository(&state.db).count().await?,
        total_movements: movements.count().await?,
        movements_last_24h: movements.count_since(since).await?,
    }))
}
