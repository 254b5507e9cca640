//! Movement log queries.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::dto::MovementResponse;
use crate::error::ApiError;
use crate::state::AppState;
use pt_core::db::{create_movement_repository, MovementFilter};

/// Creates movement routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_movements))
}

/// Optional filters for the movement log.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MovementQuery {
    /// Only movements of this asset.
    pub asset_id: Option<Uuid>,
    /// Only movements through this sensor.
    pub sensor_id: Option<Uuid>,
}

/// List movements, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/movements",
    params(MovementQuery),
    responses(
        (status = 200, description = "Movement log", body = Vec<MovementResponse>)
    ),
    tag = "Movements"
)]
async fn list_movements(
    State(state): State<AppState>,
    Query(query): Query<MovementQuery>,
) -> Result<Json<Vec<MovementResponse>>, ApiError> {
    let repo = create_movement_repository(&state.db);
    let filter = MovementFilter {
        asset_id: query.asset_id,
        sensor_id: query.sensor_id,
    };
    let movements = repo.list(&filter).await?;

    Ok(Json(movements.into_iter().map(Into::into).collect()))
}
