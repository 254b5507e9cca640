//! Detection ingestion.
//!
//! Each accepted detection moves one asset across one sensor and returns the
//! movement it produced.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dto::MovementResponse;
use crate::error::ApiError;
use crate::state::AppState;
use pt_core::Detection;

/// Creates detection routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/", post(process_detection))
}

/// A sensor sighting of a tagged asset.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DetectionRequest {
    /// Reporting sensor.
    pub sensor_id: Uuid,
    /// External tag of the sighted asset. Also accepted as `epc`.
    #[serde(alias = "epc")]
    #[validate(length(min = 1, max = 128))]
    pub tag: String,
    /// When the sighting happened. Defaults to the time of receipt.
    pub detected_at: Option<DateTime<Utc>>,
}

/// Apply a detection.
#[utoipa::path(
    post,
    path = "/api/v1/detections",
    request_body = DetectionRequest,
    responses(
        (status = 201, description = "Movement recorded", body = MovementResponse),
        (status = 404, description = "Unknown sensor or tag"),
        (status = 409, description = "Asset kept changing concurrently"),
        (status = 422, description = "Stale detection or rejected location mismatch")
    ),
    tag = "Detections"
)]
async fn process_detection(
    State(state): State<AppState>,
    Json(request): Json<DetectionRequest>,
) -> Result<(StatusCode, Json<MovementResponse>), ApiError> {
    request.validate()?;

    let detection = Detection::new(
        request.sensor_id,
        request.tag,
        request.detected_at.unwrap_or_else(Utc::now),
    );
    debug!(sensor_id = %detection.sensor_id, tag = %detection.tag, "Detection received");

    let record = state
        .processor()
        .process_with_retry(&detection, &state.tracking.retry)
        .await?;

    Ok((StatusCode::CREATED, Json(record.into())))
}
