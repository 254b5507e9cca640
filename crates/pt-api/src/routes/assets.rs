//! Asset management endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dto::{AssetResponse, MovementResponse};
use crate::error::ApiError;
use crate::state::AppState;
use pt_core::db::{
    create_asset_repository, create_location_repository, create_movement_repository, AssetUpdate,
};
use pt_core::Asset;

/// Creates asset routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_assets).post(create_asset))
        .route(
            "/:id",
            get(get_asset).put(update_asset).delete(delete_asset),
        )
        .route("/:id/movements", get(asset_movements))
}

// ============================================================================
// DTOs
// ============================================================================

/// Request body for registering an asset.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAssetRequest {
    /// External tag, unique across assets. Also accepted as `epc`.
    #[serde(alias = "epc")]
    #[validate(length(min = 1, max = 128))]
    pub external_tag: String,
    /// Display name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Where the asset starts out.
    pub location_id: Uuid,
    /// Initial last-seen time. Defaults to now.
    pub seen_at: Option<DateTime<Utc>>,
}

/// Request body for updating an asset.
///
/// Location is only ever changed by detections.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAssetRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List all assets in registration order.
#[utoipa::path(
    get,
    path = "/api/v1/assets",
    responses(
        (status = 200, description = "All assets", body = Vec<AssetResponse>)
    ),
    tag = "Assets"
)]
async fn list_assets(State(state): State<AppState>) -> Result<Json<Vec<AssetResponse>>, ApiError> {
    let repo = create_asset_repository(&state.db);
    let assets = repo.list().await?;
    Ok(Json(assets.into_iter().map(Into::into).collect()))
}

/// Register an asset at its initial location.
#[utoipa::path(
    post,
    path = "/api/v1/assets",
    request_body = CreateAssetRequest,
    responses(
        (status = 201, description = "Asset created", body = AssetResponse),
        (status = 404, description = "Initial location not found"),
        (status = 409, description = "External tag already registered"),
        (status = 422, description = "Invalid request")
    ),
    tag = "Assets"
)]
async fn create_asset(
    State(state): State<AppState>,
    Json(request): Json<CreateAssetRequest>,
) -> Result<(StatusCode, Json<AssetResponse>), ApiError> {
    request.validate()?;

    let locations = create_location_repository(&state.db);
    if locations.get(request.location_id).await?.is_none() {
        return Err(ApiError::NotFound(format!(
            "Location {} not found",
            request.location_id
        )));
    }

    let repo = create_asset_repository(&state.db);
    if repo.get_by_tag(&request.external_tag).await?.is_some() {
        return Err(ApiError::Conflict(format!(
            "Asset with tag '{}' already exists",
            request.external_tag
        )));
    }

    let asset = Asset::new(
        request.external_tag,
        request.name,
        request.location_id,
        request.seen_at.unwrap_or_else(Utc::now),
    );
    // The unique index still guards against a concurrent create with the same tag.
    let created = repo.create(&asset).await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Get an asset by id.
#[utoipa::path(
    get,
    path = "/api/v1/assets/{id}",
    params(("id" = Uuid, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Asset details", body = AssetResponse),
        (status = 404, description = "Asset not found")
    ),
    tag = "Assets"
)]
async fn get_asset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AssetResponse>, ApiError> {
    let repo = create_asset_repository(&state.db);
    let asset = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Asset {} not found", id)))?;

    Ok(Json(asset.into()))
}

/// Rename an asset.
#[utoipa::path(
    put,
    path = "/api/v1/assets/{id}",
    params(("id" = Uuid, Path, description = "Asset ID")),
    request_body = UpdateAssetRequest,
    responses(
        (status = 200, description = "Asset updated", body = AssetResponse),
        (status = 404, description = "Asset not found")
    ),
    tag = "Assets"
)]
async fn update_asset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAssetRequest>,
) -> Result<Json<AssetResponse>, ApiError> {
    request.validate()?;

    let repo = create_asset_repository(&state.db);
    let asset = repo.update(id, &AssetUpdate { name: request.name }).await?;

    Ok(Json(asset.into()))
}

/// Delete an asset together with its movement history.
#[utoipa::path(
    delete,
    path = "/api/v1/assets/{id}",
    params(("id" = Uuid, Path, description = "Asset ID")),
    responses(
        (status = 204, description = "Asset deleted"),
        (status = 404, description = "Asset not found")
    ),
    tag = "Assets"
)]
async fn delete_asset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = create_asset_repository(&state.db);
    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Asset {} not found", id)))
    }
}

/// Movement history of one asset, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/assets/{id}/movements",
    params(("id" = Uuid, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Movement history", body = Vec<MovementResponse>),
        (status = 404, description = "Asset not found")
    ),
    tag = "Assets"
)]
async fn asset_movements(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MovementResponse>>, ApiError> {
    let assets = create_asset_repository(&state.db);
    if assets.get(id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Asset {} not found", id)));
    }

    let movements = create_movement_repository(&state.db);
    let history = movements.list_for_asset(id).await?;

    Ok(Json(history.into_iter().map(Into::into).collect()))
}
