//! API routes.

pub mod assets;
pub mod detections;
pub mod health;
pub mod locations;
pub mod metrics;
pub mod movements;
pub mod sensors;
pub mod stats;

use crate::state::AppState;
use axum::Router;

/// Creates the main API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Versioned API endpoint
        .nest("/api/v1", api_routes())
        // Unversioned alias
        .nest("/api", api_routes())
        .merge(health::routes())
        .merge(metrics::routes())
        .with_state(state)
}

/// API routes under /api prefix.
fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/locations", locations::routes())
        .nest("/assets", assets::routes())
        .nest("/sensors", sensors::routes())
        .nest("/detections", detections::routes())
        .nest("/movements", movements::routes())
        .nest("/stats", stats::routes())
}
