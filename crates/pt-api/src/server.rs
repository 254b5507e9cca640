//! API server implementation.

use axum::{middleware, routing::get, Json, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use utoipa::OpenApi;

use crate::dto::*;
use crate::error::ErrorResponse;
use crate::middleware::{cors_layer, request_id, request_logging};
use crate::routes;
use crate::routes::assets::{CreateAssetRequest, UpdateAssetRequest};
use crate::routes::detections::DetectionRequest;
use crate::routes::locations::{CreateLocationRequest, UpdateLocationRequest};
use crate::routes::sensors::{CreateSensorRequest, UpdateSensorRequest};
use crate::state::AppState;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Address to bind to.
    pub bind_address: SocketAddr,
    /// Request timeout.
    pub request_timeout: Duration,
    /// Serve the OpenAPI document at `/api-docs/openapi.json`.
    pub enable_openapi: bool,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            request_timeout: Duration::from_secs(30),
            enable_openapi: true,
        }
    }
}

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health_check,
        crate::routes::health::readiness_check,
        crate::routes::health::liveness_check,
        crate::routes::metrics::prometheus_metrics,
        crate::routes::locations::list_locations,
        crate::routes::locations::create_location,
        crate::routes::locations::get_location,
        crate::routes::locations::update_location,
        crate::routes::locations::delete_location,
        crate::routes::assets::list_assets,
        crate::routes::assets::create_asset,
        crate::routes::assets::get_asset,
        crate::routes::assets::update_asset,
        crate::routes::assets::delete_asset,
        crate::routes::assets::asset_movements,
        crate::routes::sensors::list_sensors,
        crate::routes::sensors::create_sensor,
        crate::routes::sensors::get_sensor,
        crate::routes::sensors::update_sensor,
        crate::routes::sensors::delete_sensor,
        crate::routes::detections::process_detection,
        crate::routes::movements::list_movements,
        crate::routes::stats::get_stats,
    ),
    components(
        schemas(
            HealthResponse,
            DatabaseHealth,
            LocationResponse,
            AssetResponse,
            SensorResponse,
            MovementResponse,
            StatsResponse,
            CreateLocationRequest,
            UpdateLocationRequest,
            CreateAssetRequest,
            UpdateAssetRequest,
            CreateSensorRequest,
            UpdateSensorRequest,
            DetectionRequest,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Locations", description = "Location management"),
        (name = "Assets", description = "Asset registry and history"),
        (name = "Sensors", description = "Sensor management"),
        (name = "Detections", description = "Sensor detection ingestion"),
        (name = "Movements", description = "Movement log"),
        (name = "Stats", description = "Dashboard counters"),
        (name = "Metrics", description = "Prometheus metrics"),
    ),
    info(
        title = "Patrimonio Tracker API",
        version = "0.1.0",
        description = "Asset location tracking from boundary sensor detections",
        license(name = "MIT"),
    )
)]
pub struct ApiDoc;

/// API server.
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Creates a new API server.
    pub fn new(state: AppState, config: ApiServerConfig) -> Self {
        Self { config, state }
    }

    /// Creates a new API server with default configuration.
    pub fn with_state(state: AppState) -> Self {
        Self::new(state, ApiServerConfig::default())
    }

    /// Builds the router.
    pub fn router(&self) -> Router {
        routes::health::init_start_time();

        let mut app = routes::create_router(self.state.clone());

        if self.config.enable_openapi {
            app = app.route(
                "/api-docs/openapi.json",
                get(|| async { Json(ApiDoc::openapi()) }),
            );
        }

        // Innermost first
        app.layer(middleware::from_fn(request_logging))
            .layer(middleware::from_fn(request_id))
            .layer(TimeoutLayer::new(self.config.request_timeout))
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer())
            .layer(CatchPanicLayer::new())
    }

    /// Runs the server until Ctrl+C or SIGTERM.
    pub async fn run(self) -> Result<(), std::io::Error> {
        self.run_until(shutdown_signal()).await
    }

    /// Runs the server with a custom shutdown signal.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let addr = self.config.bind_address;

        info!("Starting API server on {}", addr);

        let listener = TcpListener::bind(addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("API server shut down gracefully");
        Ok(())
    }
}

/// Default shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
