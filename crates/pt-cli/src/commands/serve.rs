//! Serve command - starts the API server.

use anyhow::{Context, Result};
use colored::Colorize;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

use pt_api::state::TrackingSettings;
use pt_api::{ApiServer, ApiServerConfig, AppState};
use pt_core::db::{create_pool_with_options, run_migrations};
use pt_observability::install_prometheus_recorder;

use crate::config::AppConfig;

/// Runs the API server until Ctrl+C or SIGTERM.
pub async fn run_server(config: AppConfig) -> Result<()> {
    println!("{} Starting Patrimonio Tracker API Server...", "[server]".cyan());

    let prometheus = install_prometheus_recorder().context("Failed to install metrics recorder")?;

    println!("  {} Database: {}", "→".green(), config.database.url);
    let db_pool = create_pool_with_options(&config.database.url, config.database.pool_options())
        .await
        .context("Failed to create database connection pool")?;

    println!("  {} Running migrations...", "→".green());
    run_migrations(&db_pool)
        .await
        .context("Failed to run database migrations")?;
    println!("  {} Migrations complete", "✓".green());

    let state = AppState::new(db_pool)
        .with_tracking(TrackingSettings {
            mismatch_policy: config.tracking.mismatch_policy,
            retry: config.tracking.retry.to_retry_config(),
            stale_tolerance: config.tracking.stale_tolerance(),
        })
        .with_prometheus_handle(prometheus);

    let bind_address: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid bind address")?;

    let server_config = ApiServerConfig {
        bind_address,
        request_timeout: Duration::from_secs(config.server.request_timeout_secs),
        enable_openapi: config.server.enable_openapi,
    };

    info!(
        address = %bind_address,
        mismatch_policy = %config.tracking.mismatch_policy,
        max_retries = config.tracking.retry.max_retries,
        stale_tolerance_ms = config.tracking.stale_tolerance_ms,
        "Server configured"
    );

    println!();
    println!("{}", "Patrimonio Tracker API Server".bold());
    println!("{}", "═".repeat(40));
    println!("  {} http://{}", "Address:".cyan(), bind_address);
    println!("  {} {}", "Database:".cyan(), config.database.url);
    println!(
        "  {} {}",
        "Mismatch policy:".cyan(),
        config.tracking.mismatch_policy
    );
    if config.server.enable_openapi {
        println!(
            "  {} http://{}/api-docs/openapi.json",
            "OpenAPI:".cyan(),
            bind_address
        );
    }

    println!();
    println!("{}", "Endpoints:".bold());
    println!("  GET  /health                      - Health check");
    println!("  POST /api/v1/detections           - Apply a sensor detection");
    println!("  GET  /api/v1/assets/:id/movements - Asset history");
    println!("  GET  /api/v1/movements            - Movement log");
    println!("  GET  /api/v1/stats                - Dashboard counters");
    println!("  GET  /metrics                     - Prometheus metrics");
    println!();
    println!("Press {} to stop", "Ctrl+C".yellow());
    println!();

    let server = ApiServer::new(state, server_config);
    server.run().await.context("Server error")?;

    println!();
    println!("{} Server stopped", "[server]".cyan());

    Ok(())
}
