//! Metric descriptions and the Prometheus recorder.

use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use pt_core::tracking::{
    METRIC_DETECTIONS_PROCESSED, METRIC_DETECTIONS_REJECTED, METRIC_DETECTION_CONFLICTS,
};

/// Gauge of open connections in the database pool.
pub const METRIC_DB_POOL_SIZE: &str = "pt_db_pool_size";
/// Gauge of idle connections in the database pool.
pub const METRIC_DB_POOL_IDLE: &str = "pt_db_pool_idle";

/// Registers metric descriptions with the installed recorder.
pub fn register_metrics() {
    describe_counter!(
        METRIC_DETECTIONS_PROCESSED,
        "Total number of detections that moved an asset, by transition kind"
    );
    describe_counter!(
        METRIC_DETECTIONS_REJECTED,
        "Total number of detections rejected without changes, by reason"
    );
    describe_counter!(
        METRIC_DETECTION_CONFLICTS,
        "Total number of detections that lost a concurrent update race"
    );

    describe_gauge!(
        METRIC_DB_POOL_SIZE,
        "Current number of connections in the database pool"
    );
    describe_gauge!(
        METRIC_DB_POOL_IDLE,
        "Number of idle connections in the database pool"
    );
}

/// Records the database pool's current size and idle count.
pub fn record_pool_stats(size: u32, idle: usize) {
    gauge!(METRIC_DB_POOL_SIZE).set(size as f64);
    gauge!(METRIC_DB_POOL_IDLE).set(idle as f64);
}

/// Installs the global Prometheus recorder and registers descriptions.
///
/// Fails if a recorder is already installed.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn test_rendered_output_contains_descriptions() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            register_metrics();
            metrics::counter!(METRIC_DETECTIONS_PROCESSED, "kind" => "forced").increment(1);
        });

        let rendered = handle.render();
        assert!(rendered.contains("pt_detections_processed_total"));
        assert!(rendered.contains("kind=\"forced\""));
    }
}
