//! Application state shared across handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use pt_core::db::{DbPool, RetryConfig};
use pt_core::{DetectionProcessor, MismatchPolicy};
use std::sync::Arc;
use std::time::Duration;

/// How detections are applied.
#[derive(Debug, Clone, Default)]
pub struct TrackingSettings {
    /// What to do with an asset seen at a sensor that does not border it.
    pub mismatch_policy: MismatchPolicy,
    /// Retry policy for detections that lose a concurrent update race.
    pub retry: RetryConfig,
    /// How far behind an asset's last sighting a detection is still applied.
    pub stale_tolerance: Duration,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DbPool>,
    /// Detection processing settings.
    pub tracking: Arc<TrackingSettings>,
    /// Prometheus metrics handle for rendering metrics.
    pub prometheus_handle: Option<Arc<PrometheusHandle>>,
}

impl AppState {
    /// Creates a new application state with default tracking settings.
    pub fn new(db: DbPool) -> Self {
        Self {
            db: Arc::new(db),
            tracking: Arc::new(TrackingSettings::default()),
            prometheus_handle: None,
        }
    }

    /// Replaces the tracking settings.
    pub fn with_tracking(mut self, tracking: TrackingSettings) -> Self {
        self.tracking = Arc::new(tracking);
        self
    }

    /// Creates a new application state with Prometheus handle.
    pub fn with_prometheus_handle(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus_handle = Some(Arc::new(handle));
        self
    }

    /// Builds a detection processor over this state's database.
    pub fn processor(&self) -> DetectionProcessor {
        DetectionProcessor::from_pool(&self.db)
            .with_policy(self.tracking.mismatch_policy)
            .with_stale_tolerance(self.tracking.stale_tolerance)
    }
}
