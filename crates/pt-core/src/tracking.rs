//! Detection processing: turns a sensor sighting into a movement.
//!
//! A sensor sits on the boundary between an exit and an entry location and
//! does not know which way an asset is travelling. The direction is inferred
//! from where the asset currently is:
//!
//! - at the exit location: it moves to the entry location
//! - at the entry location: it moves back to the exit location
//! - anywhere else: handled by the configured [`MismatchPolicy`]
//!
//! The asset's new position and the movement record are committed together
//! with an optimistic version check, so two detections racing on the same
//! asset can never both move it from the same starting location.

use crate::asset::Asset;
#[cfg(feature = "database")]
use crate::db::DbPool;
use crate::db::{
    is_transient_error, with_retry, AssetRepository, DbError, MovementCommit, MovementRepository,
    RetryConfig, Retryable, SensorRepository,
};
use crate::movement::{MovementRecord, TransitionKind};
use crate::sensor::{Sensor, Side};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Counter of committed movements, labelled by `kind`.
pub const METRIC_DETECTIONS_PROCESSED: &str = "pt_detections_processed_total";
/// Counter of detections that changed nothing, labelled by `reason`.
pub const METRIC_DETECTIONS_REJECTED: &str = "pt_detections_rejected_total";
/// Counter of lost optimistic-concurrency races.
pub const METRIC_DETECTION_CONFLICTS: &str = "pt_detection_conflicts_total";

/// A sensor report: `tag` was seen at `sensor_id` at `detected_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub sensor_id: Uuid,
    pub tag: String,
    pub detected_at: DateTime<Utc>,
}

impl Detection {
    pub fn new(sensor_id: Uuid, tag: impl Into<String>, detected_at: DateTime<Utc>) -> Self {
        Self {
            sensor_id,
            tag: tag.into(),
            detected_at,
        }
    }
}

/// What to do when an asset is detected at a sensor that does not border
/// its current location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchPolicy {
    /// Move the asset to the sensor's entry location and flag the movement
    /// as forced.
    #[default]
    ForceEntry,
    /// Refuse the detection and leave the asset untouched.
    Reject,
}

impl MismatchPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MismatchPolicy::ForceEntry => "force_entry",
            MismatchPolicy::Reject => "reject",
        }
    }
}

impl std::fmt::Display for MismatchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MismatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "force_entry" | "force-entry" => Ok(MismatchPolicy::ForceEntry),
            "reject" => Ok(MismatchPolicy::Reject),
            other => Err(format!(
                "unknown mismatch policy '{}', expected force_entry or reject",
                other
            )),
        }
    }
}

/// A resolved direction of travel through a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Uuid,
    pub to: Uuid,
    pub kind: TransitionKind,
}

impl Transition {
    /// Decides where an asset at `current_location_id` goes when seen at
    /// `sensor`. Returns `None` only when the asset is on neither side and
    /// the policy is [`MismatchPolicy::Reject`].
    pub fn resolve(
        sensor: &Sensor,
        current_location_id: Uuid,
        policy: MismatchPolicy,
    ) -> Option<Transition> {
        match sensor.side_of(current_location_id) {
            Side::Exit => Some(Transition {
                from: sensor.exit_location_id,
                to: sensor.entry_location_id,
                kind: TransitionKind::ExitToEntry,
            }),
            Side::Entry => Some(Transition {
                from: sensor.entry_location_id,
                to: sensor.exit_location_id,
                kind: TransitionKind::EntryToExit,
            }),
            Side::Elsewhere => match policy {
                MismatchPolicy::ForceEntry => Some(Transition {
                    from: current_location_id,
                    to: sensor.entry_location_id,
                    kind: TransitionKind::Forced,
                }),
                MismatchPolicy::Reject => None,
            },
        }
    }
}

/// Errors that can occur while processing a detection.
#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Asset {asset_id} is at location {current_location_id}, which sensor {sensor_id} does not border")]
    LocationMismatch {
        asset_id: Uuid,
        current_location_id: Uuid,
        sensor_id: Uuid,
    },

    #[error("Asset {asset_id} was moved concurrently")]
    Conflict { asset_id: Uuid },

    #[error(transparent)]
    Store(#[from] DbError),
}

impl Retryable for TrackingError {
    fn is_transient(&self) -> bool {
        match self {
            TrackingError::Conflict { .. } => true,
            TrackingError::Store(e) => is_transient_error(e),
            TrackingError::NotFound { .. }
            | TrackingError::Validation(_)
            | TrackingError::LocationMismatch { .. } => false,
        }
    }
}

/// Applies detections to the asset store.
///
/// Holds no mutable state of its own; every call reads the current sensor
/// and asset rows and relies on the store's version check for isolation.
#[derive(Clone)]
pub struct DetectionProcessor {
    sensors: Arc<dyn SensorRepository>,
    assets: Arc<dyn AssetRepository>,
    movements: Arc<dyn MovementRepository>,
    policy: MismatchPolicy,
    stale_tolerance: Duration,
}

impl DetectionProcessor {
    /// Creates a processor over the given repositories with the default policy.
    pub fn new(
        sensors: Arc<dyn SensorRepository>,
        assets: Arc<dyn AssetRepository>,
        movements: Arc<dyn MovementRepository>,
    ) -> Self {
        Self {
            sensors,
            assets,
            movements,
            policy: MismatchPolicy::default(),
            stale_tolerance: Duration::ZERO,
        }
    }

    /// Creates a processor backed by the database behind `pool`.
    #[cfg(feature = "database")]
    pub fn from_pool(pool: &DbPool) -> Self {
        use crate::db::{
            create_asset_repository, create_movement_repository, create_sensor_repository,
        };

        Self::new(
            Arc::from(create_sensor_repository(pool)),
            Arc::from(create_asset_repository(pool)),
            Arc::from(create_movement_repository(pool)),
        )
    }

    /// Sets the mismatch policy.
    pub fn with_policy(mut self, policy: MismatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> MismatchPolicy {
        self.policy
    }

    /// Sets how far behind an asset's last sighting a detection may be and
    /// still be applied. Zero rejects every detection older than the last
    /// sighting.
    ///
    /// An accepted late detection is recorded at the last sighting time, so
    /// the newest movement of an asset always matches where it is.
    pub fn with_stale_tolerance(mut self, tolerance: Duration) -> Self {
        self.stale_tolerance = tolerance;
        self
    }

    pub fn stale_tolerance(&self) -> Duration {
        self.stale_tolerance
    }

    /// Processes a single detection against a fresh read of the store.
    ///
    /// Fails with [`TrackingError::Conflict`] if the asset changed between
    /// the read and the commit; nothing is written in that case.
    #[instrument(
        skip(self, detection),
        fields(sensor_id = %detection.sensor_id, tag = %detection.tag)
    )]
    pub async fn process(&self, detection: &Detection) -> Result<MovementRecord, TrackingError> {
        let sensor = self
            .sensors
            .get(detection.sensor_id)
            .await?
            .ok_or_else(|| TrackingError::NotFound {
                entity: "Sensor",
                id: detection.sensor_id.to_string(),
            })?;

        let asset = self
            .assets
            .get_by_tag(&detection.tag)
            .await?
            .ok_or_else(|| TrackingError::NotFound {
                entity: "Asset",
                id: detection.tag.clone(),
            })?;

        let lag = (asset.last_seen_at - detection.detected_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        if lag > self.stale_tolerance {
            reject("stale");
            return Err(TrackingError::Validation(format!(
                "detection at {} is older than the last sighting of asset {} at {}",
                detection.detected_at.to_rfc3339(),
                asset.external_tag,
                asset.last_seen_at.to_rfc3339()
            )));
        }

        let transition = match Transition::resolve(&sensor, asset.current_location_id, self.policy)
        {
            Some(transition) => transition,
            None => {
                reject("location_mismatch");
                warn!(
                    asset_id = %asset.id,
                    current_location_id = %asset.current_location_id,
                    "Asset is not on either side of the sensor"
                );
                return Err(TrackingError::LocationMismatch {
                    asset_id: asset.id,
                    current_location_id: asset.current_location_id,
                    sensor_id: sensor.id,
                });
            }
        };

        let occurred_at = detection.detected_at.max(asset.last_seen_at);
        if occurred_at != detection.detected_at {
            debug!(
                asset_id = %asset.id,
                lag_ms = lag.as_millis() as u64,
                "Late detection within tolerance, recorded at last sighting"
            );
        }

        let record = self
            .commit(&asset, &sensor, transition, occurred_at)
            .await?;

        metrics::counter!(METRIC_DETECTIONS_PROCESSED, "kind" => record.kind.as_db_str())
            .increment(1);

        if record.kind == TransitionKind::Forced {
            warn!(
                asset_id = %record.asset_id,
                from = %record.from_location_id,
                to = %record.to_location_id,
                "Forced asset to sensor entry location"
            );
        } else {
            info!(
                asset_id = %record.asset_id,
                from = %record.from_location_id,
                to = %record.to_location_id,
                kind = %record.kind,
                "Asset moved"
            );
        }

        Ok(record)
    }

    /// Processes a detection, re-reading and re-deciding on conflicts.
    pub async fn process_with_retry(
        &self,
        detection: &Detection,
        retry: &RetryConfig,
    ) -> Result<MovementRecord, TrackingError> {
        with_retry(retry, "process_detection", || self.process(detection)).await
    }

    async fn commit(
        &self,
        asset: &Asset,
        sensor: &Sensor,
        transition: Transition,
        occurred_at: DateTime<Utc>,
    ) -> Result<MovementRecord, TrackingError> {
        let commit = MovementCommit {
            record: MovementRecord::new(
                asset.id,
                transition.from,
                transition.to,
                sensor.id,
                transition.kind,
                occurred_at,
            ),
            expected_version: asset.version,
        };

        self.movements
            .record(&commit)
            .await
            .map_err(|e| match e {
                DbError::Conflict(reason) => {
                    metrics::counter!(METRIC_DETECTION_CONFLICTS).increment(1);
                    debug!(asset_id = %asset.id, %reason, "Lost update race on asset");
                    TrackingError::Conflict { asset_id: asset.id }
                }
                other => TrackingError::Store(other),
            })
    }
}

fn reject(reason: &'static str) {
    metrics::counter!(METRIC_DETECTIONS_REJECTED, "reason" => reason).increment(1);
}
