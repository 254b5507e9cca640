//! Movement records: the append-only log of asset transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a movement was derived from a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Asset was at the sensor's exit location and moved to its entry location.
    ExitToEntry,
    /// Asset was at the sensor's entry location and moved back to its exit location.
    EntryToExit,
    /// Asset was at neither side and was placed at the entry location.
    Forced,
}

impl TransitionKind {
    /// Returns the database-compatible string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            TransitionKind::ExitToEntry => "exit_to_entry",
            TransitionKind::EntryToExit => "entry_to_exit",
            TransitionKind::Forced => "forced",
        }
    }

    /// Parses a transition kind from a database string.
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "exit_to_entry" => Some(TransitionKind::ExitToEntry),
            "entry_to_exit" => Some(TransitionKind::EntryToExit),
            "forced" => Some(TransitionKind::Forced),
            _ => None,
        }
    }

    /// Audit status: forced transitions are flagged as suspicious.
    pub fn status(&self) -> &'static str {
        match self {
            TransitionKind::Forced => "suspicious",
            TransitionKind::ExitToEntry | TransitionKind::EntryToExit => "valid",
        }
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// An immutable record of an asset moving between two locations via a sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub from_location_id: Uuid,
    pub to_location_id: Uuid,
    pub sensor_id: Uuid,
    pub kind: TransitionKind,
    /// Detection time; never changes after creation.
    pub occurred_at: DateTime<Utc>,
}

impl MovementRecord {
    /// Creates a new movement record with a fresh id.
    pub fn new(
        asset_id: Uuid,
        from_location_id: Uuid,
        to_location_id: Uuid,
        sensor_id: Uuid,
        kind: TransitionKind,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            asset_id,
            from_location_id,
            to_location_id,
            sensor_id,
            kind,
            occurred_at,
        }
    }
}
