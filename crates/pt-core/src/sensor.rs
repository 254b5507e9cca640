//! Sensor data model.
//!
//! A sensor is a fixed detector mounted on the boundary between two adjacent
//! locations. It is bidirectional: an asset seen at the sensor is moved to
//! whichever of the two sides it is not currently on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a location sits relative to a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The sensor's exit location.
    Exit,
    /// The sensor's entry location.
    Entry,
    /// Neither of the sensor's two locations.
    Elsewhere,
}

/// A boundary detector configured with its two adjacent locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: Uuid,
    pub name: String,
    /// The location an asset is considered to be leaving.
    pub exit_location_id: Uuid,
    /// The location an asset is considered to be entering.
    pub entry_location_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Sensor {
    /// Creates a new sensor between `exit_location_id` and `entry_location_id`.
    pub fn new(name: impl Into<String>, exit_location_id: Uuid, entry_location_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            exit_location_id,
            entry_location_id,
            created_at: Utc::now(),
        }
    }

    /// A sensor must separate two different locations.
    pub fn has_distinct_sides(&self) -> bool {
        self.exit_location_id != self.entry_location_id
    }

    /// Classifies `location_id` against this sensor's two sides.
    pub fn side_of(&self, location_id: Uuid) -> Side {
        if location_id == self.exit_location_id {
            Side::Exit
        } else if location_id == self.entry_location_id {
            Side::Entry
        } else {
            Side::Elsewhere
        }
    }

    /// Returns true if either side of the sensor is `location_id`.
    pub fn references(&self, location_id: Uuid) -> bool {
        self.side_of(location_id) != Side::Elsewhere
    }
}
