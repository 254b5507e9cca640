//! Asset ("patrimonio") data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tracked physical asset, identified externally by its tag (e.g. an RFID EPC).
///
/// `current_location_id` is the single source of truth for where the asset is.
/// It only changes through detection processing, which bumps `version` in the
/// same write; any write that expects an older `version` is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    /// Globally unique, immutable external identifier.
    pub external_tag: String,
    pub name: String,
    pub current_location_id: Uuid,
    /// Time of the last processed detection (or registration).
    pub last_seen_at: DateTime<Utc>,
    /// Optimistic concurrency counter.
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Asset {
    /// Registers a new asset at its initial location.
    ///
    /// `seen_at` becomes both the creation time and the initial `last_seen_at`.
    pub fn new(
        external_tag: impl Into<String>,
        name: impl Into<String>,
        current_location_id: Uuid,
        seen_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            external_tag: external_tag.into(),
            name: name.into(),
            current_location_id,
            last_seen_at: seen_at,
            version: 0,
            created_at: seen_at,
        }
    }

    /// Returns true if the asset currently sits at `location_id`.
    pub fn is_at(&self, location_id: Uuid) -> bool {
        self.current_location_id == location_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_asset_starts_at_version_zero() {
        let location = Uuid::new_v4();
        let seen_at = Utc::now();
        let asset = Asset::new("E200-0001", "Projector", location, seen_at);

        assert_eq!(asset.version, 0);
        assert!(asset.is_at(location));
        assert_eq!(asset.last_seen_at, seen_at);
        assert_eq!(asset.created_at, seen_at);
    }
}
