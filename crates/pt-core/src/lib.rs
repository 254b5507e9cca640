//! # pt-core
//!
//! Data models, persistence and movement tracking for the patrimonio tracker.
//!
//! Assets carry an external tag and always sit in exactly one location.
//! Sensors on the boundary between two locations report sightings, and the
//! [`tracking::DetectionProcessor`] turns each sighting into a movement,
//! updating the asset and appending to its history in one atomic step.

pub mod asset;
pub mod db;
pub mod location;
pub mod movement;
pub mod sensor;
pub mod tracking;

pub use asset::Asset;
pub use location::Location;
pub use movement::{MovementRecord, TransitionKind};
pub use sensor::{Sensor, Side};
pub use tracking::{Detection, DetectionProcessor, MismatchPolicy, TrackingError, Transition};
