//! Integration test modules.

pub mod asset_tests;
pub mod common;
pub mod detection_tests;
pub mod health_tests;
pub mod location_tests;
pub mod sensor_tests;
