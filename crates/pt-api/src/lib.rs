//! # pt-api
//!
//! REST API server for the patrimonio tracker.
//!
//! Exposes CRUD endpoints for locations, assets and sensors, detection
//! ingestion, movement history and dashboard statistics.

pub mod dto;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use server::{ApiServer, ApiServerConfig};
pub use state::AppState;
