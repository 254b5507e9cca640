//! Mock implementations of repository traits for testing.
//!
//! These mocks use in-memory storage and do not require a database connection.
//! They enforce the same referential rules as the SQL schema so processor and
//! handler tests observe the same failures.

mod store;

pub use store::MockStore;
