//! Event Store
//!
//! Persistence for machine events: a single Postgres table keyed by
//! `event_id`, with a `version` column used for optimistic concurrency.

pub mod error;
pub mod repository;

pub use error::StoreError;
pub use repository::{DefectLine, EventStore, GroupBy, SaveAllOutcome};
