//! Ingestion pipeline
//!
//! Validator -> Batch Coalescer -> Upsert Engine, composed by the Facade.
//! Everything here except the engine's store calls is pure and synchronous.

pub mod coalescer;
pub mod engine;
pub mod facade;
pub mod validator;

pub use coalescer::coalesce;
pub use engine::UpsertEngine;
pub use facade::{BatchOutcome, IngestionFacade};
pub use validator::validate;
