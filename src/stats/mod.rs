//! Stats Aggregator
//!
//! Thin read-only layer over the event store: machine health summaries and
//! top-defect-line rankings. No ingestion logic lives here.

pub mod service;

pub use service::{DefectLineStat, MachineHealth, MachineStatus, StatsAggregator};
