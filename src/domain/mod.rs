//! Domain module
//!
//! Core domain types: the Event entity and the rejection vocabulary. Pure
//! data and pure functions only — no store I/O, no HTTP.

pub mod context;
pub mod event;
pub mod rejection;

pub use context::RequestContext;
pub use event::Event;
pub use rejection::{Rejection, RejectionReason};
