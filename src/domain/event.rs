//! Event entity
//!
//! The sole persistent entity in the system: one reported cycle from one
//! machine on the factory floor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single machine telemetry event, normalized and ready for the store.
///
/// `version` is internal bookkeeping for optimistic concurrency and is never
/// set by a caller; it starts at 0 and is incremented on every persisted
/// mutation of a given `event_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_id: String,
    pub machine_id: String,
    pub factory_id: String,
    pub event_time: DateTime<Utc>,
    pub received_time: DateTime<Utc>,
    pub duration_ms: i64,
    pub defect_count: i32,
    #[serde(default)]
    pub version: i64,
}

impl Event {
    /// Two events share a "payload" iff duration, defects, event time,
    /// machine and factory are all equal. `received_time` and `version`
    /// are not part of the payload.
    pub fn has_same_payload(&self, other: &Event) -> bool {
        self.duration_ms == other.duration_ms
            && self.defect_count == other.defect_count
            && self.event_time == other.event_time
            && self.machine_id == other.machine_id
            && self.factory_id == other.factory_id
    }

    /// Produce a copy of `self` with `other`'s payload fields and received
    /// time, preserving `self`'s identity and version. Used when an update
    /// wins classification and the stored row needs to be mutated in place.
    pub fn with_payload_of(&self, other: &Event) -> Event {
        Event {
            event_id: self.event_id.clone(),
            machine_id: other.machine_id.clone(),
            factory_id: other.factory_id.clone(),
            event_time: other.event_time,
            received_time: other.received_time,
            duration_ms: other.duration_ms,
            defect_count: other.defect_count,
            version: self.version,
        }
    }
}

/// Wire-shape of an incoming event, prior to `received_time` defaulting and
/// validation. This is what the HTTP body deserializes into; the Validator
/// and Facade operate on it before it is promoted to an [`Event`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCandidate {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub machine_id: String,
    #[serde(default)]
    pub factory_id: String,
    pub event_time: DateTime<Utc>,
    #[serde(default)]
    pub received_time: Option<DateTime<Utc>>,
    pub duration_ms: i64,
    pub defect_count: i32,
}

impl EventCandidate {
    /// Promote a validated candidate into a persistable `Event`, defaulting
    /// `received_time` to `now` if the caller omitted it. Must only be
    /// called after `validate` has accepted the candidate.
    pub fn into_event(self, now: DateTime<Utc>) -> Event {
        Event {
            event_id: self.event_id,
            machine_id: self.machine_id,
            factory_id: self.factory_id,
            event_time: self.event_time,
            received_time: self.received_time.unwrap_or(now),
            duration_ms: self.duration_ms,
            defect_count: self.defect_count,
            version: 0,
        }
    }
}
